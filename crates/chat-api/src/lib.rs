//! # chat-api
//!
//! REST API server built with Axum framework. Hosts the gateway WebSocket
//! route in the same process so both transports share one event bus.

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{create_app, create_app_state, run};
pub use state::AppState;
