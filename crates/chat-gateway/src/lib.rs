//! # chat-gateway
//!
//! WebSocket gateway: identify, heartbeat, live room subscriptions with
//! snapshot and resync, forced removal, and notification push.

pub mod broadcast;
pub mod connection;
pub mod events;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use connection::ConnectionManager;
pub use server::{create_app, GatewayState};
