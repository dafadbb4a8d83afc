//! Gateway server setup
//!
//! The gateway is mounted into the API server's router, so REST handlers
//! and live subscriptions share one service context.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::GatewayState;

use axum::{routing::get, Router};

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new().route("/gateway", get(gateway_handler))
}

/// Gateway routes with their state applied, ready to merge
pub fn create_app(state: GatewayState) -> Router {
    create_router().with_state(state)
}
