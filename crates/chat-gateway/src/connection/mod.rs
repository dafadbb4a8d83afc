//! Connection management
//!
//! Tracks WebSocket connections, their authenticated users and their open room views.

mod connection;
mod manager;

pub use connection::{Connection, ConnectionState, Outbound, RoomView};
pub use manager::ConnectionManager;
