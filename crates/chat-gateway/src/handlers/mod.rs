//! Op code handlers
//!
//! Handles incoming WebSocket messages based on their operation code.

mod error;
mod heartbeat;
mod identify;
mod room;

pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use identify::IdentifyHandler;
pub use room::RoomHandler;

use crate::connection::Connection;
use crate::protocol::{CloseCode, GatewayMessage, OpCode};
use crate::server::GatewayState;
use std::sync::Arc;

/// Dispatch incoming client messages to appropriate handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle an incoming client message
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message: GatewayMessage,
    ) -> HandlerResult<Option<CloseCode>> {
        if !message.op.is_client_op() {
            tracing::warn!(
                session_id = %connection.session_id(),
                op = %message.op,
                "Received server-only op code from client"
            );
            return Ok(Some(CloseCode::UnknownOpcode));
        }

        if message.op.requires_identify() && !connection.is_authenticated().await {
            return Err(HandlerError::NotAuthenticated);
        }

        match message.op {
            OpCode::Identify => {
                let payload = message
                    .as_identify()
                    .ok_or_else(|| HandlerError::InvalidPayload("Invalid Identify payload".to_string()))?;

                IdentifyHandler::handle(state, connection, payload).await
            }
            OpCode::Heartbeat => HeartbeatHandler::handle(connection).await,
            OpCode::Subscribe | OpCode::Unsubscribe | OpCode::Resync => {
                let room_id = message
                    .as_room()
                    .ok_or_else(|| HandlerError::InvalidPayload(format!("Invalid {} payload", message.op.name())))?
                    .room_id;

                match message.op {
                    OpCode::Subscribe => RoomHandler::subscribe(state, connection, room_id).await,
                    OpCode::Unsubscribe => RoomHandler::unsubscribe(state, connection, room_id).await,
                    _ => RoomHandler::resync(connection, room_id).await,
                }
            }
            // These ops should never reach here due to is_client_op check
            _ => {
                tracing::error!(op = %message.op, "Unhandled client op code");
                Ok(Some(CloseCode::UnknownOpcode))
            }
        }
    }
}
