//! Identify handler (op 2)

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::events::{GatewayEventType, ReadyEvent};
use crate::protocol::{CloseCode, GatewayMessage, IdentifyPayload};
use crate::server::GatewayState;
use std::sync::Arc;

/// Handles Identify messages
pub struct IdentifyHandler;

impl IdentifyHandler {
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: IdentifyPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        if connection.is_authenticated().await {
            tracing::warn!(
                session_id = %connection.session_id(),
                "Client sent Identify while already authenticated"
            );
            return Ok(Some(CloseCode::AlreadyAuthenticated));
        }

        let user_id = match state.service_context().token_verifier().verify(payload.bare_token()) {
            Ok(user_id) => user_id,
            Err(e) => {
                tracing::debug!(session_id = %connection.session_id(), error = %e, "Token validation failed");
                let _ = connection.send(GatewayMessage::invalid_session()).await;
                return Err(HandlerError::AuthenticationFailed(e.to_string()));
            }
        };

        let session_id = connection.session_id();
        state
            .connection_manager()
            .authenticate_connection(session_id, user_id)
            .await;

        let ready = ReadyEvent { session_id, user_id };
        if !connection.dispatch(GatewayEventType::Ready, &ready).await {
            return Err(HandlerError::ConnectionClosed);
        }

        tracing::info!(session_id = %session_id, user_id = %user_id, "Client identified");

        Ok(None)
    }
}
