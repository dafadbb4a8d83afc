//! Room view handlers (ops 3, 4 and 5)

use super::{HandlerError, HandlerResult};
use crate::broadcast::spawn_room_pump;
use crate::connection::Connection;
use crate::events::{GatewayEventType, SubscribeFailedEvent, UnsubscribedEvent};
use crate::protocol::CloseCode;
use crate::server::GatewayState;
use chat_core::Snowflake;
use chat_service::{ServiceError, SubscriptionService};
use std::sync::Arc;

/// Handles Subscribe, Unsubscribe and Resync
pub struct RoomHandler;

impl RoomHandler {
    pub async fn subscribe(
        state: &GatewayState,
        connection: &Arc<Connection>,
        room_id: Snowflake,
    ) -> HandlerResult<Option<CloseCode>> {
        let user_id = connection.user_id().await.ok_or(HandlerError::NotAuthenticated)?;
        let ctx = state.service_context_arc();

        match SubscriptionService::new(&ctx)
            .subscribe(connection.session_id(), user_id, room_id)
            .await
        {
            Ok(subscription) => {
                let view = spawn_room_pump(ctx.clone(), connection.clone(), subscription);
                connection.attach_room(room_id, view);
            }
            Err(e) => {
                tracing::debug!(
                    session_id = %connection.session_id(),
                    room_id = %room_id,
                    error = %e,
                    "Subscribe refused"
                );
                Self::refuse(connection, room_id, &e).await?;
            }
        }

        Ok(None)
    }

    /// Idempotent; always answered with `UNSUBSCRIBED`
    pub async fn unsubscribe(
        state: &GatewayState,
        connection: &Arc<Connection>,
        room_id: Snowflake,
    ) -> HandlerResult<Option<CloseCode>> {
        SubscriptionService::new(state.service_context()).unsubscribe(connection.session_id(), room_id);
        if let Some(view) = connection.detach_room(room_id) {
            view.abort();
        }

        if !connection
            .dispatch(GatewayEventType::Unsubscribed, &UnsubscribedEvent { room_id })
            .await
        {
            return Err(HandlerError::ConnectionClosed);
        }
        Ok(None)
    }

    pub async fn resync(connection: &Arc<Connection>, room_id: Snowflake) -> HandlerResult<Option<CloseCode>> {
        if !connection.request_resync(room_id) {
            Self::refuse(connection, room_id, &ServiceError::conflict("not subscribed to this room")).await?;
        }
        Ok(None)
    }

    async fn refuse(connection: &Connection, room_id: Snowflake, error: &ServiceError) -> HandlerResult<()> {
        let failed = SubscribeFailedEvent::new(room_id, error);
        if connection.dispatch(GatewayEventType::SubscribeFailed, &failed).await {
            Ok(())
        } else {
            Err(HandlerError::ConnectionClosed)
        }
    }
}
