//! Event payload definitions
//!
//! Defines the data structures for each gateway event type. `ROOM_EVENT`
//! carries a [`chat_core::RoomEvent`] as is, and `SUBSCRIBED` and `RESYNC`
//! carry a [`chat_service::dto::RoomSnapshot`].

use chat_core::{RemovalReason, Snowflake};
use chat_service::ServiceError;
use serde::Serialize;

/// READY event payload
///
/// Sent after successful Identify.
#[derive(Debug, Clone, Serialize)]
pub struct ReadyEvent {
    pub session_id: Snowflake,
    pub user_id: Snowflake,
}

/// REMOVED event payload
#[derive(Debug, Clone, Serialize)]
pub struct RemovedEvent {
    pub room_id: Snowflake,
    pub reason: RemovalReason,
}

/// UNSUBSCRIBED event payload
#[derive(Debug, Clone, Serialize)]
pub struct UnsubscribedEvent {
    pub room_id: Snowflake,
}

/// SUBSCRIBE_FAILED event payload
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeFailedEvent {
    pub room_id: Snowflake,
    pub code: String,
    pub message: String,
    pub status: u16,
}

impl SubscribeFailedEvent {
    pub fn new(room_id: Snowflake, error: &ServiceError) -> Self {
        Self {
            room_id,
            code: error.error_code().to_string(),
            message: error.to_string(),
            status: error.status_code(),
        }
    }
}
