//! Redis Pub/Sub publisher.

use crate::pool::{RedisPool, RedisResult};
use crate::pubsub::PubSubChannel;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

/// Event wrapper for Pub/Sub messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubSubEvent {
    /// Event type name (e.g., "NOTIFICATION")
    pub event_type: String,
    /// Event payload
    pub data: serde_json::Value,
}

impl PubSubEvent {
    /// Create a new event
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }

    /// Serialize `data` into an event payload
    pub fn from_serialize<T: Serialize>(event_type: impl Into<String>, data: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(event_type, serde_json::to_value(data)?))
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Redis Pub/Sub publisher
#[derive(Debug, Clone)]
pub struct Publisher {
    pool: RedisPool,
}

impl Publisher {
    /// Create a new publisher
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Publish an event to a channel. Returns the number of receiving nodes.
    pub async fn publish(&self, channel: &PubSubChannel, event: &PubSubEvent) -> RedisResult<u32> {
        let mut conn = self.pool.get().await?;
        let channel_name = channel.name();
        let payload = event.to_json()?;

        let receivers: u32 = conn.publish(&channel_name, &payload).await?;

        tracing::debug!(
            channel = %channel_name,
            event_type = %event.event_type,
            receivers = receivers,
            "Published event"
        );

        Ok(receivers)
    }

    /// Publish a user-specific event on their notification channel
    pub async fn publish_to_user(&self, user_id: chat_core::Snowflake, event: &PubSubEvent) -> RedisResult<u32> {
        self.publish(&PubSubChannel::user_notifications(user_id), event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pubsub_event_creation() {
        let data = serde_json::json!({"id": "12345", "kind": "BANNED"});

        let event = PubSubEvent::new("NOTIFICATION", data.clone());
        assert_eq!(event.event_type, "NOTIFICATION");
        assert_eq!(event.data, data);
    }

    #[test]
    fn test_from_serialize() {
        #[derive(Serialize)]
        struct Payload {
            room_id: String,
        }

        let event = PubSubEvent::from_serialize("NOTIFICATION", &Payload { room_id: "7".to_string() }).unwrap();
        assert_eq!(event.data["room_id"], "7");

        let json = event.to_json().unwrap();
        let back: PubSubEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_type, "NOTIFICATION");
    }
}
