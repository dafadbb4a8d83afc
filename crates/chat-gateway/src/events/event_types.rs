//! Gateway event types
//!
//! Defines all event type names for dispatch messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gateway event types
///
/// These are the event names sent in the `t` field of dispatch messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayEventType {
    /// Sent after successful Identify
    Ready,

    // Room subscription events
    /// Subscribe accepted; carries the room snapshot
    Subscribed,
    /// A sequenced room event
    RoomEvent,
    /// The user was banned or kicked; the room view has ended
    Removed,
    /// Fresh snapshot after a sequence gap
    Resync,
    /// Room view closed on request
    Unsubscribed,
    /// Subscribe or resync was refused
    SubscribeFailed,

    /// Stored notification pushed to the addressee
    Notification,
}

impl GatewayEventType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Subscribed => "SUBSCRIBED",
            Self::RoomEvent => "ROOM_EVENT",
            Self::Removed => "REMOVED",
            Self::Resync => "RESYNC",
            Self::Unsubscribed => "UNSUBSCRIBED",
            Self::SubscribeFailed => "SUBSCRIBE_FAILED",
            Self::Notification => "NOTIFICATION",
        }
    }

    /// Parse an event type from a string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "READY" => Some(Self::Ready),
            "SUBSCRIBED" => Some(Self::Subscribed),
            "ROOM_EVENT" => Some(Self::RoomEvent),
            "REMOVED" => Some(Self::Removed),
            "RESYNC" => Some(Self::Resync),
            "UNSUBSCRIBED" => Some(Self::Unsubscribed),
            "SUBSCRIBE_FAILED" => Some(Self::SubscribeFailed),
            "NOTIFICATION" => Some(Self::Notification),
            _ => None,
        }
    }
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<GatewayEventType> for String {
    fn from(event: GatewayEventType) -> Self {
        event.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_as_str() {
        assert_eq!(GatewayEventType::Ready.as_str(), "READY");
        assert_eq!(GatewayEventType::SubscribeFailed.as_str(), "SUBSCRIBE_FAILED");
        assert_eq!(GatewayEventType::RoomEvent.as_str(), "ROOM_EVENT");
    }

    #[test]
    fn test_event_type_from_str() {
        assert_eq!(GatewayEventType::from_str("REMOVED"), Some(GatewayEventType::Removed));
        assert_eq!(GatewayEventType::from_str("MESSAGE_CREATE"), None);
    }

    #[test]
    fn test_event_type_serialization_matches_as_str() {
        for event in [
            GatewayEventType::Ready,
            GatewayEventType::Subscribed,
            GatewayEventType::RoomEvent,
            GatewayEventType::Removed,
            GatewayEventType::Resync,
            GatewayEventType::Unsubscribed,
            GatewayEventType::SubscribeFailed,
            GatewayEventType::Notification,
        ] {
            let json = serde_json::to_string(&event).unwrap();
            assert_eq!(json, format!("\"{}\"", event.as_str()));
        }
    }
}
