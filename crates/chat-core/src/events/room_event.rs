//! Room events - immutable, sequenced records of state changes in a room
//!
//! These events are used for:
//! - Live delivery to subscribed sessions, in per-room sequence order
//! - Deriving user-directed notifications
//! - Forced removal of banned or kicked sessions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::MemberRole;
use crate::value_objects::Snowflake;

/// Why a session was removed from a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalReason {
    Banned,
    Kicked,
}

/// Variant-specific event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomEventPayload {
    MessagePosted {
        message_id: Snowflake,
        content: String,
    },
    MemberJoined {
        user_id: Snowflake,
    },
    MemberLeft {
        user_id: Snowflake,
    },
    MemberKicked {
        target_id: Snowflake,
    },
    MemberBanned {
        target_id: Snowflake,
    },
    MemberUnbanned {
        target_id: Snowflake,
    },
    RolePromoted {
        target_id: Snowflake,
        role: MemberRole,
    },
    RoleDemoted {
        target_id: Snowflake,
        role: MemberRole,
    },
    AnnouncementChanged {
        announcement: Option<String>,
    },
}

impl RoomEventPayload {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MessagePosted { .. } => "MESSAGE_POSTED",
            Self::MemberJoined { .. } => "MEMBER_JOINED",
            Self::MemberLeft { .. } => "MEMBER_LEFT",
            Self::MemberKicked { .. } => "MEMBER_KICKED",
            Self::MemberBanned { .. } => "MEMBER_BANNED",
            Self::MemberUnbanned { .. } => "MEMBER_UNBANNED",
            Self::RolePromoted { .. } => "ROLE_PROMOTED",
            Self::RoleDemoted { .. } => "ROLE_DEMOTED",
            Self::AnnouncementChanged { .. } => "ANNOUNCEMENT_CHANGED",
        }
    }

    /// The member a moderation or role event is aimed at
    pub fn target_id(&self) -> Option<Snowflake> {
        match self {
            Self::MemberKicked { target_id }
            | Self::MemberBanned { target_id }
            | Self::MemberUnbanned { target_id }
            | Self::RolePromoted { target_id, .. }
            | Self::RoleDemoted { target_id, .. } => Some(*target_id),
            Self::MemberJoined { user_id } | Self::MemberLeft { user_id } => Some(*user_id),
            Self::MessagePosted { .. } | Self::AnnouncementChanged { .. } => None,
        }
    }
}

/// An event that has not been assigned a sequence number yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomEventDraft {
    pub room_id: Snowflake,
    pub actor_id: Snowflake,
    pub payload: RoomEventPayload,
}

impl RoomEventDraft {
    pub fn new(room_id: Snowflake, actor_id: Snowflake, payload: RoomEventPayload) -> Self {
        Self {
            room_id,
            actor_id,
            payload,
        }
    }

    /// Freeze the draft into an event carrying `seq`
    pub fn sequenced(self, seq: u64) -> RoomEvent {
        RoomEvent {
            room_id: self.room_id,
            seq,
            actor_id: self.actor_id,
            emitted_at: Utc::now(),
            payload: self.payload,
        }
    }
}

/// A sequenced room event
///
/// Sequence numbers are strictly increasing per room and start at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomEvent {
    pub room_id: Snowflake,
    pub seq: u64,
    pub actor_id: Snowflake,
    pub emitted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: RoomEventPayload,
}

impl RoomEvent {
    #[inline]
    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }

    /// Returns the removal reason if this event bans or kicks `user_id`
    pub fn removal_of(&self, user_id: Snowflake) -> Option<RemovalReason> {
        match self.payload {
            RoomEventPayload::MemberBanned { target_id } if target_id == user_id => {
                Some(RemovalReason::Banned)
            }
            RoomEventPayload::MemberKicked { target_id } if target_id == user_id => {
                Some(RemovalReason::Kicked)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ban(target: i64) -> RoomEvent {
        RoomEventDraft::new(
            Snowflake::new(1),
            Snowflake::new(2),
            RoomEventPayload::MemberBanned {
                target_id: Snowflake::new(target),
            },
        )
        .sequenced(7)
    }

    #[test]
    fn test_event_serialization() {
        let event = ban(3);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "MEMBER_BANNED");
        assert_eq!(json["seq"], 7);
        assert_eq!(json["room_id"], "1");
        assert_eq!(json["target_id"], "3");

        let parsed: RoomEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_removal_of_target_only() {
        let event = ban(3);
        assert_eq!(event.removal_of(Snowflake::new(3)), Some(RemovalReason::Banned));
        assert_eq!(event.removal_of(Snowflake::new(4)), None);

        let kick = RoomEventDraft::new(
            Snowflake::new(1),
            Snowflake::new(2),
            RoomEventPayload::MemberKicked {
                target_id: Snowflake::new(3),
            },
        )
        .sequenced(8);
        assert_eq!(kick.removal_of(Snowflake::new(3)), Some(RemovalReason::Kicked));
    }

    #[test]
    fn test_unban_is_not_a_removal() {
        let event = RoomEventDraft::new(
            Snowflake::new(1),
            Snowflake::new(2),
            RoomEventPayload::MemberUnbanned {
                target_id: Snowflake::new(3),
            },
        )
        .sequenced(1);
        assert_eq!(event.removal_of(Snowflake::new(3)), None);
        assert_eq!(event.payload.target_id(), Some(Snowflake::new(3)));
    }

    #[test]
    fn test_event_type() {
        let event = RoomEventDraft::new(
            Snowflake::new(1),
            Snowflake::new(2),
            RoomEventPayload::AnnouncementChanged { announcement: None },
        )
        .sequenced(1);
        assert_eq!(event.event_type(), "ANNOUNCEMENT_CHANGED");
        assert_eq!(event.payload.target_id(), None);
    }
}
