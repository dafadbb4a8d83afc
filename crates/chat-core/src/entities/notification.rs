//! Notification entity - a durable, user-addressed signal derived from room activity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::Invitation;
use crate::events::{RoomEvent, RoomEventPayload};
use crate::value_objects::Snowflake;

/// What happened to the addressee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Invited {
        invitation_id: Snowflake,
        inviter_id: Snowflake,
    },
    Banned {
        actor_id: Snowflake,
    },
    Kicked {
        actor_id: Snowflake,
    },
    Promoted {
        actor_id: Snowflake,
    },
    Demoted {
        actor_id: Snowflake,
    },
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invited { .. } => "INVITED",
            Self::Banned { .. } => "BANNED",
            Self::Kicked { .. } => "KICKED",
            Self::Promoted { .. } => "PROMOTED",
            Self::Demoted { .. } => "DEMOTED",
        }
    }
}

/// Notification entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub room_id: Snowflake,
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(id: Snowflake, user_id: Snowflake, room_id: Snowflake, kind: NotificationKind) -> Self {
        Self {
            id,
            user_id,
            room_id,
            kind,
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// A notification that still needs an id, addressed to `user_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTarget {
    pub user_id: Snowflake,
    pub room_id: Snowflake,
    pub kind: NotificationKind,
}

impl NotificationTarget {
    /// Decode the user-directed signal carried by a room event, if any.
    ///
    /// Bans, kicks, promotions and demotions address their target. Other
    /// events only matter to live subscribers.
    pub fn from_event(event: &RoomEvent) -> Option<Self> {
        let actor_id = event.actor_id;
        let (user_id, kind) = match event.payload {
            RoomEventPayload::MemberBanned { target_id } => {
                (target_id, NotificationKind::Banned { actor_id })
            }
            RoomEventPayload::MemberKicked { target_id } => {
                (target_id, NotificationKind::Kicked { actor_id })
            }
            RoomEventPayload::RolePromoted { target_id, .. } => {
                (target_id, NotificationKind::Promoted { actor_id })
            }
            RoomEventPayload::RoleDemoted { target_id, .. } => {
                (target_id, NotificationKind::Demoted { actor_id })
            }
            _ => return None,
        };

        Some(Self {
            user_id,
            room_id: event.room_id,
            kind,
        })
    }

    /// Invitation created, addressed to the invitee
    pub fn from_invitation(invitation: &Invitation) -> Self {
        Self {
            user_id: invitation.invitee_id,
            room_id: invitation.room_id,
            kind: NotificationKind::Invited {
                invitation_id: invitation.id,
                inviter_id: invitation.inviter_id,
            },
        }
    }

    pub fn into_notification(self, id: Snowflake) -> Notification {
        Notification::new(id, self.user_id, self.room_id, self.kind)
    }
}
