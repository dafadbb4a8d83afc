//! Invitation entity - a pending, accepted or declined invite into a private room

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
}

impl InvitationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }

    /// A pending invitation lets the invitee look at the room before answering.
    /// Accepting turns it into a membership, which carries access from then on.
    #[inline]
    pub fn grants_view(self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvitationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            other => Err(DomainError::ValidationError(format!(
                "unknown invitation status: {other}"
            ))),
        }
    }
}

/// Invitation entity
///
/// At most one invitation per (room, invitee) is pending at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub id: Snowflake,
    pub room_id: Snowflake,
    pub inviter_id: Snowflake,
    pub invitee_id: Snowflake,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invitation {
    /// Create a new pending invitation
    pub fn new(id: Snowflake, room_id: Snowflake, inviter_id: Snowflake, invitee_id: Snowflake) -> Self {
        let now = Utc::now();
        Self {
            id,
            room_id,
            inviter_id,
            invitee_id,
            status: InvitationStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    #[inline]
    pub fn is_for(&self, user_id: Snowflake) -> bool {
        self.invitee_id == user_id
    }

    /// Resolve a pending invitation. Returns false if it was already resolved.
    pub fn resolve(&mut self, status: InvitationStatus) -> bool {
        if !self.is_pending() || status == InvitationStatus::Pending {
            return false;
        }
        self.status = status;
        self.updated_at = Utc::now();
        true
    }
}
