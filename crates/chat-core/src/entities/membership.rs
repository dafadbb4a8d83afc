//! Membership entity - a user's role and ban state in a room

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Role held by a member of a room
///
/// `Owner` is assigned once at room creation and never changes.
/// `Member` and `Moderator` move between each other only by owner action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Moderator,
    Member,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Moderator => "moderator",
            Self::Member => "member",
        }
    }

    /// Owners and moderators can ban, unban and kick
    #[inline]
    pub fn can_moderate(self) -> bool {
        matches!(self, Self::Owner | Self::Moderator)
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "moderator" => Ok(Self::Moderator),
            "member" => Ok(Self::Member),
            other => Err(DomainError::ValidationError(format!("unknown member role: {other}"))),
        }
    }
}

/// Membership record, keyed by (room_id, user_id)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub room_id: Snowflake,
    pub user_id: Snowflake,
    pub role: MemberRole,
    /// A banned membership keeps its role but is not active
    pub banned: bool,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    /// Create a regular, non-banned membership
    pub fn new(room_id: Snowflake, user_id: Snowflake) -> Self {
        Self::with_role(room_id, user_id, MemberRole::Member)
    }

    /// Create the owner membership written alongside a new room
    pub fn owner(room_id: Snowflake, user_id: Snowflake) -> Self {
        Self::with_role(room_id, user_id, MemberRole::Owner)
    }

    fn with_role(room_id: Snowflake, user_id: Snowflake, role: MemberRole) -> Self {
        let now = Utc::now();
        Self {
            room_id,
            user_id,
            role,
            banned: false,
            joined_at: now,
            updated_at: now,
        }
    }

    /// Non-banned memberships count as active
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.banned
    }

    #[inline]
    pub fn is_owner(&self) -> bool {
        self.role == MemberRole::Owner
    }
}
