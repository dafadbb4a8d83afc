//! Room entity - a named chat room with a visibility mode and a single owner

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Who may see and enter a room without an invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomVisibility {
    Public,
    Private,
}

impl RoomVisibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for RoomVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomVisibility {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(DomainError::ValidationError(format!(
                "unknown room visibility: {other}"
            ))),
        }
    }
}

/// Room entity
///
/// `owner_id` always agrees with the single `owner` membership of the room;
/// both are written together when the room is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: Snowflake,
    pub name: String,
    pub description: Option<String>,
    pub visibility: RoomVisibility,
    /// Argon2 PHC string, only ever set on private rooms
    pub password_hash: Option<String>,
    pub owner_id: Snowflake,
    pub announcement: Option<String>,
    /// Cached value of the active member count, refreshed after each membership change
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    /// Create a new Room owned by `owner_id`
    pub fn new(id: Snowflake, name: String, owner_id: Snowflake, visibility: RoomVisibility) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            description: None,
            visibility,
            password_hash: None,
            owner_id,
            announcement: None,
            member_count: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn is_owner(&self, user_id: Snowflake) -> bool {
        self.owner_id == user_id
    }

    #[inline]
    pub fn is_private(&self) -> bool {
        self.visibility == RoomVisibility::Private
    }

    /// Whether joining without an invitation requires a password
    #[inline]
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn set_announcement(&mut self, announcement: Option<String>) {
        self.announcement = announcement;
        self.updated_at = Utc::now();
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
        self.updated_at = Utc::now();
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        self.updated_at = Utc::now();
    }

    /// Change visibility. Making a room public clears its password.
    pub fn set_visibility(&mut self, visibility: RoomVisibility) {
        self.visibility = visibility;
        if visibility == RoomVisibility::Public {
            self.password_hash = None;
        }
        self.updated_at = Utc::now();
    }

    /// Set or clear the password hash
    pub fn set_password_hash(&mut self, password_hash: Option<String>) -> Result<(), DomainError> {
        if password_hash.is_some() && !self.is_private() {
            return Err(DomainError::ValidationError(
                "only private rooms can have a password".to_string(),
            ));
        }
        self.password_hash = password_hash;
        self.updated_at = Utc::now();
        Ok(())
    }
}
