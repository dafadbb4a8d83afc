//! Message entity - content posted into a room

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Maximum message content length in characters
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// A message posted to a room. Content is opaque; media URLs pass through as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub room_id: Snowflake,
    pub author_id: Snowflake,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a message after checking the content length
    pub fn new(
        id: Snowflake,
        room_id: Snowflake,
        author_id: Snowflake,
        content: String,
    ) -> Result<Self, DomainError> {
        if content.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "message content cannot be empty".to_string(),
            ));
        }
        if content.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(DomainError::ContentTooLong {
                max: MAX_MESSAGE_LENGTH,
            });
        }

        Ok(Self {
            id,
            room_id,
            author_id,
            content,
            created_at: Utc::now(),
        })
    }
}
