//! Path parameter extractors
//!
//! Snowflake ids arrive as strings in the path and are parsed here so
//! handlers only ever see typed ids.

use chat_core::Snowflake;
use serde::Deserialize;

use crate::response::ApiError;

fn parse_id(raw: &str, name: &str) -> Result<Snowflake, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::invalid_path(format!("Invalid {name} format")))
}

/// Path parameters with room_id
#[derive(Debug, Deserialize)]
pub struct RoomIdPath {
    pub room_id: String,
}

impl RoomIdPath {
    /// Parse room_id as Snowflake
    pub fn room_id(&self) -> Result<Snowflake, ApiError> {
        parse_id(&self.room_id, "room_id")
    }
}

/// Path parameters with room_id and user_id
#[derive(Debug, Deserialize)]
pub struct RoomUserPath {
    pub room_id: String,
    pub user_id: String,
}

impl RoomUserPath {
    pub fn room_id(&self) -> Result<Snowflake, ApiError> {
        parse_id(&self.room_id, "room_id")
    }

    pub fn user_id(&self) -> Result<Snowflake, ApiError> {
        parse_id(&self.user_id, "user_id")
    }
}

/// Path parameters with an invitation id
#[derive(Debug, Deserialize)]
pub struct InvitationIdPath {
    pub id: String,
}

impl InvitationIdPath {
    pub fn invitation_id(&self) -> Result<Snowflake, ApiError> {
        parse_id(&self.id, "invitation id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_path_parses_snowflake() {
        let path = RoomIdPath {
            room_id: "123456789".to_string(),
        };
        assert_eq!(path.room_id().unwrap(), Snowflake::new(123_456_789));
    }

    #[test]
    fn test_invalid_user_id_is_rejected() {
        let path = RoomUserPath {
            room_id: "1".to_string(),
            user_id: "@me".to_string(),
        };
        assert!(path.room_id().is_ok());

        let err = path.user_id().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PATH_PARAMETER");
        assert!(err.to_string().contains("user_id"));
    }
}
