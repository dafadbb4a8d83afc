//! Request DTOs for API endpoints
//!
//! All request DTOs implement `Deserialize` and `Validate` for input validation.

use chat_core::{RoomVisibility, Snowflake};
use serde::Deserialize;
use validator::Validate;

fn public() -> RoomVisibility {
    RoomVisibility::Public
}

// ============================================================================
// Room Requests
// ============================================================================

/// Create room request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoomRequest {
    #[validate(length(min = 1, max = 100, message = "Room name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    #[serde(default = "public")]
    pub visibility: RoomVisibility,

    /// Only accepted for private rooms
    pub password: Option<String>,
}

/// Update room settings request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateRoomRequest {
    #[validate(length(min = 1, max = 100, message = "Room name must be 1-100 characters"))]
    pub name: Option<String>,

    /// Empty string clears the description
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    /// Switching to public drops the password
    pub visibility: Option<RoomVisibility>,

    pub password: Option<String>,

    #[serde(default)]
    pub clear_password: bool,
}

/// Join room request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinRoomRequest {
    pub password: Option<String>,
}

/// Set or clear the room announcement
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateAnnouncementRequest {
    #[validate(length(max = 1000, message = "Announcement must be at most 1000 characters"))]
    pub announcement: Option<String>,
}

// ============================================================================
// Message Requests
// ============================================================================

/// Post message request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PostMessageRequest {
    #[validate(length(min = 1, max = 2000, message = "Content must be 1-2000 characters"))]
    pub content: String,
}

// ============================================================================
// Invitation Requests
// ============================================================================

/// Invite a user to a private room
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInvitationRequest {
    pub invitee_id: Snowflake,
}

// ============================================================================
// Notification Requests
// ============================================================================

/// Query parameters for the notification feed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQueryParams {
    pub unread_only: Option<bool>,
    /// Only notifications older than this id
    pub before: Option<Snowflake>,
    /// Page size, 1-100 (default 50)
    pub limit: Option<i64>,
}

/// Mark notifications as read
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MarkReadRequest {
    #[validate(length(min = 1, max = 100, message = "Must mark 1-100 notifications at a time"))]
    pub ids: Vec<Snowflake>,
}
