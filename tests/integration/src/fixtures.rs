//! Test fixtures and data generators
//!
//! Provides reusable test data for integration tests.

use chat_core::Snowflake;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;

/// Counter for unique test data
static COUNTER: AtomicI64 = AtomicI64::new(1);

/// Per-run offset so user ids never repeat across runs against one database
fn run_offset() -> i64 {
    static OFFSET: OnceLock<i64> = OnceLock::new();
    *OFFSET.get_or_init(|| chrono::Utc::now().timestamp_millis() * 1000)
}

/// Get a unique suffix for test data
pub fn unique_suffix() -> i64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A user id no other test run has used. Users live in the auth service,
/// so any id is a valid user here.
pub fn unique_user() -> Snowflake {
    Snowflake::new(run_offset() + unique_suffix())
}

/// Create room request
#[derive(Debug, Serialize)]
pub struct CreateRoomRequest {
    pub name: String,
    pub description: Option<String>,
    pub visibility: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl CreateRoomRequest {
    pub fn public() -> Self {
        Self {
            name: format!("Test Room {}", unique_suffix()),
            description: Some("A test room".to_string()),
            visibility: "public".to_string(),
            password: None,
        }
    }

    pub fn private(password: Option<&str>) -> Self {
        Self {
            name: format!("Private Room {}", unique_suffix()),
            description: None,
            visibility: "private".to_string(),
            password: password.map(String::from),
        }
    }
}

/// Room response
#[derive(Debug, Deserialize)]
pub struct RoomResponse {
    pub id: String,
    pub name: String,
    pub visibility: String,
    pub owner_id: String,
    pub announcement: Option<String>,
    pub has_password: bool,
    pub member_count: i64,
}

/// Member response
#[derive(Debug, Deserialize)]
pub struct MemberResponse {
    pub room_id: String,
    pub user_id: String,
    pub role: String,
    pub banned: bool,
}

/// Message response
#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub room_id: String,
    pub author_id: String,
    pub content: String,
    pub seq: u64,
}

/// Invitation response
#[derive(Debug, Deserialize)]
pub struct InvitationResponse {
    pub id: String,
    pub room_id: String,
    pub inviter_id: String,
    pub invitee_id: String,
    pub status: String,
}

/// Notification feed entry
#[derive(Debug, Deserialize)]
pub struct NotificationResponse {
    pub id: String,
    pub room_id: String,
    pub kind: String,
    pub read: bool,
}

/// Error response
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub retryable: bool,
}
