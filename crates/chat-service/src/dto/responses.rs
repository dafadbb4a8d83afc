//! Response DTOs for API endpoints
//!
//! All response DTOs implement `Serialize` for JSON output.
//! Snowflake IDs are serialized as strings for JavaScript compatibility.

use chat_core::{InvitationStatus, MemberRole, NotificationKind, RoomVisibility};
use chrono::{DateTime, Utc};
use serde::Serialize;

// ============================================================================
// Room Responses
// ============================================================================

/// Room response. The password hash never leaves the service.
#[derive(Debug, Clone, Serialize)]
pub struct RoomResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub visibility: RoomVisibility,
    pub owner_id: String,
    pub announcement: Option<String>,
    pub has_password: bool,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Membership row as seen by clients
#[derive(Debug, Clone, Serialize)]
pub struct MemberResponse {
    pub room_id: String,
    pub user_id: String,
    pub role: MemberRole,
    pub banned: bool,
    pub joined_at: DateTime<Utc>,
}

/// Current room state with the sequence number it reflects.
///
/// Events with a higher sequence number apply on top of it.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub room: RoomResponse,
    pub members: Vec<MemberResponse>,
    pub banned: Vec<MemberResponse>,
    pub seq: u64,
}

// ============================================================================
// Message Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub room_id: String,
    pub author_id: String,
    pub content: String,
    /// Sequence number of the `MESSAGE_POSTED` event
    pub seq: u64,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Invitation Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct InvitationResponse {
    pub id: String,
    pub room_id: String,
    pub inviter_id: String,
    pub invitee_id: String,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Notification Responses
// ============================================================================

/// Notification feed entry; `kind` and its fields are inlined
#[derive(Debug, Clone, Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub room_id: String,
    #[serde(flatten)]
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Health Responses
// ============================================================================

/// Basic health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub checks: HealthChecks,
}

/// Health check status for each backing service
#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    pub database: String,
    pub redis: String,
}

fn check_status(healthy: Option<bool>) -> &'static str {
    match healthy {
        Some(true) => "healthy",
        Some(false) => "unhealthy",
        None => "disabled",
    }
}

impl ReadinessResponse {
    /// `None` marks a backend that is not configured; it does not block readiness
    pub fn ready(database_healthy: Option<bool>, redis_healthy: Option<bool>) -> Self {
        let all_healthy = database_healthy != Some(false) && redis_healthy != Some(false);
        Self {
            status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
            timestamp: Utc::now(),
            checks: HealthChecks {
                database: check_status(database_healthy).to_string(),
                redis: check_status(redis_healthy).to_string(),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::Snowflake;

    #[test]
    fn test_notification_kind_is_inlined() {
        let response = NotificationResponse {
            id: "1".to_string(),
            room_id: "2".to_string(),
            kind: NotificationKind::Kicked {
                actor_id: Snowflake::new(3),
            },
            read: false,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["kind"], "KICKED");
        assert_eq!(json["actor_id"], "3");
        assert_eq!(json["read"], false);
    }

    #[test]
    fn test_health_response() {
        let health = HealthResponse::healthy();
        assert_eq!(health.status, "healthy");
    }

    #[test]
    fn test_readiness_ignores_disabled_backends() {
        let memory_only = ReadinessResponse::ready(None, None);
        assert!(memory_only.is_ready());
        assert_eq!(memory_only.checks.redis, "disabled");

        let degraded = ReadinessResponse::ready(Some(true), Some(false));
        assert!(!degraded.is_ready());
        assert_eq!(degraded.checks.database, "healthy");
    }
}
