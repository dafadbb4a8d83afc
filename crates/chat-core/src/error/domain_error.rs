//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Room not found: {0}")]
    RoomNotFound(Snowflake),

    #[error("Membership not found in room")]
    MembershipNotFound,

    #[error("Invitation not found: {0}")]
    InvitationNotFound(Snowflake),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Content too long: max {max} characters")]
    ContentTooLong { max: usize },

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Only the invitee can respond to this invitation")]
    NotInvitee,

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("User is already a member of this room")]
    AlreadyMember,

    // =========================================================================
    // Business Rule Violations
    // =========================================================================
    #[error("Invitations are only available for private rooms")]
    NotPrivateRoom,

    #[error("The owner cannot leave their own room")]
    CannotLeaveOwnedRoom,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Service temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::RoomNotFound(_) => "UNKNOWN_ROOM",
            Self::MembershipNotFound => "UNKNOWN_MEMBER",
            Self::InvitationNotFound(_) => "UNKNOWN_INVITATION",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::ContentTooLong { .. } => "CONTENT_TOO_LONG",

            // Authorization
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotInvitee => "NOT_INVITEE",

            // Conflict
            Self::Conflict(_) => "CONFLICT",
            Self::AlreadyMember => "ALREADY_MEMBER",

            // Business Rules
            Self::NotPrivateRoom => "NOT_PRIVATE_ROOM",
            Self::CannotLeaveOwnedRoom => "CANNOT_LEAVE_OWNED_ROOM",

            // Infrastructure
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RoomNotFound(_) | Self::MembershipNotFound | Self::InvitationNotFound(_)
        )
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::ContentTooLong { .. }
                | Self::NotPrivateRoom
                | Self::CannotLeaveOwnedRoom
        )
    }

    /// Check if this is an authorization error
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Forbidden(_) | Self::NotInvitee)
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::AlreadyMember)
    }

    /// Transient failures that may succeed when retried after a delay
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
