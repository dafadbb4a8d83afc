//! Error handling utilities for repositories

use chat_core::error::DomainError;
use chat_core::value_objects::Snowflake;
use sqlx::Error as SqlxError;

/// Convert SQLx error to DomainError.
///
/// Connection-level failures are transient and surface as `Unavailable`,
/// unique violations as `Conflict`.
pub fn map_db_error(e: SqlxError) -> DomainError {
    match &e {
        SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) | SqlxError::WorkerCrashed => {
            DomainError::Unavailable(e.to_string())
        }
        SqlxError::Database(db_err) if db_err.is_unique_violation() => {
            DomainError::Conflict(db_err.message().to_string())
        }
        _ => DomainError::InternalError(e.to_string()),
    }
}

/// A column held a value the domain type does not accept
pub fn corrupt_column(column: &str, value: &str) -> DomainError {
    DomainError::InternalError(format!("unexpected {column} value in storage: {value}"))
}

/// Sequence numbers are stored as BIGINT
pub fn seq_to_db(seq: u64) -> Result<i64, DomainError> {
    i64::try_from(seq).map_err(|_| DomainError::InternalError(format!("sequence {seq} out of range")))
}

/// Create a "room not found" error
pub fn room_not_found(id: Snowflake) -> DomainError {
    DomainError::RoomNotFound(id)
}

/// Create an "invitation not found" error
pub fn invitation_not_found(id: Snowflake) -> DomainError {
    DomainError::InvitationNotFound(id)
}
