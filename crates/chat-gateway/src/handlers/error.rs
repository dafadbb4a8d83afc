//! Handler error types

use crate::protocol::CloseCode;
use thiserror::Error;

/// Handler error type
///
/// Every variant ends the connection. Refused room operations are not
/// errors here; they are answered with a `SUBSCRIBE_FAILED` dispatch.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Invalid payload received
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Not authenticated
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The outbound queue is closed
    #[error("Connection closed")]
    ConnectionClosed,
}

impl HandlerError {
    /// Convert to a close code
    pub fn to_close_code(&self) -> CloseCode {
        match self {
            Self::InvalidPayload(_) => CloseCode::DecodeError,
            Self::AuthenticationFailed(_) => CloseCode::AuthenticationFailed,
            Self::NotAuthenticated => CloseCode::NotAuthenticated,
            Self::ConnectionClosed => CloseCode::UnknownError,
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
