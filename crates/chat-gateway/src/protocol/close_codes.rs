//! WebSocket close codes
//!
//! Being removed from a room never closes the socket. Removal arrives as a
//! `REMOVED` dispatch and other room views keep running.

/// Reasons the gateway ends a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    UnknownError = 4000,
    UnknownOpcode = 4001,
    /// Frame was not valid gateway JSON
    DecodeError = 4002,
    /// A room op arrived before IDENTIFY
    NotAuthenticated = 4003,
    /// IDENTIFY carried a token the verifier rejected
    AuthenticationFailed = 4004,
    AlreadyAuthenticated = 4005,
    /// IDENTIFY or a heartbeat did not arrive in time
    SessionTimeout = 4009,
}

impl CloseCode {
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Text sent in the close frame
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::UnknownError => "unknown error",
            Self::UnknownOpcode => "unknown opcode",
            Self::DecodeError => "invalid payload",
            Self::NotAuthenticated => "identify first",
            Self::AuthenticationFailed => "authentication failed",
            Self::AlreadyAuthenticated => "already identified",
            Self::SessionTimeout => "session timed out",
        }
    }

    /// Whether a client may reconnect and IDENTIFY again with the same token
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        !matches!(self, Self::AuthenticationFailed | Self::NotAuthenticated)
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}
