//! # chat-core
//!
//! Domain layer for room membership and real-time delivery: entities, value objects,
//! room events, the role authority, and repository traits.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod authority;
pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use authority::{authorize, Action, AuthorizationContext, Denial};
pub use entities::{
    Invitation, InvitationStatus, MemberRole, Membership, Message, Notification,
    NotificationKind, NotificationTarget, Room, RoomVisibility, MAX_MESSAGE_LENGTH,
};
pub use error::DomainError;
pub use events::{RemovalReason, RoomEvent, RoomEventDraft, RoomEventPayload, SequenceCheck, SequenceTracker};
pub use traits::{
    InvitationRepository, MembershipRepository, NotificationQuery, NotificationRepository,
    RepoResult, RoomRepository, RoomSequenceRepository,
};
pub use value_objects::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
