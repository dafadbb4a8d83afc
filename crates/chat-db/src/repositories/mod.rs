//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in chat-core.
//! Each repository handles database operations for a specific domain entity.

mod error;
mod invitation;
mod membership;
mod notification;
mod room;
mod sequence;

pub(crate) use error::corrupt_column;

pub use invitation::PgInvitationRepository;
pub use membership::PgMembershipRepository;
pub use notification::PgNotificationRepository;
pub use room::PgRoomRepository;
pub use sequence::PgRoomSequenceRepository;
