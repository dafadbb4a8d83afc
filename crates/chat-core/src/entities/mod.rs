//! Domain entities - core business objects

mod invitation;
mod membership;
mod message;
mod notification;
mod room;

pub use invitation::{Invitation, InvitationStatus};
pub use membership::{MemberRole, Membership};
pub use message::{Message, MAX_MESSAGE_LENGTH};
pub use notification::{Notification, NotificationKind, NotificationTarget};
pub use room::{Room, RoomVisibility};
