//! Database models - SQLx-compatible structs for PostgreSQL tables

mod invitation;
mod membership;
mod notification;
mod room;

pub use invitation::InvitationModel;
pub use membership::MembershipModel;
pub use notification::NotificationModel;
pub use room::RoomModel;
