//! Ports implemented by the infrastructure layer

mod repositories;

pub use repositories::{
    InvitationRepository, MembershipRepository, NotificationQuery, NotificationRepository,
    RepoResult, RoomRepository, RoomSequenceRepository,
};
