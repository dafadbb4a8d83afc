//! Business logic services
//!
//! Services borrow a [`ServiceContext`] and are cheap to construct per call.
//! Every membership read and write goes through [`MembershipStore`]; room
//! events go through the [`RoomEventBus`]; user-directed signals go through
//! the [`NotificationFanout`].

pub mod bus;
pub mod context;
pub mod error;
pub mod invitation;
pub mod membership;
pub mod notification;
pub mod retry;
pub mod room;
pub mod subscription;

#[cfg(test)]
pub(crate) mod testing;

pub use bus::{BusSubscription, RoomEventBus, SubscriberId};
pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use invitation::InvitationService;
pub use membership::{MembershipStore, UpsertOutcome};
pub use notification::{NotificationFanout, NotificationService, NOTIFICATION_EVENT};
pub use retry::with_retry;
pub use room::RoomService;
pub use subscription::{
    Delivery, ResyncOutcome, RoomSubscription, SessionId, SubscriptionManager, SubscriptionService,
    SubscriptionState,
};
