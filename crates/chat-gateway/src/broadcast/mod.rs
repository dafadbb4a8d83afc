//! Event broadcasting
//!
//! Room events reach a connection through one pump task per subscribed room.
//! Notifications published on Redis reach every session of their addressee
//! through the relay.

mod notifications;
mod room_pump;

pub use notifications::{NotificationRelay, NotificationRelayConfig};
pub use room_pump::spawn_room_pump;
