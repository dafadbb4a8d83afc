//! Redis Pub/Sub module.
//!
//! Carries user-addressed notifications between server nodes.

mod channels;
mod publisher;
mod subscriber;

pub use channels::{PubSubChannel, NOTIFICATIONS_SUFFIX, USER_CHANNEL_PREFIX, USER_NOTIFICATIONS_PATTERN};
pub use publisher::{PubSubEvent, Publisher};
pub use subscriber::{
    ReceivedMessage, Subscriber, SubscriberBuilder, SubscriberConfig, SubscriberError,
    SubscriberResult,
};
