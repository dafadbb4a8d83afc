//! # chat-cache
//!
//! Redis layer used to push per-user notifications to every server node.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Pub/Sub**: `user:{id}:notifications` channels, a publisher, and a
//!   pattern subscriber that feeds the gateway
//!
//! ## Example
//!
//! ```ignore
//! use chat_cache::{PubSubEvent, Publisher, RedisPool};
//!
//! let pool = RedisPool::from_config(&config.redis)?;
//! let publisher = Publisher::new(pool);
//!
//! let event = PubSubEvent::new("NOTIFICATION", data);
//! publisher.publish_to_user(user_id, &event).await?;
//! ```

pub mod pool;
pub mod pubsub;

pub use pool::{RedisPool, RedisPoolError, RedisResult};
pub use pubsub::{
    PubSubChannel, PubSubEvent, Publisher, ReceivedMessage, Subscriber, SubscriberBuilder,
    SubscriberConfig, SubscriberError, SubscriberResult, USER_NOTIFICATIONS_PATTERN,
};
