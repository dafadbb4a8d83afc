//! Notification relay
//!
//! Receives notifications from Redis Pub/Sub and dispatches them to the
//! addressee's WebSocket connections on this node.

use crate::connection::ConnectionManager;
use crate::events::GatewayEventType;
use chat_cache::{ReceivedMessage, Subscriber, SubscriberBuilder, USER_NOTIFICATIONS_PATTERN};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Configuration for the notification relay
#[derive(Debug, Clone)]
pub struct NotificationRelayConfig {
    pub redis_url: String,
    /// Broadcast buffer size
    pub broadcast_buffer: usize,
    /// Reconnection delay in milliseconds
    pub reconnect_delay_ms: u64,
}

impl NotificationRelayConfig {
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            broadcast_buffer: 1024,
            reconnect_delay_ms: 1000,
        }
    }
}

/// Routes `user:{id}:notifications` messages to that user's connections
pub struct NotificationRelay {
    connection_manager: Arc<ConnectionManager>,
    subscriber: Subscriber,
    running: Arc<AtomicBool>,
}

impl NotificationRelay {
    /// Connects lazily; the subscriber keeps retrying in the background
    pub fn new(config: NotificationRelayConfig, connection_manager: Arc<ConnectionManager>) -> Self {
        let subscriber = SubscriberBuilder::new()
            .redis_url(config.redis_url)
            .broadcast_buffer(config.broadcast_buffer)
            .reconnect_delay_ms(config.reconnect_delay_ms)
            .psubscribe(USER_NOTIFICATIONS_PATTERN)
            .spawn();

        Self {
            connection_manager,
            subscriber,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn the relay loop
    pub fn start(self: Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Notification relay is already running");
            return;
        }

        let relay = self.clone();
        tokio::spawn(async move {
            relay.run().await;
        });

        tracing::info!("Notification relay started");
    }

    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.subscriber.shutdown().await.ok();
        tracing::info!("Notification relay stopped");
    }

    async fn run(&self) {
        let mut receiver = self.subscriber.receiver();

        while self.running.load(Ordering::SeqCst) {
            match receiver.recv().await {
                Ok(msg) => {
                    relay_message(&self.connection_manager, msg).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "Notification relay lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::warn!("Notification relay channel closed");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Notification relay loop ended");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for NotificationRelay {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Deliver one pub/sub message. Returns how many sessions received it.
async fn relay_message(connections: &ConnectionManager, msg: ReceivedMessage) -> usize {
    let Some(user_id) = msg.channel.user_id() else {
        tracing::debug!(channel = %msg.channel.name(), "Ignoring message on non-user channel");
        return 0;
    };
    let Some(event) = msg.event else {
        tracing::debug!(channel = %msg.channel.name(), "Ignoring undecodable notification");
        return 0;
    };

    let sent = connections
        .dispatch_to_user(user_id, GatewayEventType::Notification, &event.data)
        .await;

    tracing::trace!(user_id = %user_id, event_type = %event.event_type, sent, "Notification relayed");

    sent
}
