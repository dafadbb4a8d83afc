//! Notification fanout and the per-user notification feed
//!
//! User-directed signals (bans, kicks, role changes, invitations) are handed
//! to a background worker over an unbounded channel. The worker persists each
//! notification, retrying transient failures, then pushes it on the
//! addressee's Redis channel when Redis is configured. Nothing here ever
//! reports back to the action that produced the signal.

use std::sync::Arc;

use chat_cache::{PubSubEvent, Publisher};
use chat_common::RetryConfig;
use chat_core::traits::{NotificationQuery, NotificationRepository};
use chat_core::{Notification, NotificationTarget, RoomEvent, Snowflake, SnowflakeGenerator};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::retry::with_retry;
use crate::dto::{NotificationQueryParams, NotificationResponse};

/// Event type used for pushed notifications
pub const NOTIFICATION_EVENT: &str = "NOTIFICATION";

enum Command {
    Deliver(NotificationTarget),
    Flush(oneshot::Sender<()>),
}

/// Handle for submitting notifications to the fanout worker
#[derive(Clone)]
pub struct NotificationFanout {
    tx: mpsc::UnboundedSender<Command>,
}

impl NotificationFanout {
    /// Start the worker on the current tokio runtime
    pub fn spawn(
        repo: Arc<dyn NotificationRepository>,
        ids: Arc<SnowflakeGenerator>,
        retry: RetryConfig,
        publisher: Option<Publisher>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = FanoutWorker {
            repo,
            ids,
            retry,
            publisher,
        };
        tokio::spawn(worker.run(rx));
        Self { tx }
    }

    /// Queue a notification. Never blocks.
    pub fn submit(&self, target: NotificationTarget) {
        if self.tx.send(Command::Deliver(target)).is_err() {
            warn!("Notification worker stopped, notification dropped");
        }
    }

    /// Queue the notification carried by a room event, if it has one
    pub fn submit_event(&self, event: &RoomEvent) {
        if let Some(target) = NotificationTarget::from_event(event) {
            self.submit(target);
        }
    }

    /// Wait until everything submitted before this call has been handled
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

impl std::fmt::Debug for NotificationFanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationFanout")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

struct FanoutWorker {
    repo: Arc<dyn NotificationRepository>,
    ids: Arc<SnowflakeGenerator>,
    retry: RetryConfig,
    publisher: Option<Publisher>,
}

impl FanoutWorker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Deliver(target) => self.deliver(target).await,
                Command::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        debug!("Notification worker stopped");
    }

    async fn deliver(&self, target: NotificationTarget) {
        let notification = target.into_notification(self.ids.generate());
        let repo = self.repo.as_ref();

        if let Err(e) = with_retry(&self.retry, "notification.create", || repo.create(&notification)).await {
            warn!(
                user_id = %notification.user_id,
                room_id = %notification.room_id,
                kind = notification.kind.as_str(),
                error = %e,
                "Failed to persist notification"
            );
            return;
        }

        debug!(
            user_id = %notification.user_id,
            kind = notification.kind.as_str(),
            "Notification stored"
        );

        if let Some(publisher) = &self.publisher {
            Self::push(publisher, &notification).await;
        }
    }

    async fn push(publisher: &Publisher, notification: &Notification) {
        let event = match PubSubEvent::from_serialize(NOTIFICATION_EVENT, &NotificationResponse::from(notification)) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Failed to encode notification");
                return;
            }
        };

        if let Err(e) = publisher.publish_to_user(notification.user_id, &event).await {
            warn!(user_id = %notification.user_id, error = %e, "Failed to push notification");
        }
    }
}

/// Per-user notification feed
pub struct NotificationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> NotificationService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Newest-first notifications of `user_id`
    #[instrument(skip(self))]
    pub async fn list_notifications(
        &self,
        user_id: Snowflake,
        params: NotificationQueryParams,
    ) -> ServiceResult<Vec<NotificationResponse>> {
        let query = NotificationQuery {
            unread_only: params.unread_only.unwrap_or(false),
            before: params.before,
            limit: params.limit.unwrap_or(50).clamp(1, 100),
        };

        let repo = self.ctx.notification_repo();
        let notifications =
            with_retry(self.ctx.retry(), "notification.find_by_user", || repo.find_by_user(user_id, query)).await?;

        Ok(notifications.iter().map(NotificationResponse::from).collect())
    }

    /// Mark notifications of `user_id` as read; ids of other users are ignored
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn mark_read(&self, user_id: Snowflake, ids: &[Snowflake]) -> ServiceResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let repo = self.ctx.notification_repo();
        let updated = with_retry(self.ctx.retry(), "notification.mark_read", || repo.mark_read(user_id, ids)).await?;

        info!(user_id = %user_id, updated, "Notifications marked read");
        Ok(updated)
    }
}
