//! PostgreSQL implementation of NotificationRepository

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::instrument;

use chat_core::entities::Notification;
use chat_core::traits::{NotificationQuery, NotificationRepository, RepoResult};
use chat_core::value_objects::Snowflake;

use crate::models::NotificationModel;

use super::error::map_db_error;

/// PostgreSQL implementation of NotificationRepository
#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    /// Create a new PgNotificationRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    #[instrument(skip(self, notification), fields(user_id = %notification.user_id, kind = notification.kind.as_str()))]
    async fn create(&self, notification: &Notification) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO notifications (id, user_id, room_id, kind, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(notification.id.into_inner())
        .bind(notification.user_id.into_inner())
        .bind(notification.room_id.into_inner())
        .bind(Json(&notification.kind))
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_user(&self, user_id: Snowflake, query: NotificationQuery) -> RepoResult<Vec<Notification>> {
        let limit = query.limit.clamp(1, 100);

        let results = sqlx::query_as::<_, NotificationModel>(
            r"
            SELECT id, user_id, room_id, kind, read, created_at
            FROM notifications
            WHERE user_id = $1
              AND ($2 = FALSE OR read = FALSE)
              AND ($3::BIGINT IS NULL OR id < $3)
            ORDER BY id DESC
            LIMIT $4
            ",
        )
        .bind(user_id.into_inner())
        .bind(query.unread_only)
        .bind(query.before.map(Snowflake::into_inner))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Notification::from).collect())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn mark_read(&self, user_id: Snowflake, ids: &[Snowflake]) -> RepoResult<u64> {
        let ids: Vec<i64> = ids.iter().map(|id| id.into_inner()).collect();

        let result = sqlx::query(
            r"
            UPDATE notifications
            SET read = TRUE
            WHERE user_id = $1 AND id = ANY($2) AND read = FALSE
            ",
        )
        .bind(user_id.into_inner())
        .bind(ids)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgNotificationRepository>();
    }
}
