//! PostgreSQL implementation of MembershipRepository
//!
//! Every mutating statement except the insert carries `role <> 'owner'`, so
//! the owner row can never be re-roled, banned or deleted through this
//! repository.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use chat_core::entities::{MemberRole, Membership};
use chat_core::traits::{MembershipRepository, RepoResult};
use chat_core::value_objects::Snowflake;

use crate::mappers::memberships_from_models;
use crate::models::MembershipModel;

use super::error::map_db_error;

/// PostgreSQL implementation of MembershipRepository
#[derive(Clone)]
pub struct PgMembershipRepository {
    pool: PgPool,
}

impl PgMembershipRepository {
    /// Create a new PgMembershipRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_ban_flag(&self, room_id: Snowflake, banned: bool) -> RepoResult<Vec<Membership>> {
        let results = sqlx::query_as::<_, MembershipModel>(
            r"
            SELECT room_id, user_id, role, banned, joined_at, updated_at
            FROM room_memberships
            WHERE room_id = $1 AND banned = $2
            ORDER BY joined_at, user_id
            ",
        )
        .bind(room_id.into_inner())
        .bind(banned)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        memberships_from_models(results)
    }
}

#[async_trait]
impl MembershipRepository for PgMembershipRepository {
    #[instrument(skip(self))]
    async fn find(&self, room_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<Membership>> {
        let result = sqlx::query_as::<_, MembershipModel>(
            r"
            SELECT room_id, user_id, role, banned, joined_at, updated_at
            FROM room_memberships
            WHERE room_id = $1 AND user_id = $2
            ",
        )
        .bind(room_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Membership::try_from).transpose()
    }

    #[instrument(skip(self, membership), fields(room_id = %membership.room_id, user_id = %membership.user_id))]
    async fn insert_if_absent(&self, membership: &Membership) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO room_memberships (room_id, user_id, role, banned, joined_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (room_id, user_id) DO NOTHING
            ",
        )
        .bind(membership.room_id.into_inner())
        .bind(membership.user_id.into_inner())
        .bind(membership.role.as_str())
        .bind(membership.banned)
        .bind(membership.joined_at)
        .bind(membership.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn set_role(&self, room_id: Snowflake, user_id: Snowflake, role: MemberRole) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE room_memberships
            SET role = $3, updated_at = NOW()
            WHERE room_id = $1 AND user_id = $2 AND role <> 'owner'
            ",
        )
        .bind(room_id.into_inner())
        .bind(user_id.into_inner())
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn set_banned(&self, room_id: Snowflake, user_id: Snowflake, banned: bool) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE room_memberships
            SET banned = $3, updated_at = NOW()
            WHERE room_id = $1 AND user_id = $2 AND role <> 'owner' AND banned <> $3
            ",
        )
        .bind(room_id.into_inner())
        .bind(user_id.into_inner())
        .bind(banned)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn find_active(&self, room_id: Snowflake) -> RepoResult<Vec<Membership>> {
        self.find_by_ban_flag(room_id, false).await
    }

    #[instrument(skip(self))]
    async fn find_banned(&self, room_id: Snowflake) -> RepoResult<Vec<Membership>> {
        self.find_by_ban_flag(room_id, true).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, room_id: Snowflake, user_id: Snowflake) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            DELETE FROM room_memberships
            WHERE room_id = $1 AND user_id = $2 AND role <> 'owner'
            ",
        )
        .bind(room_id.into_inner())
        .bind(user_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn count_active(&self, room_id: Snowflake) -> RepoResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM room_memberships WHERE room_id = $1 AND banned = FALSE
            ",
        )
        .bind(room_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgMembershipRepository>();
    }
}
