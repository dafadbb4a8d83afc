//! PostgreSQL implementation of RoomRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use chat_core::entities::{Membership, Room};
use chat_core::traits::{RepoResult, RoomRepository};
use chat_core::value_objects::Snowflake;

use crate::models::RoomModel;

use super::error::{map_db_error, room_not_found};

/// PostgreSQL implementation of RoomRepository
#[derive(Clone)]
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    /// Create a new PgRoomRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Room>> {
        let result = sqlx::query_as::<_, RoomModel>(
            r"
            SELECT id, name, description, visibility, password_hash, owner_id,
                   announcement, member_count, created_at, updated_at
            FROM rooms
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Room::try_from).transpose()
    }

    #[instrument(skip(self, room, owner), fields(room_id = %room.id))]
    async fn create_with_owner(&self, room: &Room, owner: &Membership) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        sqlx::query(
            r"
            INSERT INTO rooms (id, name, description, visibility, password_hash, owner_id,
                               announcement, member_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(room.id.into_inner())
        .bind(&room.name)
        .bind(&room.description)
        .bind(room.visibility.as_str())
        .bind(&room.password_hash)
        .bind(room.owner_id.into_inner())
        .bind(&room.announcement)
        .bind(room.member_count)
        .bind(room.created_at)
        .bind(room.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        sqlx::query(
            r"
            INSERT INTO room_memberships (room_id, user_id, role, banned, joined_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(owner.room_id.into_inner())
        .bind(owner.user_id.into_inner())
        .bind(owner.role.as_str())
        .bind(owner.banned)
        .bind(owner.joined_at)
        .bind(owner.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, room), fields(room_id = %room.id))]
    async fn update(&self, room: &Room) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE rooms
            SET name = $2, description = $3, visibility = $4, password_hash = $5,
                announcement = $6, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(room.id.into_inner())
        .bind(&room.name)
        .bind(&room.description)
        .bind(room.visibility.as_str())
        .bind(&room.password_hash)
        .bind(&room.announcement)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(room_not_found(room.id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn refresh_member_count(&self, room_id: Snowflake) -> RepoResult<i64> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Recounts serialize on the room row; the count below sees every
        // membership change committed before the lock was granted
        let locked: Option<(i64,)> = sqlx::query_as(
            r"
            SELECT id FROM rooms WHERE id = $1 FOR UPDATE
            ",
        )
        .bind(room_id.into_inner())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if locked.is_none() {
            return Err(room_not_found(room_id));
        }

        let (count,): (i64,) = sqlx::query_as(
            r"
            UPDATE rooms
            SET member_count = (
                SELECT COUNT(*) FROM room_memberships WHERE room_id = $1 AND banned = FALSE
            )
            WHERE id = $1
            RETURNING member_count
            ",
        )
        .bind(room_id.into_inner())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(count)
    }
}
