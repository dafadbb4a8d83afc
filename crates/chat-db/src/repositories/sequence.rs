//! PostgreSQL implementation of RoomSequenceRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use chat_core::traits::{RepoResult, RoomSequenceRepository};
use chat_core::value_objects::Snowflake;

use super::error::{map_db_error, seq_to_db};

/// PostgreSQL implementation of RoomSequenceRepository
#[derive(Clone)]
pub struct PgRoomSequenceRepository {
    pool: PgPool,
}

impl PgRoomSequenceRepository {
    /// Create a new PgRoomSequenceRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomSequenceRepository for PgRoomSequenceRepository {
    #[instrument(skip(self))]
    async fn current(&self, room_id: Snowflake) -> RepoResult<u64> {
        let seq = sqlx::query_scalar::<_, i64>(
            r"
            SELECT seq FROM room_sequences WHERE room_id = $1
            ",
        )
        .bind(room_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(seq.and_then(|s| u64::try_from(s).ok()).unwrap_or(0))
    }

    #[instrument(skip(self))]
    async fn advance(&self, room_id: Snowflake, seq: u64) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO room_sequences (room_id, seq)
            VALUES ($1, $2)
            ON CONFLICT (room_id) DO UPDATE SET seq = GREATEST(room_sequences.seq, EXCLUDED.seq)
            ",
        )
        .bind(room_id.into_inner())
        .bind(seq_to_db(seq)?)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }
}
