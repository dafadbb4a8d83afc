//! PostgreSQL implementation of InvitationRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use chat_core::entities::{Invitation, InvitationStatus, Membership};
use chat_core::error::DomainError;
use chat_core::traits::{InvitationRepository, RepoResult};
use chat_core::value_objects::Snowflake;

use crate::models::InvitationModel;

use super::error::{invitation_not_found, map_db_error};

const INVITATION_COLUMNS: &str = "id, room_id, inviter_id, invitee_id, status, created_at, updated_at";

/// PostgreSQL implementation of InvitationRepository
#[derive(Clone)]
pub struct PgInvitationRepository {
    pool: PgPool,
}

impl PgInvitationRepository {
    /// Create a new PgInvitationRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvitationRepository for PgInvitationRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Invitation>> {
        let result = sqlx::query_as::<_, InvitationModel>(&format!(
            "SELECT {INVITATION_COLUMNS} FROM room_invitations WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Invitation::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_latest(&self, room_id: Snowflake, invitee_id: Snowflake) -> RepoResult<Option<Invitation>> {
        let result = sqlx::query_as::<_, InvitationModel>(&format!(
            r"
            SELECT {INVITATION_COLUMNS}
            FROM room_invitations
            WHERE room_id = $1 AND invitee_id = $2
            ORDER BY (status = 'pending') DESC, updated_at DESC
            LIMIT 1
            "
        ))
        .bind(room_id.into_inner())
        .bind(invitee_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Invitation::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_pending_by_invitee(&self, invitee_id: Snowflake) -> RepoResult<Vec<Invitation>> {
        let results = sqlx::query_as::<_, InvitationModel>(&format!(
            r"
            SELECT {INVITATION_COLUMNS}
            FROM room_invitations
            WHERE invitee_id = $1 AND status = 'pending'
            ORDER BY created_at DESC
            "
        ))
        .bind(invitee_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(Invitation::try_from).collect()
    }

    #[instrument(skip(self, invitation), fields(room_id = %invitation.room_id, invitee_id = %invitation.invitee_id))]
    async fn upsert_pending(&self, invitation: &Invitation) -> RepoResult<Invitation> {
        let result = sqlx::query_as::<_, InvitationModel>(&format!(
            r"
            INSERT INTO room_invitations (id, room_id, inviter_id, invitee_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6)
            ON CONFLICT (room_id, invitee_id) WHERE status = 'pending'
            DO UPDATE SET inviter_id = EXCLUDED.inviter_id, updated_at = EXCLUDED.updated_at
            RETURNING {INVITATION_COLUMNS}
            "
        ))
        .bind(invitation.id.into_inner())
        .bind(invitation.room_id.into_inner())
        .bind(invitation.inviter_id.into_inner())
        .bind(invitation.invitee_id.into_inner())
        .bind(invitation.created_at)
        .bind(invitation.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Invitation::try_from(result)
    }

    #[instrument(skip(self, membership), fields(room_id = %membership.room_id, user_id = %membership.user_id))]
    async fn accept(&self, invitation_id: Snowflake, membership: &Membership) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let resolved = sqlx::query(
            r"
            UPDATE room_invitations
            SET status = 'accepted', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            ",
        )
        .bind(invitation_id.into_inner())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if resolved.rows_affected() == 0 {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM room_invitations WHERE id = $1)",
            )
            .bind(invitation_id.into_inner())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;

            return Err(if exists {
                DomainError::Conflict("invitation is no longer pending".to_string())
            } else {
                invitation_not_found(invitation_id)
            });
        }

        sqlx::query(
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
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        sqlx::query(
            r"
            UPDATE rooms
            SET member_count = (
                SELECT COUNT(*) FROM room_memberships WHERE room_id = $1 AND banned = FALSE
            )
            WHERE id = $1
            ",
        )
        .bind(membership.room_id.into_inner())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn resolve(&self, invitation_id: Snowflake, status: InvitationStatus) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE room_invitations
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            ",
        )
        .bind(invitation_id.into_inner())
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }
}
