//! Membership store - all membership reads and writes go through here
//!
//! Wraps the [`MembershipRepository`](chat_core::traits::MembershipRepository)
//! with the retry policy, keeps `rooms.member_count` in line with the
//! canonical active count, and makes concurrent duplicate joins idempotent.

use chat_core::{DomainError, MemberRole, Membership, Snowflake};
use tracing::{debug, instrument};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::retry::with_retry;

/// Result of [`MembershipStore::upsert_membership`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new row was written
    Inserted,
    /// A membership for (room, user) already existed and was left untouched
    Existing,
}

/// Membership store adapter
pub struct MembershipStore<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MembershipStore<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Insert the membership unless one exists.
    ///
    /// A unique-key conflict from storage is retried once; a second conflict
    /// is surfaced.
    #[instrument(skip(self, membership), fields(room_id = %membership.room_id, user_id = %membership.user_id))]
    pub async fn upsert_membership(&self, membership: &Membership) -> ServiceResult<UpsertOutcome> {
        let repo = self.ctx.membership_repo();
        let retry = self.ctx.retry();
        let insert = || with_retry(retry, "membership.insert_if_absent", move || repo.insert_if_absent(membership));

        let inserted = match insert().await {
            Err(DomainError::Conflict(detail)) => {
                debug!(detail = %detail, "Membership insert raced, retrying once");
                insert().await?
            }
            other => other?,
        };

        if !inserted {
            return Ok(UpsertOutcome::Existing);
        }

        self.refresh_member_count(membership.room_id).await?;
        Ok(UpsertOutcome::Inserted)
    }

    pub async fn get_membership(&self, room_id: Snowflake, user_id: Snowflake) -> ServiceResult<Option<Membership>> {
        let repo = self.ctx.membership_repo();
        let membership = with_retry(self.ctx.retry(), "membership.find", || repo.find(room_id, user_id)).await?;
        Ok(membership)
    }

    /// Like [`get_membership`](Self::get_membership), failing with `MembershipNotFound`
    pub async fn require_membership(&self, room_id: Snowflake, user_id: Snowflake) -> ServiceResult<Membership> {
        self.get_membership(room_id, user_id)
            .await?
            .ok_or_else(|| DomainError::MembershipNotFound.into())
    }

    pub async fn list_active_members(&self, room_id: Snowflake) -> ServiceResult<Vec<Membership>> {
        let repo = self.ctx.membership_repo();
        let members = with_retry(self.ctx.retry(), "membership.find_active", || repo.find_active(room_id)).await?;
        Ok(members)
    }

    pub async fn list_banned_members(&self, room_id: Snowflake) -> ServiceResult<Vec<Membership>> {
        let repo = self.ctx.membership_repo();
        let members = with_retry(self.ctx.retry(), "membership.find_banned", || repo.find_banned(room_id)).await?;
        Ok(members)
    }

    /// Hard-delete a non-owner membership. Returns false if there was none.
    #[instrument(skip(self))]
    pub async fn remove_membership(&self, room_id: Snowflake, user_id: Snowflake) -> ServiceResult<bool> {
        let repo = self.ctx.membership_repo();
        let removed = with_retry(self.ctx.retry(), "membership.delete", || repo.delete(room_id, user_id)).await?;
        if removed {
            self.refresh_member_count(room_id).await?;
        }
        Ok(removed)
    }

    /// Change the role of a non-owner membership. Returns false if there was none.
    #[instrument(skip(self))]
    pub async fn set_role(&self, room_id: Snowflake, user_id: Snowflake, role: MemberRole) -> ServiceResult<bool> {
        let repo = self.ctx.membership_repo();
        let changed = with_retry(self.ctx.retry(), "membership.set_role", || repo.set_role(room_id, user_id, role)).await?;
        Ok(changed)
    }

    /// Set or clear the ban flag of a non-owner membership. Returns false if there was none.
    #[instrument(skip(self))]
    pub async fn set_banned(&self, room_id: Snowflake, user_id: Snowflake, banned: bool) -> ServiceResult<bool> {
        let repo = self.ctx.membership_repo();
        let changed =
            with_retry(self.ctx.retry(), "membership.set_banned", || repo.set_banned(room_id, user_id, banned)).await?;
        if changed {
            self.refresh_member_count(room_id).await?;
        }
        Ok(changed)
    }

    /// Recount active members and store the result on the room.
    /// Storage does both in one step, so concurrent refreshes cannot store a stale count.
    pub async fn refresh_member_count(&self, room_id: Snowflake) -> ServiceResult<i64> {
        let rooms = self.ctx.room_repo();
        let count =
            with_retry(self.ctx.retry(), "room.refresh_member_count", || rooms.refresh_member_count(room_id)).await?;

        debug!(room_id = %room_id, count, "Member count refreshed");
        Ok(count)
    }
}
