//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation. Implementations report transient storage
//! failures as [`DomainError::Unavailable`] and unique-key races as
//! [`DomainError::Conflict`].

use async_trait::async_trait;

use crate::entities::{Invitation, InvitationStatus, MemberRole, Membership, Notification, Room};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Room Repository
// ============================================================================

#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Find room by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Room>>;

    /// Insert the room and its owner membership in a single transaction
    async fn create_with_owner(&self, room: &Room, owner: &Membership) -> RepoResult<()>;

    /// Update name, description, visibility, password and announcement
    async fn update(&self, room: &Room) -> RepoResult<()>;

    /// Recount non-banned memberships and store the result on the room in one step.
    /// Returns the new count.
    async fn refresh_member_count(&self, room_id: Snowflake) -> RepoResult<i64>;
}

// ============================================================================
// Membership Repository
// ============================================================================

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Find membership by room and user ID
    async fn find(&self, room_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<Membership>>;

    /// Insert the membership unless one already exists for (room, user).
    /// Returns true when a row was inserted.
    async fn insert_if_absent(&self, membership: &Membership) -> RepoResult<bool>;

    /// Change the role of a non-owner membership. Returns false when no such row exists.
    async fn set_role(&self, room_id: Snowflake, user_id: Snowflake, role: MemberRole) -> RepoResult<bool>;

    /// Set the ban flag of a non-owner membership. Returns false when no such row
    /// exists or the flag already had that value.
    async fn set_banned(&self, room_id: Snowflake, user_id: Snowflake, banned: bool) -> RepoResult<bool>;

    /// List non-banned memberships, oldest first
    async fn find_active(&self, room_id: Snowflake) -> RepoResult<Vec<Membership>>;

    /// List banned memberships, oldest first
    async fn find_banned(&self, room_id: Snowflake) -> RepoResult<Vec<Membership>>;

    /// Delete a non-owner membership. Returns false when no such row exists.
    async fn delete(&self, room_id: Snowflake, user_id: Snowflake) -> RepoResult<bool>;

    /// Count non-banned memberships
    async fn count_active(&self, room_id: Snowflake) -> RepoResult<i64>;
}

// ============================================================================
// Invitation Repository
// ============================================================================

#[async_trait]
pub trait InvitationRepository: Send + Sync {
    /// Find invitation by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Invitation>>;

    /// Most recent invitation of `invitee_id` to the room, pending ones first
    async fn find_latest(&self, room_id: Snowflake, invitee_id: Snowflake) -> RepoResult<Option<Invitation>>;

    /// Pending invitations addressed to a user
    async fn find_pending_by_invitee(&self, invitee_id: Snowflake) -> RepoResult<Vec<Invitation>>;

    /// Store a pending invitation, replacing the inviter of any pending one for
    /// the same (room, invitee). Returns the stored row, which keeps the id of
    /// the replaced invitation.
    async fn upsert_pending(&self, invitation: &Invitation) -> RepoResult<Invitation>;

    /// In one transaction: mark the pending invitation accepted, insert the
    /// membership if absent and refresh the room's member count.
    /// Fails with `Conflict` if the invitation is no longer pending.
    async fn accept(&self, invitation_id: Snowflake, membership: &Membership) -> RepoResult<()>;

    /// Resolve a pending invitation. Returns false if it was not pending.
    async fn resolve(&self, invitation_id: Snowflake, status: InvitationStatus) -> RepoResult<bool>;
}

// ============================================================================
// Notification Repository
// ============================================================================

/// Filter options for the notification feed
#[derive(Debug, Clone, Copy)]
pub struct NotificationQuery {
    pub unread_only: bool,
    pub before: Option<Snowflake>,
    pub limit: i64,
}

impl Default for NotificationQuery {
    fn default() -> Self {
        Self {
            unread_only: false,
            before: None,
            limit: 50,
        }
    }
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Persist a notification
    async fn create(&self, notification: &Notification) -> RepoResult<()>;

    /// Newest-first feed for a user
    async fn find_by_user(&self, user_id: Snowflake, query: NotificationQuery) -> RepoResult<Vec<Notification>>;

    /// Mark notifications of `user_id` as read. Returns the number of rows changed.
    async fn mark_read(&self, user_id: Snowflake, ids: &[Snowflake]) -> RepoResult<u64>;
}

// ============================================================================
// Room Sequence Repository
// ============================================================================

#[async_trait]
pub trait RoomSequenceRepository: Send + Sync {
    /// Highest sequence number emitted for the room, 0 if none
    async fn current(&self, room_id: Snowflake) -> RepoResult<u64>;

    /// Raise the stored high-water mark to `seq`. Lower values are ignored.
    async fn advance(&self, room_id: Snowflake, seq: u64) -> RepoResult<()>;
}
