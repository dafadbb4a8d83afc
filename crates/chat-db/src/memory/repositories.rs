//! Repository trait implementations over [`MemoryDatabase`]

use async_trait::async_trait;
use chrono::Utc;

use chat_core::entities::{Invitation, InvitationStatus, MemberRole, Membership, Notification, Room};
use chat_core::error::DomainError;
use chat_core::traits::{
    InvitationRepository, MembershipRepository, NotificationQuery, NotificationRepository,
    RepoResult, RoomRepository, RoomSequenceRepository,
};
use chat_core::value_objects::Snowflake;

use super::{MemoryDatabase, Table};

// ============================================================================
// Rooms
// ============================================================================

#[derive(Debug, Clone)]
pub struct MemoryRoomRepository {
    db: MemoryDatabase,
}

impl MemoryRoomRepository {
    pub(super) fn new(db: MemoryDatabase) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoomRepository for MemoryRoomRepository {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Room>> {
        self.db.shared.faults.check(Table::Rooms)?;
        Ok(self.db.shared.tables.read().rooms.get(&id).cloned())
    }

    async fn create_with_owner(&self, room: &Room, owner: &Membership) -> RepoResult<()> {
        self.db.shared.faults.check(Table::Rooms)?;
        let mut tables = self.db.shared.tables.write();
        if tables.rooms.contains_key(&room.id) {
            return Err(DomainError::Conflict(format!("room {} already exists", room.id)));
        }
        tables.rooms.insert(room.id, room.clone());
        tables
            .memberships
            .insert((owner.room_id, owner.user_id), owner.clone());
        Ok(())
    }

    async fn update(&self, room: &Room) -> RepoResult<()> {
        self.db.shared.faults.check(Table::Rooms)?;
        let mut tables = self.db.shared.tables.write();
        let stored = tables
            .rooms
            .get_mut(&room.id)
            .ok_or(DomainError::RoomNotFound(room.id))?;

        stored.name.clone_from(&room.name);
        stored.description.clone_from(&room.description);
        stored.visibility = room.visibility;
        stored.password_hash.clone_from(&room.password_hash);
        stored.announcement.clone_from(&room.announcement);
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn refresh_member_count(&self, room_id: Snowflake) -> RepoResult<i64> {
        self.db.shared.faults.check(Table::Rooms)?;
        let mut tables = self.db.shared.tables.write();
        let count = tables.count_active(room_id);
        let stored = tables
            .rooms
            .get_mut(&room_id)
            .ok_or(DomainError::RoomNotFound(room_id))?;
        stored.member_count = count;
        Ok(count)
    }
}

// ============================================================================
// Memberships
// ============================================================================

#[derive(Debug, Clone)]
pub struct MemoryMembershipRepository {
    db: MemoryDatabase,
}

impl MemoryMembershipRepository {
    pub(super) fn new(db: MemoryDatabase) -> Self {
        Self { db }
    }

    fn list(&self, room_id: Snowflake, banned: bool) -> Vec<Membership> {
        let tables = self.db.shared.tables.read();
        let mut members: Vec<Membership> = tables
            .memberships
            .values()
            .filter(|m| m.room_id == room_id && m.banned == banned)
            .cloned()
            .collect();
        members.sort_by_key(|m| (m.joined_at, m.user_id));
        members
    }

    /// Apply `f` to a non-owner membership. Returns false when there is none.
    fn update_non_owner(&self, room_id: Snowflake, user_id: Snowflake, f: impl FnOnce(&mut Membership)) -> bool {
        let mut tables = self.db.shared.tables.write();
        match tables.memberships.get_mut(&(room_id, user_id)) {
            Some(membership) if !membership.is_owner() => {
                f(membership);
                membership.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl MembershipRepository for MemoryMembershipRepository {
    async fn find(&self, room_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<Membership>> {
        self.db.shared.faults.check(Table::Memberships)?;
        Ok(self
            .db
            .shared
            .tables
            .read()
            .memberships
            .get(&(room_id, user_id))
            .cloned())
    }

    async fn insert_if_absent(&self, membership: &Membership) -> RepoResult<bool> {
        self.db.shared.faults.check(Table::Memberships)?;
        let mut tables = self.db.shared.tables.write();
        let key = (membership.room_id, membership.user_id);
        if tables.memberships.contains_key(&key) {
            return Ok(false);
        }
        tables.memberships.insert(key, membership.clone());
        Ok(true)
    }

    async fn set_role(&self, room_id: Snowflake, user_id: Snowflake, role: MemberRole) -> RepoResult<bool> {
        self.db.shared.faults.check(Table::Memberships)?;
        Ok(self.update_non_owner(room_id, user_id, |m| m.role = role))
    }

    async fn set_banned(&self, room_id: Snowflake, user_id: Snowflake, banned: bool) -> RepoResult<bool> {
        self.db.shared.faults.check(Table::Memberships)?;
        let mut tables = self.db.shared.tables.write();
        match tables.memberships.get_mut(&(room_id, user_id)) {
            Some(membership) if !membership.is_owner() && membership.banned != banned => {
                membership.banned = banned;
                membership.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_active(&self, room_id: Snowflake) -> RepoResult<Vec<Membership>> {
        self.db.shared.faults.check(Table::Memberships)?;
        Ok(self.list(room_id, false))
    }

    async fn find_banned(&self, room_id: Snowflake) -> RepoResult<Vec<Membership>> {
        self.db.shared.faults.check(Table::Memberships)?;
        Ok(self.list(room_id, true))
    }

    async fn delete(&self, room_id: Snowflake, user_id: Snowflake) -> RepoResult<bool> {
        self.db.shared.faults.check(Table::Memberships)?;
        let mut tables = self.db.shared.tables.write();
        let key = (room_id, user_id);
        match tables.memberships.get(&key) {
            Some(membership) if !membership.is_owner() => {
                tables.memberships.remove(&key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_active(&self, room_id: Snowflake) -> RepoResult<i64> {
        self.db.shared.faults.check(Table::Memberships)?;
        Ok(self.db.shared.tables.read().count_active(room_id))
    }
}

// ============================================================================
// Invitations
// ============================================================================

#[derive(Debug, Clone)]
pub struct MemoryInvitationRepository {
    db: MemoryDatabase,
}

impl MemoryInvitationRepository {
    pub(super) fn new(db: MemoryDatabase) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InvitationRepository for MemoryInvitationRepository {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Invitation>> {
        self.db.shared.faults.check(Table::Invitations)?;
        Ok(self.db.shared.tables.read().invitations.get(&id).cloned())
    }

    async fn find_latest(&self, room_id: Snowflake, invitee_id: Snowflake) -> RepoResult<Option<Invitation>> {
        self.db.shared.faults.check(Table::Invitations)?;
        let tables = self.db.shared.tables.read();
        Ok(tables
            .invitations
            .values()
            .filter(|i| i.room_id == room_id && i.invitee_id == invitee_id)
            .max_by_key(|i| (i.is_pending(), i.updated_at))
            .cloned())
    }

    async fn find_pending_by_invitee(&self, invitee_id: Snowflake) -> RepoResult<Vec<Invitation>> {
        self.db.shared.faults.check(Table::Invitations)?;
        let tables = self.db.shared.tables.read();
        let mut pending: Vec<Invitation> = tables
            .invitations
            .values()
            .filter(|i| i.invitee_id == invitee_id && i.is_pending())
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pending)
    }

    async fn upsert_pending(&self, invitation: &Invitation) -> RepoResult<Invitation> {
        self.db.shared.faults.check(Table::Invitations)?;
        let mut tables = self.db.shared.tables.write();

        let existing = tables.invitations.values_mut().find(|i| {
            i.room_id == invitation.room_id && i.invitee_id == invitation.invitee_id && i.is_pending()
        });
        if let Some(existing) = existing {
            existing.inviter_id = invitation.inviter_id;
            existing.updated_at = invitation.updated_at;
            return Ok(existing.clone());
        }

        let mut stored = invitation.clone();
        stored.status = InvitationStatus::Pending;
        tables.invitations.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn accept(&self, invitation_id: Snowflake, membership: &Membership) -> RepoResult<()> {
        self.db.shared.faults.check(Table::Invitations)?;
        let mut tables = self.db.shared.tables.write();

        let invitation = tables
            .invitations
            .get_mut(&invitation_id)
            .ok_or(DomainError::InvitationNotFound(invitation_id))?;
        if !invitation.resolve(InvitationStatus::Accepted) {
            return Err(DomainError::Conflict("invitation is no longer pending".to_string()));
        }

        tables
            .memberships
            .entry((membership.room_id, membership.user_id))
            .or_insert_with(|| membership.clone());

        let count = tables.count_active(membership.room_id);
        if let Some(room) = tables.rooms.get_mut(&membership.room_id) {
            room.member_count = count;
        }
        Ok(())
    }

    async fn resolve(&self, invitation_id: Snowflake, status: InvitationStatus) -> RepoResult<bool> {
        self.db.shared.faults.check(Table::Invitations)?;
        let mut tables = self.db.shared.tables.write();
        Ok(tables
            .invitations
            .get_mut(&invitation_id)
            .is_some_and(|i| i.resolve(status)))
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone)]
pub struct MemoryNotificationRepository {
    db: MemoryDatabase,
}

impl MemoryNotificationRepository {
    pub(super) fn new(db: MemoryDatabase) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationRepository for MemoryNotificationRepository {
    async fn create(&self, notification: &Notification) -> RepoResult<()> {
        self.db.shared.faults.check(Table::Notifications)?;
        let mut tables = self.db.shared.tables.write();
        if !tables.notifications.iter().any(|n| n.id == notification.id) {
            tables.notifications.push(notification.clone());
        }
        Ok(())
    }

    async fn find_by_user(&self, user_id: Snowflake, query: NotificationQuery) -> RepoResult<Vec<Notification>> {
        self.db.shared.faults.check(Table::Notifications)?;
        let limit = usize::try_from(query.limit.clamp(1, 100)).unwrap_or(100);
        let tables = self.db.shared.tables.read();

        let mut feed: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .filter(|n| !query.unread_only || !n.read)
            .filter(|n| query.before.map_or(true, |before| n.id < before))
            .cloned()
            .collect();
        feed.sort_by(|a, b| b.id.cmp(&a.id));
        feed.truncate(limit);
        Ok(feed)
    }

    async fn mark_read(&self, user_id: Snowflake, ids: &[Snowflake]) -> RepoResult<u64> {
        self.db.shared.faults.check(Table::Notifications)?;
        let mut tables = self.db.shared.tables.write();
        let mut changed = 0;
        for notification in tables
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.read && ids.contains(&n.id))
        {
            notification.read = true;
            changed += 1;
        }
        Ok(changed)
    }
}

// ============================================================================
// Room sequences
// ============================================================================

#[derive(Debug, Clone)]
pub struct MemoryRoomSequenceRepository {
    db: MemoryDatabase,
}

impl MemoryRoomSequenceRepository {
    pub(super) fn new(db: MemoryDatabase) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoomSequenceRepository for MemoryRoomSequenceRepository {
    async fn current(&self, room_id: Snowflake) -> RepoResult<u64> {
        self.db.shared.faults.check(Table::Sequences)?;
        Ok(self
            .db
            .shared
            .tables
            .read()
            .sequences
            .get(&room_id)
            .copied()
            .unwrap_or(0))
    }

    async fn advance(&self, room_id: Snowflake, seq: u64) -> RepoResult<()> {
        self.db.shared.faults.check(Table::Sequences)?;
        let mut tables = self.db.shared.tables.write();
        let stored = tables.sequences.entry(room_id).or_insert(0);
        *stored = (*stored).max(seq);
        Ok(())
    }
}
