//! In-memory repository implementations
//!
//! Same contract as the PostgreSQL repositories, backed by process-local
//! tables behind a single lock so multi-row writes stay atomic. Used by the
//! `memory` storage backend and by service tests, which can inject storage
//! faults through [`MemoryDatabase::fail_next`].

mod faults;
mod repositories;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use chat_core::entities::{Invitation, Membership, Notification, Room};
use chat_core::value_objects::Snowflake;

pub use faults::{Fault, Table};
pub use repositories::{
    MemoryInvitationRepository, MemoryMembershipRepository, MemoryNotificationRepository,
    MemoryRoomRepository, MemoryRoomSequenceRepository,
};

use faults::FaultPlan;

#[derive(Debug, Default)]
struct Tables {
    rooms: HashMap<Snowflake, Room>,
    memberships: HashMap<(Snowflake, Snowflake), Membership>,
    invitations: HashMap<Snowflake, Invitation>,
    notifications: Vec<Notification>,
    sequences: HashMap<Snowflake, u64>,
}

impl Tables {
    fn count_active(&self, room_id: Snowflake) -> i64 {
        let count = self
            .memberships
            .values()
            .filter(|m| m.room_id == room_id && m.is_active())
            .count();
        i64::try_from(count).unwrap_or(i64::MAX)
    }
}

#[derive(Debug, Default)]
struct Shared {
    tables: RwLock<Tables>,
    faults: FaultPlan,
}

/// Handle to one in-memory database. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    shared: Arc<Shared>,
}

impl MemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` calls touching `table` fail with `fault`
    pub fn fail_next(&self, table: Table, fault: Fault, times: u32) {
        self.shared.faults.push(table, fault, times);
    }

    /// Drop all pending injected faults
    pub fn clear_faults(&self) {
        self.shared.faults.clear();
    }

    #[must_use]
    pub fn rooms(&self) -> MemoryRoomRepository {
        MemoryRoomRepository::new(self.clone())
    }

    #[must_use]
    pub fn memberships(&self) -> MemoryMembershipRepository {
        MemoryMembershipRepository::new(self.clone())
    }

    #[must_use]
    pub fn invitations(&self) -> MemoryInvitationRepository {
        MemoryInvitationRepository::new(self.clone())
    }

    #[must_use]
    pub fn notifications(&self) -> MemoryNotificationRepository {
        MemoryNotificationRepository::new(self.clone())
    }

    #[must_use]
    pub fn sequences(&self) -> MemoryRoomSequenceRepository {
        MemoryRoomSequenceRepository::new(self.clone())
    }

    /// Number of stored notifications, across all users
    #[must_use]
    pub fn notification_count(&self) -> usize {
        self.shared.tables.read().notifications.len()
    }
}
