//! Injected storage failures

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use chat_core::error::DomainError;

/// Table a repository call touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Rooms,
    Memberships,
    Invitations,
    Notifications,
    Sequences,
}

/// Failure to report instead of running the call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Transient outage, reported as `DomainError::Unavailable`
    Unavailable,
    /// Unique-key race, reported as `DomainError::Conflict`
    Conflict,
}

impl Fault {
    fn into_error(self, table: Table) -> DomainError {
        match self {
            Self::Unavailable => DomainError::Unavailable(format!("injected outage on {table:?}")),
            Self::Conflict => DomainError::Conflict(format!("injected conflict on {table:?}")),
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct FaultPlan {
    pending: Mutex<HashMap<Table, VecDeque<Fault>>>,
}

impl FaultPlan {
    pub(super) fn push(&self, table: Table, fault: Fault, times: u32) {
        let mut pending = self.pending.lock();
        let queue = pending.entry(table).or_default();
        for _ in 0..times {
            queue.push_back(fault);
        }
    }

    pub(super) fn clear(&self) {
        self.pending.lock().clear();
    }

    /// Consume the next fault planned for `table`, if any
    pub(super) fn check(&self, table: Table) -> Result<(), DomainError> {
        let fault = self.pending.lock().get_mut(&table).and_then(VecDeque::pop_front);
        match fault {
            Some(fault) => Err(fault.into_error(table)),
            None => Ok(()),
        }
    }
}
