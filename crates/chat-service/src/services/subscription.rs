//! Presence and subscription management
//!
//! Tracks one state machine per (session, room):
//! `Unsubscribed -> Subscribing -> Subscribed -> Unsubscribed`.
//!
//! A subscription is only registered with the bus after `ViewRoom` passes,
//! and access is checked once more after registering.
//! Dropping a subscribe future midway restores `Unsubscribed` and leaves
//! nothing registered. When a ban or kick targets the subscribed user, the
//! subscription ends itself and yields [`Delivery::Removed`].

use std::sync::Arc;

use chat_core::{
    authorize, Action, AuthorizationContext, Membership, RemovalReason, Room, RoomEvent,
    SequenceCheck, SequenceTracker, Snowflake,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use super::bus::{RoomEventBus, SubscriberId};
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::membership::MembershipStore;
use super::room::RoomService;
use super::retry::with_retry;
use crate::dto::RoomSnapshot;

/// Identifies one gateway connection
pub type SessionId = Snowflake;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribing,
    Subscribed,
}

#[derive(Debug, Clone, Copy)]
struct SubscriptionEntry {
    state: SubscriptionState,
    /// Bus registration, present once the bus accepted the subscriber
    bus_id: Option<SubscriberId>,
    /// Distinguishes this attempt from later ones on the same key
    attempt: u64,
}

type Key = (SessionId, Snowflake);

struct ManagerInner {
    bus: RoomEventBus,
    entries: DashMap<Key, SubscriptionEntry>,
    attempts: std::sync::atomic::AtomicU64,
}

/// Registry of (session, room) subscription states. Clones share state.
#[derive(Clone)]
pub struct SubscriptionManager {
    inner: Arc<ManagerInner>,
}

impl SubscriptionManager {
    pub fn new(bus: RoomEventBus) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                bus,
                entries: DashMap::new(),
                attempts: std::sync::atomic::AtomicU64::new(1),
            }),
        }
    }

    pub fn state(&self, session_id: SessionId, room_id: Snowflake) -> SubscriptionState {
        self.inner
            .entries
            .get(&(session_id, room_id))
            .map_or(SubscriptionState::Unsubscribed, |e| e.state)
    }

    /// Rooms the session currently has an entry for, in any state but `Unsubscribed`
    pub fn rooms_of(&self, session_id: SessionId) -> Vec<Snowflake> {
        self.inner
            .entries
            .iter()
            .filter(|e| e.key().0 == session_id)
            .map(|e| e.key().1)
            .collect()
    }

    /// Move (session, room) to `Subscribing`
    fn begin(&self, session_id: SessionId, room_id: Snowflake) -> ServiceResult<PendingSubscription> {
        let attempt = self.inner.attempts.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        match self.inner.entries.entry((session_id, room_id)) {
            Entry::Occupied(existing) => {
                let msg = match existing.get().state {
                    SubscriptionState::Subscribing => "subscription already in progress",
                    _ => "already subscribed to this room",
                };
                Err(ServiceError::conflict(msg))
            }
            Entry::Vacant(slot) => {
                slot.insert(SubscriptionEntry {
                    state: SubscriptionState::Subscribing,
                    bus_id: None,
                    attempt,
                });
                Ok(PendingSubscription {
                    manager: self.clone(),
                    key: (session_id, room_id),
                    attempt,
                    completed: false,
                })
            }
        }
    }

    /// Drop the entry for `key` if it still belongs to `attempt`, and its bus registration
    fn release(&self, key: Key, attempt: u64) -> bool {
        let Some((_, entry)) = self.inner.entries.remove_if(&key, |_, e| e.attempt == attempt) else {
            return false;
        };
        if let Some(bus_id) = entry.bus_id {
            self.inner.bus.unsubscribe(key.1, bus_id);
        }
        true
    }

    /// End the (session, room) subscription. Idempotent.
    pub fn unsubscribe(&self, session_id: SessionId, room_id: Snowflake) -> bool {
        let Some((_, entry)) = self.inner.entries.remove(&(session_id, room_id)) else {
            return false;
        };
        if let Some(bus_id) = entry.bus_id {
            self.inner.bus.unsubscribe(room_id, bus_id);
        }
        debug!(session_id = %session_id, room_id = %room_id, "Unsubscribed");
        true
    }

    /// End every subscription of the session. Returns how many were removed.
    pub fn disconnect(&self, session_id: SessionId) -> usize {
        let rooms = self.rooms_of(session_id);
        let removed = rooms
            .into_iter()
            .filter(|room_id| self.unsubscribe(session_id, *room_id))
            .count();
        debug!(session_id = %session_id, removed, "Session subscriptions cleared");
        removed
    }
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("entries", &self.inner.entries.len())
            .finish_non_exhaustive()
    }
}

/// Guard for a subscription between `Subscribing` and `Subscribed`.
/// Dropping it before [`complete`](Self::complete) rolls back to `Unsubscribed`.
struct PendingSubscription {
    manager: SubscriptionManager,
    key: Key,
    attempt: u64,
    completed: bool,
}

impl PendingSubscription {
    fn attach(&self, bus_id: SubscriberId) {
        if let Some(mut entry) = self.manager.inner.entries.get_mut(&self.key) {
            if entry.attempt == self.attempt {
                entry.bus_id = Some(bus_id);
            }
        }
    }

    /// Move to `Subscribed`. Fails if the entry was removed meanwhile.
    fn complete(mut self) -> ServiceResult<()> {
        let subscribed = match self.manager.inner.entries.get_mut(&self.key) {
            Some(mut entry) if entry.attempt == self.attempt => {
                entry.state = SubscriptionState::Subscribed;
                true
            }
            _ => false,
        };
        if !subscribed {
            return Err(ServiceError::conflict("subscription was cancelled"));
        }
        self.completed = true;
        Ok(())
    }
}

impl Drop for PendingSubscription {
    fn drop(&mut self) {
        if !self.completed && self.manager.release(self.key, self.attempt) {
            debug!(session_id = %self.key.0, room_id = %self.key.1, "Subscribe cancelled");
        }
    }
}

/// What a subscription yields next
#[derive(Debug, Clone)]
pub enum Delivery {
    /// In-order event to forward
    Event(Arc<RoomEvent>),
    /// The user was banned or kicked; the subscription has ended
    Removed { room_id: Snowflake, reason: RemovalReason },
    /// Events were missed; call [`RoomSubscription::resync`]
    Gap { expected: u64, received: u64 },
}

/// Result of [`RoomSubscription::resync`]
#[derive(Debug, Clone)]
pub enum ResyncOutcome {
    /// Current state; delivery continues after `snapshot.seq`
    Snapshot(RoomSnapshot),
    /// Access is gone and the subscription has ended
    Removed(RemovalReason),
}

/// A live room subscription of one session
pub struct RoomSubscription {
    session_id: SessionId,
    room_id: Snowflake,
    user_id: Snowflake,
    attempt: u64,
    receiver: Option<mpsc::Receiver<Arc<RoomEvent>>>,
    tracker: SequenceTracker,
    snapshot: Option<RoomSnapshot>,
    manager: SubscriptionManager,
}

impl RoomSubscription {
    pub fn room_id(&self) -> Snowflake {
        self.room_id
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Last sequence number delivered
    pub fn last_seq(&self) -> u64 {
        self.tracker.last()
    }

    /// The snapshot taken at subscribe time. Returns `None` after the first call.
    pub fn take_snapshot(&mut self) -> Option<RoomSnapshot> {
        self.snapshot.take()
    }

    /// Wait for the next delivery. Returns `None` once the subscription ended.
    pub async fn next(&mut self) -> Option<Delivery> {
        loop {
            let event = self.receiver.as_mut()?.recv().await?;

            match self.tracker.observe(event.seq) {
                SequenceCheck::Duplicate => continue,
                SequenceCheck::InOrder => {
                    if let Some(reason) = event.removal_of(self.user_id) {
                        return Some(self.removed(reason));
                    }
                    return Some(Delivery::Event(event));
                }
                SequenceCheck::Gap { expected, received } => {
                    if let Some(reason) = event.removal_of(self.user_id) {
                        return Some(self.removed(reason));
                    }
                    debug!(room_id = %self.room_id, expected, received, "Sequence gap");
                    return Some(Delivery::Gap { expected, received });
                }
            }
        }
    }

    fn removed(&mut self, reason: RemovalReason) -> Delivery {
        self.receiver = None;
        self.manager.release((self.session_id, self.room_id), self.attempt);
        info!(
            session_id = %self.session_id,
            room_id = %self.room_id,
            user_id = %self.user_id,
            reason = ?reason,
            "Subscription removed"
        );
        Delivery::Removed {
            room_id: self.room_id,
            reason,
        }
    }

    /// Refetch the room state and continue after its sequence number.
    ///
    /// Access is checked again first. A user who lost access meanwhile is
    /// removed instead.
    pub async fn resync(&mut self, ctx: &ServiceContext) -> ServiceResult<ResyncOutcome> {
        let access = load_access(ctx, self.room_id, self.user_id).await?;
        if access.check().is_err() {
            let reason = if access.membership.as_ref().is_some_and(|m| m.banned) {
                RemovalReason::Banned
            } else {
                RemovalReason::Kicked
            };
            self.removed(reason);
            return Ok(ResyncOutcome::Removed(reason));
        }

        let seq = ctx.bus().position(self.room_id).await?;
        let snapshot = RoomService::new(ctx).build_snapshot(&access.room, seq).await?;
        self.tracker.reset(seq);
        debug!(room_id = %self.room_id, seq, "Subscription resynchronized");
        Ok(ResyncOutcome::Snapshot(snapshot))
    }
}

impl Drop for RoomSubscription {
    fn drop(&mut self) {
        self.manager.release((self.session_id, self.room_id), self.attempt);
    }
}

impl std::fmt::Debug for RoomSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomSubscription")
            .field("session_id", &self.session_id)
            .field("room_id", &self.room_id)
            .field("last_seq", &self.tracker.last())
            .finish_non_exhaustive()
    }
}

/// Everything the authority needs to decide on live access
struct Access {
    room: Room,
    user_id: Snowflake,
    membership: Option<Membership>,
    invitation: Option<chat_core::InvitationStatus>,
}

impl Access {
    /// `ViewRoom`, plus `ReadLive` for anyone holding a membership row
    fn check(&self) -> ServiceResult<()> {
        let ctx = AuthorizationContext::new(self.room.visibility, self.user_id)
            .with_actor(self.membership.as_ref())
            .with_invitation(self.invitation);
        authorize(&ctx, Action::ViewRoom)?;
        if self.membership.is_some() {
            authorize(&ctx, Action::ReadLive)?;
        }
        Ok(())
    }
}

async fn load_access(ctx: &ServiceContext, room_id: Snowflake, user_id: Snowflake) -> ServiceResult<Access> {
    let room = RoomService::new(ctx).load_room(room_id).await?;
    let membership = MembershipStore::new(ctx).get_membership(room_id, user_id).await?;

    let invitations = ctx.invitation_repo();
    let invitation = with_retry(ctx.retry(), "invitation.find_latest", || invitations.find_latest(room_id, user_id))
        .await?
        .map(|i| i.status);

    Ok(Access {
        room,
        user_id,
        membership,
        invitation,
    })
}

/// Subscribe and unsubscribe operations
pub struct SubscriptionService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> SubscriptionService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Open a live view of the room for the session
    #[instrument(skip(self))]
    pub async fn subscribe(
        &self,
        session_id: SessionId,
        user_id: Snowflake,
        room_id: Snowflake,
    ) -> ServiceResult<RoomSubscription> {
        let manager = self.ctx.subscriptions();
        let pending = manager.begin(session_id, room_id)?;

        let access = load_access(self.ctx, room_id, user_id).await?;
        access.check()?;

        let registration = self.ctx.bus().subscribe(room_id).await?;
        pending.attach(registration.id);

        // A ban or kick numbered at or below `last_seq` never reaches this
        // registration, but its storage write is visible by now
        let access = load_access(self.ctx, room_id, user_id).await?;
        access.check()?;

        let snapshot = RoomService::new(self.ctx)
            .build_snapshot(&access.room, registration.last_seq)
            .await?;

        let attempt = pending.attempt;
        pending.complete()?;

        info!(
            session_id = %session_id,
            room_id = %room_id,
            user_id = %user_id,
            seq = registration.last_seq,
            "Subscribed"
        );

        Ok(RoomSubscription {
            session_id,
            room_id,
            user_id,
            attempt,
            receiver: Some(registration.receiver),
            tracker: SequenceTracker::new(registration.last_seq),
            snapshot: Some(snapshot),
            manager: manager.clone(),
        })
    }

    #[instrument(skip(self))]
    pub fn unsubscribe(&self, session_id: SessionId, room_id: Snowflake) -> bool {
        self.ctx.subscriptions().unsubscribe(session_id, room_id)
    }

    #[instrument(skip(self))]
    pub fn disconnect(&self, session_id: SessionId) -> usize {
        self.ctx.subscriptions().disconnect(session_id)
    }
}
