//! Room event bus
//!
//! Assigns per-room sequence numbers and fans sequenced events out to every
//! current subscriber of the room. Each room has its own channel behind a
//! `tokio::sync::Mutex`; rooms never contend with each other.
//!
//! Delivery into a subscriber queue never blocks. A full queue drops the
//! event for that subscriber only, which the subscriber later observes as a
//! sequence gap. A closed queue unregisters the subscriber.
//!
//! A room with no subscribers is dropped from memory once its counter is
//! durable, and the next emission re-seeds from storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chat_common::{BusConfig, RetryConfig};
use chat_core::traits::RoomSequenceRepository;
use chat_core::{RoomEvent, RoomEventDraft, Snowflake};
use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, instrument, warn};

use super::error::ServiceResult;
use super::retry::with_retry;

/// Identifies one registration on the bus
pub type SubscriberId = u64;

/// A fresh registration: events with `seq > last_seq` arrive on `receiver`
#[derive(Debug)]
pub struct BusSubscription {
    pub id: SubscriberId,
    pub room_id: Snowflake,
    pub last_seq: u64,
    pub receiver: mpsc::Receiver<Arc<RoomEvent>>,
}

#[derive(Debug, Default)]
struct RoomChannel {
    /// `None` until seeded from the durable high-water mark
    seq: Option<u64>,
    /// Highest number known to be stored as the high-water mark
    persisted: u64,
    subscribers: HashMap<SubscriberId, mpsc::Sender<Arc<RoomEvent>>>,
}

impl RoomChannel {
    fn seed(&mut self, current: u64) -> u64 {
        self.persisted = self.persisted.max(current);
        *self.seq.get_or_insert(current)
    }

    /// Nothing is registered and dropping the counter loses no numbers
    fn is_idle(&self) -> bool {
        self.subscribers.values().all(mpsc::Sender::is_closed) && self.seq.map_or(true, |seq| seq <= self.persisted)
    }

    fn deliver(&mut self, event: &Arc<RoomEvent>) {
        self.subscribers.retain(|id, sender| match sender.try_send(Arc::clone(event)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    room_id = %event.room_id,
                    seq = event.seq,
                    subscriber = id,
                    "Subscriber queue full, event dropped for this subscriber"
                );
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(room_id = %event.room_id, subscriber = id, "Subscriber gone, unregistering");
                false
            }
        });
    }
}

struct BusInner {
    rooms: DashMap<Snowflake, Arc<Mutex<RoomChannel>>>,
    sequences: Arc<dyn RoomSequenceRepository>,
    retry: RetryConfig,
    capacity: usize,
    next_subscriber: AtomicU64,
}

/// Per-room ordered event bus. Clones share state.
#[derive(Clone)]
pub struct RoomEventBus {
    inner: Arc<BusInner>,
}

impl RoomEventBus {
    pub fn new(sequences: Arc<dyn RoomSequenceRepository>, config: &BusConfig, retry: RetryConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                rooms: DashMap::new(),
                sequences,
                retry,
                capacity: config.subscriber_capacity.max(1),
                next_subscriber: AtomicU64::new(1),
            }),
        }
    }

    fn channel(&self, room_id: Snowflake) -> Arc<Mutex<RoomChannel>> {
        Arc::clone(self.inner.rooms.entry(room_id).or_default().value())
    }

    fn existing(&self, room_id: Snowflake) -> Option<Arc<Mutex<RoomChannel>>> {
        self.inner.rooms.get(&room_id).map(|c| Arc::clone(c.value()))
    }

    /// Drop the room's channel when it is idle and nobody else holds it.
    /// The shard lock is held while checking, so no new holder can appear.
    fn evict_idle(&self, room_id: Snowflake) {
        let evicted = self.inner.rooms.remove_if(&room_id, |_, channel| {
            Arc::strong_count(channel) == 1 && channel.try_lock().is_ok_and(|guard| guard.is_idle())
        });
        if evicted.is_some() {
            debug!(room_id = %room_id, "Idle room channel evicted");
        }
    }

    /// Make sure the room's counter continues from the durable mark.
    /// The storage read happens without holding the room lock.
    async fn ensure_seeded(&self, room_id: Snowflake, channel: &Mutex<RoomChannel>) -> ServiceResult<()> {
        if channel.lock().await.seq.is_some() {
            return Ok(());
        }

        let sequences = self.inner.sequences.as_ref();
        let current = with_retry(&self.inner.retry, "sequence.current", || sequences.current(room_id)).await?;
        channel.lock().await.seed(current);
        Ok(())
    }

    /// Assign the next sequence number of the room and deliver the event
    #[instrument(skip(self, draft), fields(room_id = %draft.room_id, event_type = draft.payload.event_type()))]
    pub async fn emit(&self, draft: RoomEventDraft) -> ServiceResult<Arc<RoomEvent>> {
        let room_id = draft.room_id;
        let channel = self.channel(room_id);
        if let Err(e) = self.ensure_seeded(room_id, &channel).await {
            drop(channel);
            self.evict_idle(room_id);
            return Err(e);
        }

        let event = {
            let mut guard = channel.lock().await;
            let seq = guard.seq.unwrap_or_default() + 1;
            guard.seq = Some(seq);

            let event = Arc::new(draft.sequenced(seq));
            guard.deliver(&event);
            event
        };

        match self.inner.sequences.advance(room_id, event.seq).await {
            Ok(()) => {
                let mut guard = channel.lock().await;
                guard.persisted = guard.persisted.max(event.seq);
            }
            Err(e) => {
                warn!(room_id = %room_id, seq = event.seq, error = %e, "Failed to persist sequence high-water mark");
            }
        }
        drop(channel);
        self.evict_idle(room_id);

        debug!(room_id = %room_id, seq = event.seq, "Room event emitted");
        Ok(event)
    }

    /// Register a new subscriber for the room
    #[instrument(skip(self))]
    pub async fn subscribe(&self, room_id: Snowflake) -> ServiceResult<BusSubscription> {
        let channel = self.channel(room_id);
        if let Err(e) = self.ensure_seeded(room_id, &channel).await {
            drop(channel);
            self.evict_idle(room_id);
            return Err(e);
        }

        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.inner.capacity);

        let mut guard = channel.lock().await;
        guard.subscribers.insert(id, sender);
        let last_seq = guard.seq.unwrap_or_default();

        Ok(BusSubscription {
            id,
            room_id,
            last_seq,
            receiver,
        })
    }

    /// Remove a registration without waiting.
    ///
    /// When the room is busy emitting, the registration stays until the next
    /// emission finds its queue closed, so callers drop the receiver too.
    pub fn unsubscribe(&self, room_id: Snowflake, id: SubscriberId) {
        let Some(channel) = self.existing(room_id) else {
            return;
        };
        if let Ok(mut guard) = channel.try_lock() {
            guard.subscribers.remove(&id);
        };
        drop(channel);
        self.evict_idle(room_id);
    }

    /// Highest sequence number emitted for the room
    pub async fn position(&self, room_id: Snowflake) -> ServiceResult<u64> {
        if let Some(channel) = self.existing(room_id) {
            if let Some(seq) = channel.lock().await.seq {
                return Ok(seq);
            };
        }
        let sequences = self.inner.sequences.as_ref();
        let current = with_retry(&self.inner.retry, "sequence.current", || sequences.current(room_id)).await?;
        Ok(current)
    }

    /// Rooms currently held in memory
    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }

    /// Number of live registrations for the room
    pub async fn subscriber_count(&self, room_id: Snowflake) -> usize {
        let Some(channel) = self.existing(room_id) else {
            return 0;
        };
        let guard = channel.lock().await;
        guard.subscribers.values().filter(|s| !s.is_closed()).count()
    }
}

impl std::fmt::Debug for RoomEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomEventBus")
            .field("rooms", &self.inner.rooms.len())
            .field("capacity", &self.inner.capacity)
            .finish_non_exhaustive()
    }
}
