//! Individual WebSocket connection
//!
//! Represents a single WebSocket connection and its state.

use crate::events::GatewayEventType;
use crate::protocol::{CloseCode, GatewayMessage};
use chat_core::Snowflake;
use chat_service::SessionId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Connection established, waiting for Identify
    Connecting,
    /// Successfully authenticated
    Connected,
    /// Connection is closed
    Disconnected,
}

/// Frames queued for the socket writer
#[derive(Debug, Clone)]
pub enum Outbound {
    Message(GatewayMessage),
    /// Send a close frame and stop writing
    Close(CloseCode),
}

/// Handle on the task pumping one room subscription into this connection
#[derive(Debug)]
pub struct RoomView {
    resync: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RoomView {
    pub fn new(resync: mpsc::Sender<()>, task: JoinHandle<()>) -> Self {
        Self { resync, task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Ask the pump for a fresh snapshot. False when the pump has ended.
    pub fn request_resync(&self) -> bool {
        match self.resync.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => !self.task.is_finished(),
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

/// A single WebSocket connection
pub struct Connection {
    session_id: SessionId,

    /// Authenticated user ID (None until Identify)
    user_id: RwLock<Option<Snowflake>>,

    state: RwLock<ConnectionState>,

    /// Channel to the socket writer
    sender: mpsc::Sender<Outbound>,

    /// Last dispatch sequence number sent
    sequence: AtomicU64,

    /// Last heartbeat received
    last_heartbeat: RwLock<Instant>,

    /// Open room views by room
    rooms: Mutex<HashMap<Snowflake, RoomView>>,

    created_at: Instant,
}

impl Connection {
    pub fn new(session_id: SessionId, sender: mpsc::Sender<Outbound>) -> Arc<Self> {
        Arc::new(Self {
            session_id,
            user_id: RwLock::new(None),
            state: RwLock::new(ConnectionState::Connecting),
            sender,
            sequence: AtomicU64::new(0),
            last_heartbeat: RwLock::new(Instant::now()),
            rooms: Mutex::new(HashMap::new()),
            created_at: Instant::now(),
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Get the user ID (if authenticated)
    pub async fn user_id(&self) -> Option<Snowflake> {
        *self.user_id.read().await
    }

    /// Set the user ID (on successful authentication)
    pub async fn set_user_id(&self, user_id: Snowflake) {
        *self.user_id.write().await = Some(user_id);
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn set_state(&self, state: ConnectionState) {
        *self.state.write().await = state;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.user_id.read().await.is_some()
    }

    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub async fn record_heartbeat(&self) {
        *self.last_heartbeat.write().await = Instant::now();
    }

    pub async fn time_since_heartbeat(&self) -> std::time::Duration {
        self.last_heartbeat.read().await.elapsed()
    }

    /// Track a room view, replacing and aborting any finished or older one
    pub fn attach_room(&self, room_id: Snowflake, view: RoomView) {
        let mut rooms = self.rooms.lock();
        rooms.retain(|_, v| !v.is_finished());
        if let Some(previous) = rooms.insert(room_id, view) {
            previous.abort();
        }
    }

    /// Stop tracking the room view. The pump ends once the subscription is released.
    pub fn detach_room(&self, room_id: Snowflake) -> Option<RoomView> {
        self.rooms.lock().remove(&room_id)
    }

    /// Forward a resync request to the room's pump
    pub fn request_resync(&self, room_id: Snowflake) -> bool {
        self.rooms.lock().get(&room_id).is_some_and(RoomView::request_resync)
    }

    /// Rooms with a running pump
    pub fn rooms(&self) -> Vec<Snowflake> {
        self.rooms
            .lock()
            .iter()
            .filter(|(_, v)| !v.is_finished())
            .map(|(room_id, _)| *room_id)
            .collect()
    }

    /// Abort every pump. Called once the connection is gone.
    pub fn abort_rooms(&self) -> usize {
        let rooms: Vec<RoomView> = self.rooms.lock().drain().map(|(_, v)| v).collect();
        for view in &rooms {
            view.abort();
        }
        rooms.len()
    }

    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Send a message to this connection
    pub async fn send(&self, message: GatewayMessage) -> Result<(), mpsc::error::SendError<Outbound>> {
        self.sender.send(Outbound::Message(message)).await
    }

    /// Send a dispatch event with the next sequence number.
    /// Returns false when the connection is gone.
    pub async fn dispatch<T: Serialize + ?Sized>(&self, event: GatewayEventType, data: &T) -> bool {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, event = %event, error = %e, "Failed to encode dispatch");
                return true;
            }
        };
        let message = GatewayMessage::dispatch(event.as_str(), self.next_sequence(), data);
        self.send(message).await.is_ok()
    }

    /// Queue a close frame behind any pending messages
    pub async fn close(&self, code: CloseCode) {
        let _ = self.sender.send(Outbound::Close(code)).await;
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id)
            .field("sequence", &self.sequence.load(Ordering::SeqCst))
            .field("rooms", &self.rooms.lock().len())
            .field("created_at", &self.created_at)
            .finish()
    }
}
