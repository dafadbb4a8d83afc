//! Connection manager
//!
//! Manages all active WebSocket connections using DashMap for thread-safe access.

use super::{Connection, ConnectionState, Outbound};
use crate::events::GatewayEventType;
use chat_core::Snowflake;
use chat_service::SessionId;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Manages all active WebSocket connections
pub struct ConnectionManager {
    /// Active connections by session ID
    connections: DashMap<SessionId, Arc<Connection>>,

    /// User ID to session IDs mapping
    user_connections: DashMap<Snowflake, HashSet<SessionId>>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_connections: DashMap::new(),
        }
    }

    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection
    pub fn add_connection(&self, session_id: SessionId, sender: mpsc::Sender<Outbound>) -> Arc<Connection> {
        let connection = Connection::new(session_id, sender);
        self.connections.insert(session_id, connection.clone());

        tracing::debug!(session_id = %session_id, "Connection added");

        connection
    }

    /// Remove a connection and its user mapping
    pub async fn remove_connection(&self, session_id: SessionId) {
        if let Some((_, connection)) = self.connections.remove(&session_id) {
            if let Some(user_id) = connection.user_id().await {
                self.user_connections.remove_if_mut(&user_id, |_, sessions| {
                    sessions.remove(&session_id);
                    sessions.is_empty()
                });
            }

            tracing::debug!(session_id = %session_id, "Connection removed");
        }
    }

    pub fn get_connection(&self, session_id: SessionId) -> Option<Arc<Connection>> {
        self.connections.get(&session_id).map(|r| r.clone())
    }

    /// Authenticate a connection (link to user)
    pub async fn authenticate_connection(&self, session_id: SessionId, user_id: Snowflake) -> bool {
        let Some(connection) = self.get_connection(session_id) else {
            return false;
        };

        connection.set_user_id(user_id).await;
        connection.set_state(ConnectionState::Connected).await;

        self.user_connections.entry(user_id).or_default().insert(session_id);

        tracing::debug!(session_id = %session_id, user_id = %user_id, "Connection authenticated");

        true
    }

    /// Get all connections for a user
    pub fn get_user_connections(&self, user_id: Snowflake) -> Vec<Arc<Connection>> {
        self.user_connections
            .get(&user_id)
            .map(|sessions| {
                sessions
                    .iter()
                    .filter_map(|sid| self.connections.get(sid).map(|c| c.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Dispatch an event to all connections of a user. Returns how many accepted it.
    pub async fn dispatch_to_user<T: Serialize + ?Sized>(
        &self,
        user_id: Snowflake,
        event: GatewayEventType,
        data: &T,
    ) -> usize {
        let mut sent = 0;
        for conn in self.get_user_connections(user_id) {
            if conn.dispatch(event, data).await {
                sent += 1;
            }
        }

        tracing::trace!(user_id = %user_id, event = %event, sent, "Dispatched to user connections");

        sent
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of distinct authenticated users
    pub fn user_count(&self) -> usize {
        self.user_connections.len()
    }

    pub fn has_session(&self, session_id: SessionId) -> bool {
        self.connections.contains_key(&session_id)
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .field("users", &self.user_connections.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_remove_connection() {
        let manager = ConnectionManager::new();
        let (tx, _rx) = mpsc::channel(10);
        let session = Snowflake::new(1);

        let conn = manager.add_connection(session, tx);
        assert_eq!(conn.session_id(), session);
        assert!(manager.has_session(session));

        manager.remove_connection(session).await;
        assert_eq!(manager.connection_count(), 0);
        assert!(!manager.has_session(session));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_session() {
        let manager = ConnectionManager::new();
        assert!(!manager.authenticate_connection(Snowflake::new(9), Snowflake::new(1)).await);
        assert_eq!(manager.user_count(), 0);
    }

    #[tokio::test]
    async fn test_user_mapping_follows_connections() {
        let manager = ConnectionManager::new();
        let (tx1, _rx1) = mpsc::channel(10);
        let (tx2, _rx2) = mpsc::channel(10);
        let user_id = Snowflake::new(12345);

        manager.add_connection(Snowflake::new(1), tx1);
        manager.add_connection(Snowflake::new(2), tx2);
        manager.authenticate_connection(Snowflake::new(1), user_id).await;
        manager.authenticate_connection(Snowflake::new(2), user_id).await;

        assert_eq!(manager.get_user_connections(user_id).len(), 2);
        assert_eq!(manager.user_count(), 1);

        manager.remove_connection(Snowflake::new(1)).await;
        assert_eq!(manager.get_user_connections(user_id).len(), 1);

        manager.remove_connection(Snowflake::new(2)).await;
        assert_eq!(manager.user_count(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_to_user_reaches_every_session() {
        let manager = ConnectionManager::new();
        let (tx1, mut rx1) = mpsc::channel(10);
        let (tx2, mut rx2) = mpsc::channel(10);
        let (tx3, mut rx3) = mpsc::channel(10);
        let user_id = Snowflake::new(5);

        manager.add_connection(Snowflake::new(1), tx1);
        manager.add_connection(Snowflake::new(2), tx2);
        manager.add_connection(Snowflake::new(3), tx3);
        manager.authenticate_connection(Snowflake::new(1), user_id).await;
        manager.authenticate_connection(Snowflake::new(2), user_id).await;
        manager.authenticate_connection(Snowflake::new(3), Snowflake::new(6)).await;

        let sent = manager
            .dispatch_to_user(user_id, GatewayEventType::Notification, &serde_json::json!({"kind": "BANNED"}))
            .await;
        assert_eq!(sent, 2);

        for rx in [&mut rx1, &mut rx2] {
            let Some(Outbound::Message(msg)) = rx.recv().await else { panic!("expected message") };
            assert_eq!(msg.t.as_deref(), Some("NOTIFICATION"));
        }
        assert!(rx3.try_recv().is_err());
    }
}
