//! WebSocket handler
//!
//! Handles WebSocket connections and message processing.

use crate::connection::{Connection, ConnectionState, Outbound};
use crate::handlers::MessageDispatcher;
use crate::protocol::{CloseCode, GatewayMessage, HelloPayload};
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use chat_common::GatewaySettings;
use chat_service::SubscriptionService;
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Channel buffer size for outgoing messages
const MESSAGE_BUFFER_SIZE: usize = 100;

/// How long the writer may take to flush a close frame
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket gateway handler
pub async fn gateway_handler(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let session_id = state.service_context().generate_id();
    let settings = state.settings().clone();

    let (tx, mut rx) = mpsc::channel::<Outbound>(MESSAGE_BUFFER_SIZE);
    let connection = state.connection_manager().add_connection(session_id, tx);

    tracing::info!(session_id = %session_id, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    let hello = GatewayMessage::hello(HelloPayload::with_interval(settings.heartbeat_interval_ms));
    if send_message(&mut ws_sink, &hello).await.is_err() {
        tracing::warn!(session_id = %session_id, "Failed to send Hello message");
        cleanup_connection(&state, &connection).await;
        return;
    }

    let state_recv = state.clone();
    let connection_recv = connection.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Err(close_code) = handle_text_message(&state_recv, &connection_recv, &text).await {
                        return Some(close_code);
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(session_id = %session_id, "Binary messages not supported");
                    return Some(CloseCode::DecodeError);
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    tracing::info!(session_id = %session_id, "Client closed connection");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(session_id = %session_id, error = %e, "WebSocket error");
                    return None;
                }
            }
        }
        None
    });

    let mut send_task = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Message(msg) => {
                    if send_message(&mut ws_sink, &msg).await.is_err() {
                        tracing::debug!(session_id = %session_id, "Failed to send message to WebSocket");
                        return;
                    }
                }
                Outbound::Close(code) => {
                    let (code, reason) = GatewayMessage::close_frame(code);
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    let _ = ws_sink.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
        let _ = ws_sink.close().await;
    });

    let mut heartbeat_task = tokio::spawn(watch_liveness(connection.clone(), settings));

    let close_code = tokio::select! {
        result = &mut recv_task => result.ok().flatten(),
        _ = &mut send_task => None,
        result = &mut heartbeat_task => result.ok(),
    };
    recv_task.abort();
    heartbeat_task.abort();

    cleanup_connection(&state, &connection).await;

    if let Some(code) = close_code {
        tracing::debug!(session_id = %session_id, close_code = %code, recoverable = code.is_recoverable(), "Closing connection");
        connection.close(code).await;
    }
    drop(connection);
    if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut send_task).await.is_err() {
        send_task.abort();
    }
}

/// Resolves with a close code once the session must be dropped: no Identify
/// within the identify timeout, or no heartbeat for two intervals.
async fn watch_liveness(connection: Arc<Connection>, settings: GatewaySettings) -> CloseCode {
    let heartbeat_timeout = Duration::from_millis(settings.heartbeat_interval_ms.saturating_mul(2));
    let identify_timeout = Duration::from_millis(settings.identify_timeout_ms);
    let tick = (settings.heartbeat_interval_ms / 2)
        .min(settings.identify_timeout_ms)
        .max(50);
    let mut check_interval = interval(Duration::from_millis(tick));

    loop {
        check_interval.tick().await;

        if !connection.is_authenticated().await && connection.age() > identify_timeout {
            tracing::info!(session_id = %connection.session_id(), "No Identify before timeout");
            return CloseCode::SessionTimeout;
        }

        let time_since = connection.time_since_heartbeat().await;
        if time_since > heartbeat_timeout {
            tracing::warn!(
                session_id = %connection.session_id(),
                time_since_ms = time_since.as_millis(),
                "Connection timed out (no heartbeat)"
            );
            return CloseCode::SessionTimeout;
        }
    }
}

async fn send_message(sink: &mut SplitSink<WebSocket, Message>, message: &GatewayMessage) -> Result<(), axum::Error> {
    match message.to_json() {
        Ok(json) => sink.send(Message::Text(json)).await,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode gateway message");
            Ok(())
        }
    }
}

/// Handle a text message from the client
async fn handle_text_message(state: &GatewayState, connection: &Arc<Connection>, text: &str) -> Result<(), CloseCode> {
    let message = match GatewayMessage::from_json(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(session_id = %connection.session_id(), error = %e, "Failed to parse message");
            return Err(CloseCode::DecodeError);
        }
    };

    tracing::trace!(session_id = %connection.session_id(), op = %message.op, "Received message");

    match MessageDispatcher::dispatch(state, connection, message).await {
        Ok(Some(close_code)) => Err(close_code),
        Ok(None) => Ok(()),
        Err(e) => {
            tracing::debug!(session_id = %connection.session_id(), error = %e, "Handler error");
            Err(e.to_close_code())
        }
    }
}

/// Release every room view and forget the connection
async fn cleanup_connection(state: &GatewayState, connection: &Arc<Connection>) {
    let session_id = connection.session_id();

    let released = SubscriptionService::new(state.service_context()).disconnect(session_id);
    let pumps = connection.abort_rooms();
    connection.set_state(ConnectionState::Disconnected).await;
    state.connection_manager().remove_connection(session_id).await;

    tracing::info!(session_id = %session_id, released, pumps, "Connection cleaned up");
}
