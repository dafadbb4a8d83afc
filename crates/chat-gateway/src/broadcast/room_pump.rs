//! Per-room pump
//!
//! Moves deliveries from a [`RoomSubscription`] into the connection's outbound
//! queue. A sequence gap, or a client `RESYNC`, refetches the snapshot before
//! delivery continues.

use crate::connection::{Connection, RoomView};
use crate::events::{GatewayEventType, RemovedEvent, SubscribeFailedEvent};
use chat_service::{Delivery, ResyncOutcome, RoomSubscription, ServiceContext};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Start pumping `subscription` into `connection`. The `SUBSCRIBED`
/// dispatch with the snapshot goes out before any room event.
pub fn spawn_room_pump(
    ctx: Arc<ServiceContext>,
    connection: Arc<Connection>,
    subscription: RoomSubscription,
) -> RoomView {
    let (resync_tx, resync_rx) = mpsc::channel(1);
    let task = tokio::spawn(run(ctx, connection, subscription, resync_rx));
    RoomView::new(resync_tx, task)
}

async fn run(
    ctx: Arc<ServiceContext>,
    connection: Arc<Connection>,
    mut subscription: RoomSubscription,
    mut resync_rx: mpsc::Receiver<()>,
) {
    let room_id = subscription.room_id();

    if let Some(snapshot) = subscription.take_snapshot() {
        if !connection.dispatch(GatewayEventType::Subscribed, &snapshot).await {
            return;
        }
    }

    loop {
        let keep_going = tokio::select! {
            delivery = subscription.next() => match delivery {
                None => false,
                Some(Delivery::Event(event)) => connection.dispatch(GatewayEventType::RoomEvent, event.as_ref()).await,
                Some(Delivery::Removed { room_id, reason }) => {
                    connection.dispatch(GatewayEventType::Removed, &RemovedEvent { room_id, reason }).await;
                    false
                }
                Some(Delivery::Gap { expected, received }) => {
                    tracing::debug!(
                        session_id = %connection.session_id(),
                        room_id = %room_id,
                        expected,
                        received,
                        "Resynchronizing after gap"
                    );
                    resync(&ctx, &connection, &mut subscription).await
                }
            },
            Some(()) = resync_rx.recv() => resync(&ctx, &connection, &mut subscription).await,
        };

        if !keep_going {
            break;
        }
    }

    tracing::debug!(
        session_id = %connection.session_id(),
        room_id = %room_id,
        last_seq = subscription.last_seq(),
        "Room pump ended"
    );
}

/// Returns false once the subscription should end
async fn resync(ctx: &ServiceContext, connection: &Connection, subscription: &mut RoomSubscription) -> bool {
    let room_id = subscription.room_id();
    match subscription.resync(ctx).await {
        Ok(ResyncOutcome::Snapshot(snapshot)) => connection.dispatch(GatewayEventType::Resync, &snapshot).await,
        Ok(ResyncOutcome::Removed(reason)) => {
            connection.dispatch(GatewayEventType::Removed, &RemovedEvent { room_id, reason }).await;
            false
        }
        Err(e) => {
            tracing::warn!(
                session_id = %connection.session_id(),
                room_id = %room_id,
                error = %e,
                "Resync failed; ending subscription"
            );
            connection
                .dispatch(GatewayEventType::SubscribeFailed, &SubscribeFailedEvent::new(room_id, &e))
                .await;
            false
        }
    }
}
