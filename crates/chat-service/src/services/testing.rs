//! Shared fixtures for service tests

use std::sync::Arc;

use chat_common::{BusConfig, RetryConfig, TokenVerifier};
use chat_core::traits::{MembershipRepository, RoomRepository};
use chat_core::{
    Membership, Room, RoomEvent, RoomEventDraft, RoomEventPayload, RoomVisibility, Snowflake,
    SnowflakeGenerator,
};
use chat_db::MemoryDatabase;

use super::context::{ServiceContext, ServiceContextBuilder};
use super::notification::NotificationService;
use crate::dto::{NotificationQueryParams, NotificationResponse};

pub(crate) const OWNER: Snowflake = Snowflake::new(100);

/// Service context over a fresh in-memory database
pub(crate) struct TestHarness {
    pub db: MemoryDatabase,
    pub ctx: ServiceContext,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_bus_capacity(BusConfig::default().subscriber_capacity)
    }

    pub fn with_bus_capacity(subscriber_capacity: usize) -> Self {
        let db = MemoryDatabase::new();
        let ctx = ServiceContextBuilder::new()
            .memory(&db)
            .token_verifier(Arc::new(TokenVerifier::new("test-secret")))
            .snowflake_generator(Arc::new(SnowflakeGenerator::new(1)))
            .bus_config(BusConfig { subscriber_capacity })
            .retry(RetryConfig {
                max_attempts: 3,
                base_delay_ms: 1,
                max_delay_ms: 2,
            })
            .build()
            .unwrap();
        Self { db, ctx }
    }

    /// A room owned by [`OWNER`], written straight to storage
    pub async fn room(&self, visibility: RoomVisibility) -> Room {
        let room = Room::new(self.ctx.generate_id(), "test-room".to_string(), OWNER, visibility);
        self.db
            .rooms()
            .create_with_owner(&room, &Membership::owner(room.id, OWNER))
            .await
            .unwrap();
        room
    }

    /// Add a plain member without emitting anything
    pub async fn member(&self, room_id: Snowflake, user_id: Snowflake) -> Membership {
        let membership = Membership::new(room_id, user_id);
        assert!(self.db.memberships().insert_if_absent(&membership).await.unwrap());
        membership
    }

    /// Emit a room event as the owner
    pub async fn emit(&self, room_id: Snowflake, payload: RoomEventPayload) -> Arc<RoomEvent> {
        self.ctx
            .bus()
            .emit(RoomEventDraft::new(room_id, OWNER, payload))
            .await
            .unwrap()
    }

    /// Newest-first notification feed of `user_id`
    pub async fn notifications_of(&self, user_id: Snowflake) -> Vec<NotificationResponse> {
        NotificationService::new(&self.ctx)
            .list_notifications(user_id, NotificationQueryParams::default())
            .await
            .unwrap()
    }
}
