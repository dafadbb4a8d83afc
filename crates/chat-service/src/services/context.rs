//! Service context - dependency container for services
//!
//! Holds the repositories, the room event bus, the subscription registry, the
//! notification fanout handle and the token verifier.

use std::sync::Arc;

use chat_cache::{Publisher, RedisPool};
use chat_common::{BusConfig, RetryConfig, TokenVerifier};
use chat_core::traits::{
    InvitationRepository, MembershipRepository, NotificationRepository, RoomRepository,
    RoomSequenceRepository,
};
use chat_core::SnowflakeGenerator;
use chat_db::{
    MemoryDatabase, PgInvitationRepository, PgMembershipRepository, PgNotificationRepository, PgPool,
    PgRoomRepository, PgRoomSequenceRepository,
};

use super::bus::RoomEventBus;
use super::error::{ServiceError, ServiceResult};
use super::notification::NotificationFanout;
use super::subscription::SubscriptionManager;

/// Service context containing all dependencies
///
/// Clones are cheap and share the bus, the subscription registry and the
/// fanout worker.
#[derive(Clone)]
pub struct ServiceContext {
    // Storage handles, kept for readiness checks
    pool: Option<PgPool>,
    redis_pool: Option<RedisPool>,

    // Repositories
    room_repo: Arc<dyn RoomRepository>,
    membership_repo: Arc<dyn MembershipRepository>,
    invitation_repo: Arc<dyn InvitationRepository>,
    notification_repo: Arc<dyn NotificationRepository>,
    sequence_repo: Arc<dyn RoomSequenceRepository>,

    // Delivery
    bus: RoomEventBus,
    subscriptions: SubscriptionManager,
    fanout: NotificationFanout,

    // Services
    token_verifier: Arc<TokenVerifier>,
    snowflake_generator: Arc<SnowflakeGenerator>,
    retry: RetryConfig,
}

impl ServiceContext {
    // === Storage handles ===

    /// PostgreSQL pool, when running on the postgres backend
    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    /// Redis pool, when Redis is configured
    pub fn redis_pool(&self) -> Option<&RedisPool> {
        self.redis_pool.as_ref()
    }

    // === Repositories ===

    pub fn room_repo(&self) -> &dyn RoomRepository {
        self.room_repo.as_ref()
    }

    pub fn membership_repo(&self) -> &dyn MembershipRepository {
        self.membership_repo.as_ref()
    }

    pub fn invitation_repo(&self) -> &dyn InvitationRepository {
        self.invitation_repo.as_ref()
    }

    pub fn notification_repo(&self) -> &dyn NotificationRepository {
        self.notification_repo.as_ref()
    }

    pub fn sequence_repo(&self) -> &dyn RoomSequenceRepository {
        self.sequence_repo.as_ref()
    }

    // === Delivery ===

    /// Get the room event bus
    pub fn bus(&self) -> &RoomEventBus {
        &self.bus
    }

    /// Get the subscription registry
    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Get the notification fanout handle
    pub fn fanout(&self) -> &NotificationFanout {
        &self.fanout
    }

    // === Services ===

    /// Get the bearer token verifier
    pub fn token_verifier(&self) -> &TokenVerifier {
        self.token_verifier.as_ref()
    }

    /// Get the snowflake ID generator
    pub fn snowflake_generator(&self) -> &SnowflakeGenerator {
        self.snowflake_generator.as_ref()
    }

    /// Generate a new Snowflake ID
    pub fn generate_id(&self) -> chat_core::Snowflake {
        self.snowflake_generator.generate()
    }

    /// Backoff policy for transient storage failures
    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("pool", &self.pool.as_ref().map(|_| "PgPool"))
            .field("redis_pool", &self.redis_pool)
            .field("repositories", &"...")
            .field("bus", &self.bus)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
pub struct ServiceContextBuilder {
    pool: Option<PgPool>,
    redis_pool: Option<RedisPool>,
    room_repo: Option<Arc<dyn RoomRepository>>,
    membership_repo: Option<Arc<dyn MembershipRepository>>,
    invitation_repo: Option<Arc<dyn InvitationRepository>>,
    notification_repo: Option<Arc<dyn NotificationRepository>>,
    sequence_repo: Option<Arc<dyn RoomSequenceRepository>>,
    token_verifier: Option<Arc<TokenVerifier>>,
    snowflake_generator: Option<Arc<SnowflakeGenerator>>,
    bus_config: BusConfig,
    retry: RetryConfig,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self {
            pool: None,
            redis_pool: None,
            room_repo: None,
            membership_repo: None,
            invitation_repo: None,
            notification_repo: None,
            sequence_repo: None,
            token_verifier: None,
            snowflake_generator: None,
            bus_config: BusConfig::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Use PostgreSQL repositories over `pool`
    pub fn postgres(mut self, pool: PgPool) -> Self {
        self.room_repo = Some(Arc::new(PgRoomRepository::new(pool.clone())));
        self.membership_repo = Some(Arc::new(PgMembershipRepository::new(pool.clone())));
        self.invitation_repo = Some(Arc::new(PgInvitationRepository::new(pool.clone())));
        self.notification_repo = Some(Arc::new(PgNotificationRepository::new(pool.clone())));
        self.sequence_repo = Some(Arc::new(PgRoomSequenceRepository::new(pool.clone())));
        self.pool = Some(pool);
        self
    }

    /// Use in-memory repositories sharing `db`
    pub fn memory(mut self, db: &MemoryDatabase) -> Self {
        self.room_repo = Some(Arc::new(db.rooms()));
        self.membership_repo = Some(Arc::new(db.memberships()));
        self.invitation_repo = Some(Arc::new(db.invitations()));
        self.notification_repo = Some(Arc::new(db.notifications()));
        self.sequence_repo = Some(Arc::new(db.sequences()));
        self
    }

    /// Push notifications through Redis as well as storing them
    pub fn redis_pool(mut self, redis_pool: RedisPool) -> Self {
        self.redis_pool = Some(redis_pool);
        self
    }

    pub fn room_repo(mut self, repo: Arc<dyn RoomRepository>) -> Self {
        self.room_repo = Some(repo);
        self
    }

    pub fn membership_repo(mut self, repo: Arc<dyn MembershipRepository>) -> Self {
        self.membership_repo = Some(repo);
        self
    }

    pub fn invitation_repo(mut self, repo: Arc<dyn InvitationRepository>) -> Self {
        self.invitation_repo = Some(repo);
        self
    }

    pub fn notification_repo(mut self, repo: Arc<dyn NotificationRepository>) -> Self {
        self.notification_repo = Some(repo);
        self
    }

    pub fn sequence_repo(mut self, repo: Arc<dyn RoomSequenceRepository>) -> Self {
        self.sequence_repo = Some(repo);
        self
    }

    pub fn token_verifier(mut self, verifier: Arc<TokenVerifier>) -> Self {
        self.token_verifier = Some(verifier);
        self
    }

    pub fn snowflake_generator(mut self, generator: Arc<SnowflakeGenerator>) -> Self {
        self.snowflake_generator = Some(generator);
        self
    }

    pub fn bus_config(mut self, config: BusConfig) -> Self {
        self.bus_config = config;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Build the ServiceContext and start the notification worker.
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        let room_repo = self.room_repo.ok_or_else(|| ServiceError::validation("room_repo is required"))?;
        let membership_repo = self
            .membership_repo
            .ok_or_else(|| ServiceError::validation("membership_repo is required"))?;
        let invitation_repo = self
            .invitation_repo
            .ok_or_else(|| ServiceError::validation("invitation_repo is required"))?;
        let notification_repo = self
            .notification_repo
            .ok_or_else(|| ServiceError::validation("notification_repo is required"))?;
        let sequence_repo = self
            .sequence_repo
            .ok_or_else(|| ServiceError::validation("sequence_repo is required"))?;
        let token_verifier = self
            .token_verifier
            .ok_or_else(|| ServiceError::validation("token_verifier is required"))?;
        let snowflake_generator = self
            .snowflake_generator
            .ok_or_else(|| ServiceError::validation("snowflake_generator is required"))?;

        let bus = RoomEventBus::new(Arc::clone(&sequence_repo), &self.bus_config, self.retry.clone());
        let subscriptions = SubscriptionManager::new(bus.clone());
        let fanout = NotificationFanout::spawn(
            Arc::clone(&notification_repo),
            Arc::clone(&snowflake_generator),
            self.retry.clone(),
            self.redis_pool.clone().map(Publisher::new),
        );

        Ok(ServiceContext {
            pool: self.pool,
            redis_pool: self.redis_pool,
            room_repo,
            membership_repo,
            invitation_repo,
            notification_repo,
            sequence_repo,
            bus,
            subscriptions,
            fanout,
            token_verifier,
            snowflake_generator,
            retry: self.retry,
        })
    }
}

impl Default for ServiceContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_requires_repositories() {
        let err = ServiceContextBuilder::new()
            .token_verifier(Arc::new(TokenVerifier::new("secret")))
            .snowflake_generator(Arc::new(SnowflakeGenerator::new(1)))
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation error: room_repo is required");
    }

    #[tokio::test]
    async fn test_build_with_memory_backend() {
        let db = MemoryDatabase::new();
        let ctx = ServiceContextBuilder::new()
            .memory(&db)
            .token_verifier(Arc::new(TokenVerifier::new("secret")))
            .snowflake_generator(Arc::new(SnowflakeGenerator::new(1)))
            .build()
            .unwrap();

        assert!(ctx.pool().is_none());
        assert!(ctx.redis_pool().is_none());
        assert_ne!(ctx.generate_id(), ctx.generate_id());
    }
}
