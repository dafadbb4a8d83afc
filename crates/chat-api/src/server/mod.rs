//! Server setup and initialization
//!
//! Provides the main application builder and server runner. REST and the
//! gateway WebSocket route are served from one listener.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use chat_cache::RedisPool;
use chat_common::{AppConfig, AppError, StorageBackend, TokenVerifier};
use chat_core::SnowflakeGenerator;
use chat_db::{create_pool, run_migrations, MemoryDatabase};
use chat_gateway::broadcast::{NotificationRelay, NotificationRelayConfig};
use chat_gateway::ConnectionManager;
use chat_service::ServiceContextBuilder;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::middleware::{apply_middleware, apply_trace};
use crate::routes::{create_router, health_routes};
use crate::state::AppState;

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let config = state.config();
    let rest = apply_middleware(
        create_router(),
        &config.rate_limit,
        &config.cors,
        config.app.env.is_production(),
    )
    .with_state(state.clone());

    let unlimited = health_routes()
        .with_state(state.clone())
        .merge(chat_gateway::create_app(state.gateway().clone()));

    rest.merge(apply_trace(unlimited))
}

/// Initialize all dependencies and create AppState
pub async fn create_app_state(config: AppConfig) -> Result<AppState, AppError> {
    let mut builder = ServiceContextBuilder::new()
        .token_verifier(Arc::new(TokenVerifier::new(&config.jwt.secret)))
        .snowflake_generator(Arc::new(SnowflakeGenerator::new(config.snowflake.worker_id)))
        .bus_config(config.bus.clone())
        .retry(config.retry.clone());

    builder = match config.database.backend {
        StorageBackend::Postgres => {
            let url = config
                .database
                .url
                .clone()
                .ok_or_else(|| AppError::Config("DATABASE_URL is required for the postgres backend".to_string()))?;

            info!("Connecting to PostgreSQL...");
            let db_config = chat_db::DatabaseConfig::new(
                url,
                config.database.max_connections,
                config.database.min_connections,
            );
            let pool = create_pool(&db_config)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            run_migrations(&pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            info!("PostgreSQL connection established");

            builder.postgres(pool)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; room state is lost on restart");
            builder.memory(&MemoryDatabase::new())
        }
    };

    if let Some(redis) = &config.redis {
        info!("Connecting to Redis...");
        let redis_pool = RedisPool::from_config(redis).map_err(|e| AppError::Cache(e.to_string()))?;
        builder = builder.redis_pool(redis_pool);
        info!("Redis pool created");
    } else {
        warn!("REDIS_URL not set; notifications are persisted but not pushed");
    }

    let service_context = builder.build().map_err(|e| AppError::Config(e.to_string()))?;

    Ok(AppState::new(
        Arc::new(service_context),
        ConnectionManager::new_shared(),
        config,
    ))
}

/// Start relaying Redis notifications to gateway sessions, if Redis is configured
pub fn start_notification_relay(state: &AppState) -> Option<Arc<NotificationRelay>> {
    let redis = state.config().redis.as_ref()?;

    let relay = Arc::new(NotificationRelay::new(
        NotificationRelayConfig::new(redis.url.clone()),
        state.gateway().connection_manager_arc(),
    ));
    Arc::clone(&relay).start();
    Some(relay)
}

/// Run the HTTP server
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    info!("Server listening on http://{} (gateway at ws://{}/gateway)", addr, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .api
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid listen address {}: {e}", config.api.address())))?;

    let state = create_app_state(config).await?;
    let relay = start_notification_relay(&state);

    let app = create_app(state);
    let result = run_server(app, addr).await;

    if let Some(relay) = relay.filter(|r| r.is_running()) {
        relay.stop().await;
    }
    result
}
