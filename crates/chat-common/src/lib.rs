//! # chat-common
//!
//! Shared utilities including configuration, error handling, token verification,
//! room password hashing, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{
    hash_room_password, validate_room_password, verify_room_password, Claims, TokenVerifier,
};
pub use config::{
    AppConfig, AppSettings, BusConfig, ConfigError, CorsConfig, DatabaseConfig, Environment,
    GatewaySettings, JwtConfig, RateLimitConfig, RedisConfig, RetryConfig, ServerConfig, SnowflakeConfig,
    StorageBackend,
};
pub use error::{domain_status, AppError, AppResult};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    LogFormat, TracingConfig, TracingError,
};
