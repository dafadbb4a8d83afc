//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, BusConfig, ConfigError, CorsConfig, DatabaseConfig, Environment,
    GatewaySettings, JwtConfig, RateLimitConfig, RedisConfig, RetryConfig, ServerConfig, SnowflakeConfig,
    StorageBackend,
};
