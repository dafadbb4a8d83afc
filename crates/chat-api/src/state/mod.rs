//! Application state
//!
//! Holds the shared state for the Axum application including
//! the service context, the gateway and configuration.

use std::sync::Arc;

use axum::extract::FromRef;
use chat_common::{AppConfig, TokenVerifier};
use chat_gateway::{ConnectionManager, GatewayState};
use chat_service::ServiceContext;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Service context containing all dependencies
    service_context: Arc<ServiceContext>,
    /// Live gateway sessions, served from the same process
    gateway: GatewayState,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl AppState {
    /// Create a new AppState; the gateway shares the REST service context
    pub fn new(service_context: Arc<ServiceContext>, connections: Arc<ConnectionManager>, config: AppConfig) -> Self {
        let gateway = GatewayState::new(Arc::clone(&service_context), connections, config.gateway.clone());
        Self {
            service_context,
            gateway,
            config: Arc::new(config),
        }
    }

    /// Get the service context
    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    /// Get the gateway state
    pub fn gateway(&self) -> &GatewayState {
        &self.gateway
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Bearer token verifier from the service context
    pub fn token_verifier(&self) -> &TokenVerifier {
        self.service_context.token_verifier()
    }
}

impl FromRef<AppState> for GatewayState {
    fn from_ref(state: &AppState) -> Self {
        state.gateway.clone()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service_context", &"ServiceContext")
            .field("gateway", &self.gateway)
            .field("config", &"AppConfig")
            .finish()
    }
}
