//! Gateway state
//!
//! Shared state of the `/gateway` route.

use crate::connection::ConnectionManager;
use chat_common::GatewaySettings;
use chat_service::ServiceContext;
use std::sync::Arc;

/// Holds all shared dependencies of the gateway
#[derive(Clone)]
pub struct GatewayState {
    /// Same context as the REST side, so both share one event bus
    service_context: Arc<ServiceContext>,
    connection_manager: Arc<ConnectionManager>,
    settings: Arc<GatewaySettings>,
}

impl GatewayState {
    pub fn new(
        service_context: Arc<ServiceContext>,
        connection_manager: Arc<ConnectionManager>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            service_context,
            connection_manager,
            settings: Arc::new(settings),
        }
    }

    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    /// Owned handle for spawned tasks
    pub fn service_context_arc(&self) -> Arc<ServiceContext> {
        self.service_context.clone()
    }

    pub fn connection_manager(&self) -> &ConnectionManager {
        &self.connection_manager
    }

    pub fn connection_manager_arc(&self) -> Arc<ConnectionManager> {
        self.connection_manager.clone()
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("connection_manager", &self.connection_manager)
            .field("settings", &self.settings)
            .finish()
    }
}
