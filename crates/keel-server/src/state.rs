//! Application state shared across handlers.

use std::sync::Arc;

use keel_session::{Manager, ProviderRegistry};

use crate::auth::Authenticator;
use crate::config::ServerConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session manager.
    pub manager: Arc<Manager>,

    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Login credential checker.
    pub authenticator: Arc<dyn Authenticator>,
}

impl AppState {
    /// Create application state, resolving the session provider from `registry`.
    ///
    /// Fails if the configured provider is not registered.
    pub fn new(
        registry: &ProviderRegistry,
        config: ServerConfig,
        authenticator: Arc<dyn Authenticator>,
    ) -> keel_session::Result<Self> {
        let manager = Manager::from_config(registry, &config.session)?;
        Ok(Self {
            manager: Arc::new(manager),
            config: Arc::new(config),
            authenticator,
        })
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
