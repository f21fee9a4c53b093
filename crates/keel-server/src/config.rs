//! Server configuration.

use std::collections::HashSet;
use std::net::SocketAddr;

use keel_session::ManagerConfig;

/// Paths reachable without a logged-in session by default.
pub const DEFAULT_PUBLIC_PATHS: &[&str] = &["/health", "/api/account/login"];

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Request paths that do not require a logged-in session.
    pub public_paths: HashSet<String>,

    /// Origin allowed to make credentialed cross-origin requests (`None` = no CORS).
    pub cors_origin: Option<String>,

    /// Enable request logging.
    pub request_logging: bool,

    /// Session manager settings.
    pub session: ManagerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            public_paths: DEFAULT_PUBLIC_PATHS.iter().map(|p| p.to_string()).collect(),
            cors_origin: None,
            request_logging: true,
            session: ManagerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new server config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Mark an additional path as public.
    pub fn with_public_path(mut self, path: impl Into<String>) -> Self {
        self.public_paths.insert(path.into());
        self
    }

    /// Set the CORS origin.
    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = Some(origin.into());
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    /// Set the session manager configuration.
    pub fn with_session(mut self, session: ManagerConfig) -> Self {
        self.session = session;
        self
    }

    /// Whether `path` can be served without a logged-in session.
    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.contains(path)
    }
}
