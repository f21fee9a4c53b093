//! Config file loading.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8080"
//! cors_origin = "https://blog.example"
//! public_paths = ["/api/posts/info"]
//!
//! [session]
//! cookie_name = "SESSION_ID"
//! max_idle_secs = 1800
//!
//! [users]
//! alice = "wonderland"
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use keel_server::ServerConfig;
use keel_session::ManagerConfig;
use serde::Deserialize;

/// Root of the TOML config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerSection,
    pub session: ManagerConfig,
    /// Login name → password.
    pub users: HashMap<String, String>,
}

/// `[server]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: SocketAddr,
    pub cors_origin: Option<String>,
    /// Public paths in addition to the built-in ones.
    pub public_paths: Vec<String>,
    pub request_logging: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            bind: defaults.bind_address,
            cors_origin: defaults.cors_origin,
            public_paths: Vec::new(),
            request_logging: defaults.request_logging,
        }
    }
}

impl FileConfig {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        Self::parse(&text)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))
    }

    /// Parse config from TOML text.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Build the server configuration, letting `bind` override the file.
    pub fn server_config(&self, bind: Option<SocketAddr>) -> ServerConfig {
        let mut config = ServerConfig::new()
            .with_bind_address(bind.unwrap_or(self.server.bind))
            .with_request_logging(self.server.request_logging)
            .with_session(self.session.clone());
        if let Some(origin) = &self.server.cors_origin {
            config = config.with_cors_origin(origin.clone());
        }
        for path in &self.server.public_paths {
            config = config.with_public_path(path.clone());
        }
        config
    }
}
