//! Configuration for the session manager.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::memory::MEMORY_PROVIDER;

/// Default name of the session cookie.
pub const DEFAULT_COOKIE_NAME: &str = "SESSION_ID";

/// Default idle lifetime in seconds before a session may be collected.
pub const DEFAULT_MAX_IDLE_SECS: u64 = 60;

/// Default interval in seconds between garbage collection passes.
pub const DEFAULT_GC_INTERVAL_SECS: u64 = 60;

/// Session manager configuration.
///
/// ```toml
/// [session]
/// provider = "memory"
/// cookie_name = "SESSION_ID"
/// max_idle_secs = 60
/// gc_interval_secs = 60
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Registered name of the storage backend.
    pub provider: String,

    /// Name of the cookie carrying the session id.
    pub cookie_name: String,

    /// Seconds a session may stay untouched before it becomes collectable.
    pub max_idle_secs: u64,

    /// Seconds between background garbage collection passes.
    pub gc_interval_secs: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            provider: MEMORY_PROVIDER.to_string(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_idle_secs: DEFAULT_MAX_IDLE_SECS,
            gc_interval_secs: DEFAULT_GC_INTERVAL_SECS,
        }
    }
}

impl ManagerConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider name.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Set the cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the idle lifetime.
    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle_secs = max_idle.as_secs();
        self
    }

    /// Set the garbage collection interval.
    pub fn with_gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval_secs = interval.as_secs();
        self
    }

    /// Idle lifetime as a duration.
    pub fn max_idle(&self) -> Duration {
        Duration::from_secs(self.max_idle_secs)
    }

    /// Garbage collection interval as a duration.
    pub fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.gc_interval_secs)
    }
}
