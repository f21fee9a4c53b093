//! Storage backend abstraction and the registry that names backends.
//!
//! A [`Provider`] owns sessions and is the only component allowed to mutate
//! its storage. Backends are registered by name in a [`ProviderRegistry`]
//! during startup; the registry is then handed to every
//! [`Manager`](crate::Manager) that needs to resolve a backend.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::{MEMORY_PROVIDER, MemoryProvider};
use crate::session::SessionHandle;

/// Trait for session storage backends.
///
/// Implementations must be safe for concurrent use on their own: the
/// manager's lock does not cover callers that reach the provider directly.
pub trait Provider: Send + Sync {
    /// Create and register a fresh, empty session under `id`.
    ///
    /// An existing session with the same id is replaced.
    fn session_init(&self, id: &str) -> Result<SessionHandle>;

    /// Return the session stored under `id`, creating an empty one on miss.
    fn session_read(&self, id: &str) -> Result<SessionHandle>;

    /// Mark `id` as just used. Unknown ids are ignored.
    fn session_update(&self, id: &str) -> Result<()>;

    /// Remove `id`. Unknown ids are ignored.
    fn session_destroy(&self, id: &str) -> Result<()>;

    /// Evict every session idle for at least `max_idle`. Returns the eviction count.
    fn session_gc(&self, max_idle: Duration) -> usize;

    /// Number of live sessions.
    fn session_count(&self) -> usize;
}

/// Named set of providers, populated once at startup.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the in-memory backend registered as `"memory"`.
    pub fn with_defaults() -> Self {
        let mut providers: HashMap<String, Arc<dyn Provider>> = HashMap::new();
        providers.insert(MEMORY_PROVIDER.to_string(), Arc::new(MemoryProvider::new()));
        Self { providers }
    }

    /// Register `provider` under `name`.
    ///
    /// Duplicate names are a configuration error and should abort startup.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) -> Result<()> {
        let name = name.into();
        if self.providers.contains_key(&name) {
            return Err(Error::DuplicateProvider(name));
        }
        debug!(provider = %name, "Registered session provider");
        self.providers.insert(name, provider);
        Ok(())
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Check whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
