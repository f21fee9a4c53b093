//! Pluggable cookie-backed session management.
//!
//! This crate issues, stores, refreshes and expires per-client session state
//! for an HTTP service:
//! - [`Session`]: the key/value capability handed to request handlers
//! - [`Provider`]: storage backend trait, selected by name from a [`ProviderRegistry`]
//! - [`MemoryProvider`]: in-process backend with recency-ordered idle eviction
//! - [`Manager`]: reads and writes the session cookie and drives garbage collection
//!
//! # Example
//!
//! ```rust,ignore
//! use keel_session::{Manager, ManagerConfig, ProviderRegistry};
//!
//! let registry = ProviderRegistry::with_defaults();
//! let config = ManagerConfig::default().with_max_idle(Duration::from_secs(1800));
//! let manager = Arc::new(Manager::from_config(&registry, &config)?);
//! let gc = manager.spawn_gc(config.gc_interval());
//!
//! let session = manager.session_start(request.headers(), response.headers_mut())?;
//! session.set("USER", serde_json::json!({"name": "alice"}))?;
//! ```

mod config;
mod error;
mod manager;
mod memory;
mod provider;
mod session;

pub use config::{
    DEFAULT_COOKIE_NAME, DEFAULT_GC_INTERVAL_SECS, DEFAULT_MAX_IDLE_SECS, ManagerConfig,
};
pub use error::{Error, Result};
pub use manager::{GcTask, Manager, generate_session_id};
pub use memory::{MEMORY_PROVIDER, MemoryProvider, MemorySession};
pub use provider::{Provider, ProviderRegistry};
pub use session::{Session, SessionHandle};
