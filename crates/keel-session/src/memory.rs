//! In-memory session provider with recency-ordered idle eviction.
//!
//! Sessions live in an unbounded [`LruCache`] keyed by id, which doubles as
//! the id map and the recency ordering: every touch promotes the entry to the
//! front, so the least recently used session is always at the back. Garbage
//! collection pops from the back until it reaches a session that is still
//! within its idle lifetime, touching only the entries it evicts.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::Result;
use crate::provider::Provider;
use crate::session::{Session, SessionHandle};

/// Registry name of the in-memory provider.
pub const MEMORY_PROVIDER: &str = "memory";

type Store = Mutex<LruCache<String, Arc<MemorySession>>>;

/// Session record owned by a [`MemoryProvider`].
pub struct MemorySession {
    id: String,
    last_accessed: Mutex<Instant>,
    values: Mutex<HashMap<String, Value>>,
    /// Back-reference used to promote this session on access.
    store: Weak<Store>,
}

impl MemorySession {
    fn new(id: &str, store: Weak<Store>) -> Self {
        Self {
            id: id.to_string(),
            last_accessed: Mutex::new(Instant::now()),
            values: Mutex::new(HashMap::new()),
            store,
        }
    }

    /// When this session was last touched.
    pub fn last_accessed(&self) -> Instant {
        *self.last_accessed.lock()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    /// Whether no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    /// Refresh this session in its provider.
    ///
    /// Only the live entry is refreshed: a handle to a destroyed session never
    /// promotes a newer session that reuses its id.
    fn touch(&self) {
        let Some(store) = self.store.upgrade() else {
            return;
        };
        let mut lru = store.lock();
        let live = lru
            .peek(self.id.as_str())
            .is_some_and(|entry| std::ptr::eq(Arc::as_ptr(entry), self));
        if live {
            lru.promote(self.id.as_str());
            *self.last_accessed.lock() = Instant::now();
        }
    }
}

impl Session for MemorySession {
    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.touch();
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.touch();
        self.values.lock().get(key).cloned()
    }

    fn delete(&self, key: &str) {
        self.touch();
        self.values.lock().remove(key);
    }

    fn is_value_present(&self, key: &str) -> bool {
        self.touch();
        self.values.lock().contains_key(key)
    }

    fn session_id(&self) -> &str {
        self.touch();
        &self.id
    }
}

impl fmt::Debug for MemorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySession")
            .field("id", &self.id)
            .field("last_accessed", &self.last_accessed())
            .field("keys", &self.len())
            .finish()
    }
}

/// Reference backend keeping every session in process memory.
///
/// Cloning is cheap and clones share the same storage.
#[derive(Clone)]
pub struct MemoryProvider {
    store: Arc<Store>,
}

impl MemoryProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(LruCache::unbounded())),
        }
    }

    /// Session ids from most to least recently used.
    pub fn ids_by_recency(&self) -> Vec<String> {
        self.store.lock().iter().map(|(id, _)| id.clone()).collect()
    }

    fn insert_locked(
        &self,
        lru: &mut LruCache<String, Arc<MemorySession>>,
        id: &str,
    ) -> Arc<MemorySession> {
        let session = Arc::new(MemorySession::new(id, Arc::downgrade(&self.store)));
        if lru.put(id.to_string(), Arc::clone(&session)).is_some() {
            debug!(session_id = %id, "Replaced existing session with the same id");
        }
        trace!(session_id = %id, live = lru.len(), "Session created");
        session
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for MemoryProvider {
    fn session_init(&self, id: &str) -> Result<SessionHandle> {
        let mut lru = self.store.lock();
        Ok(self.insert_locked(&mut lru, id))
    }

    fn session_read(&self, id: &str) -> Result<SessionHandle> {
        let mut lru = self.store.lock();
        if let Some(session) = lru.peek(id) {
            trace!(session_id = %id, "Session found");
            return Ok(Arc::clone(session) as SessionHandle);
        }
        debug!(session_id = %id, "Session not found, creating");
        Ok(self.insert_locked(&mut lru, id))
    }

    fn session_update(&self, id: &str) -> Result<()> {
        let mut lru = self.store.lock();
        if let Some(session) = lru.get(id) {
            *session.last_accessed.lock() = Instant::now();
        }
        Ok(())
    }

    fn session_destroy(&self, id: &str) -> Result<()> {
        if self.store.lock().pop(id).is_some() {
            debug!(session_id = %id, "Session destroyed");
        }
        Ok(())
    }

    fn session_gc(&self, max_idle: Duration) -> usize {
        let mut lru = self.store.lock();
        let now = Instant::now();
        let mut evicted = 0;

        while let Some((_, oldest)) = lru.peek_lru() {
            if now.saturating_duration_since(oldest.last_accessed()) < max_idle {
                break;
            }
            if let Some((id, _)) = lru.pop_lru() {
                trace!(session_id = %id, "Evicting idle session");
                evicted += 1;
            }
        }

        if evicted > 0 {
            debug!(evicted, live = lru.len(), "Collected idle sessions");
        }
        evicted
    }

    fn session_count(&self) -> usize {
        self.store.lock().len()
    }
}

impl fmt::Debug for MemoryProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryProvider")
            .field("sessions", &self.session_count())
            .finish()
    }
}
