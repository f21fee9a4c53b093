//! The session capability exposed to request handlers.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{Error, Result};

/// Per-client key/value store identified by an opaque id.
///
/// Every accessor, [`Session::session_id`] included, counts as activity and
/// refreshes the session's last-access time in its provider. Handlers should
/// depend on this trait only, never on a concrete backend.
pub trait Session: Send + Sync {
    /// Insert or overwrite a value.
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Fetch a value, or `None` if the key is absent.
    fn get(&self, key: &str) -> Option<Value>;

    /// Remove a key. Removing a missing key is not an error.
    fn delete(&self, key: &str);

    /// Check whether a key is present.
    fn is_value_present(&self, key: &str) -> bool;

    /// The immutable session identifier.
    fn session_id(&self) -> &str;
}

/// Shared handle to a provider-owned session.
pub type SessionHandle = Arc<dyn Session>;

impl dyn Session {
    /// Serialize `value` and store it under `key`.
    pub fn set_as<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| Error::Backend(e.to_string()))?;
        self.set(key, value)
    }

    /// Fetch `key` and deserialize it, returning `None` if absent or of another shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }
}
