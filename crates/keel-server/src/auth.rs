//! Credential checking for the login route.
//!
//! Verifying a user is an external concern; the server only needs an
//! [`Authenticator`] that maps submitted credentials to a [`User`].
//! [`StaticCredentials`] is a fixed table loaded from configuration.
//!
//! # Security
//!
//! Password comparison uses constant-time comparison to prevent timing attacks.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::error::Result;

/// Session key holding the logged-in [`User`].
pub const USER_KEY: &str = "USER";

/// The user stored in a logged-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Login name.
    pub name: String,
}

/// Login form.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    /// Login name.
    pub name: String,
    /// Plaintext password as submitted.
    pub password: String,
}

/// Checks submitted credentials.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Return the matching user, or `None` if the credentials are wrong.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Option<User>>;
}

/// Fixed name → password table.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    /// Create an empty table (every login fails).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user.
    pub fn with_user(mut self, name: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(name.into(), password.into());
        self
    }

    /// Number of known users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl From<HashMap<String, String>> for StaticCredentials {
    fn from(users: HashMap<String, String>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Authenticator for StaticCredentials {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Option<User>> {
        let Some(expected) = self.users.get(&credentials.name) else {
            return Ok(None);
        };
        if constant_time_eq(&credentials.password, expected) {
            Ok(Some(User {
                name: credentials.name.clone(),
            }))
        } else {
            Ok(None)
        }
    }
}

/// Compare two strings in constant time.
///
/// Lengths are not secret here, but a mismatch still performs a comparison
/// so both branches cost about the same.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    if a_bytes.len() == b_bytes.len() {
        a_bytes.ct_eq(b_bytes).into()
    } else {
        let _ = a_bytes.ct_eq(a_bytes);
        false
    }
}
