//! Error types for session management.

/// Error type for session operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A manager was configured with a provider name nobody registered.
    #[error("Unknown session provider: {0}")]
    UnknownProvider(String),

    /// Two providers were registered under the same name.
    #[error("Session provider already registered: {0}")]
    DuplicateProvider(String),

    /// The session cookie value could not be URL-decoded.
    #[error("Malformed session cookie: {0}")]
    CookieDecode(String),

    /// The OS random source failed while generating a session id.
    #[error("Failed to generate session id: {0}")]
    Entropy(String),

    /// A `Set-Cookie` header could not be encoded.
    #[error("Invalid cookie header: {0}")]
    InvalidHeader(String),

    /// Error reported by a storage backend.
    #[error("Session backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Whether this error stems from startup configuration rather than a request.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::UnknownProvider(_) | Error::DuplicateProvider(_))
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;
