//! Error types for session operations.

/// Error type for session operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Token is unknown to both the cache and the durable store, or has expired.
    #[error("Session not found")]
    NotFound,

    /// The durable store could not be reached or did not answer in time.
    #[error("Session store unavailable: {0}")]
    StoreUnavailable(String),

    /// The OS random source could not supply bytes for a new token.
    #[error("Entropy unavailable: {0}")]
    EntropyUnavailable(String),
}

impl Error {
    /// Whether this error means "not logged in" rather than an operational failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;
