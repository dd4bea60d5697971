//! Error type shared by collaborator lookups.

use thiserror::Error;

/// Result type alias for collaborator lookups.
pub type Result<T> = std::result::Result<T, LookupError>;

/// A lookup against a storage collaborator failed.
///
/// Absence is expressed in the `Ok` value (an empty roster, a rejected
/// credential); a failure here is operational only. Timeouts are applied by
/// the caller, which reports them in its own terms.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}
