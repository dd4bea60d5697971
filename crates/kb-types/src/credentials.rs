//! Credential verification capability used by the login route.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// Checks a username/password pair against stored credentials.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Returns `Ok(false)` for an unknown user or a wrong password.
    async fn verify_credentials(&self, username: &str, password: &str) -> Result<bool>;
}

/// Thread-safe shared credential verifier.
pub type SharedCredentialVerifier = Arc<dyn CredentialVerifier>;
