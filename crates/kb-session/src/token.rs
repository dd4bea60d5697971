//! Session token generation.

use base64::{Engine, engine::general_purpose::URL_SAFE};
use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::error::{Error, Result};

/// Number of random bytes in a session token.
pub const TOKEN_BYTES: usize = 32;

/// Generate a new session token.
///
/// Reads [`TOKEN_BYTES`] from the OS random source and URL-safe base64
/// encodes them. Fails with [`Error::EntropyUnavailable`] rather than
/// returning a weak token.
pub fn generate_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::EntropyUnavailable(e.to_string()))?;
    Ok(URL_SAFE.encode(bytes))
}
