//! Argon2 password hashing in PHC string format.

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::error::{Result, StorageError};

const SALT_BYTES: usize = 16;

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; SALT_BYTES];
    OsRng
        .try_fill_bytes(&mut salt_bytes)
        .map_err(|e| StorageError::Password(e.to_string()))?;
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| StorageError::Password(e.to_string()))?;

    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| StorageError::Password(e.to_string()))?
        .to_string();
    Ok(phc)
}

/// Check `password` against a stored PHC hash. A malformed hash never verifies.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
