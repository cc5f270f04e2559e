use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::AppError;

use std::sync::OnceLock;

/// Hashes with a fresh random salt. Never falls back to storing the plaintext.
pub fn hash_password(plaintext: &str) -> Result<String, AppError> {
    let mut salt_bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut salt_bytes)
        .map_err(|_| AppError::HashingError)?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|_| AppError::HashingError)?;
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| {
            tracing::error!(error = %err, "password hashing failed");
            AppError::HashingError
        })
}

pub fn verify_password(plaintext: &str, digest: &str) -> bool {
    let hash = match PasswordHash::new(digest) {
        Ok(hash) => hash,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &hash)
        .is_ok()
}

/// Burns one verification against a throwaway digest so an unknown email costs the same
/// as a wrong password.
pub fn verify_against_dummy(plaintext: &str) {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    let digest = DUMMY.get_or_init(|| hash_password("binday-dummy-password").ok());
    if let Some(digest) = digest {
        let _ = verify_password(plaintext, digest);
    }
}
