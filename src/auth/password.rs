// Password hashing and verification service

use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use rand::rngs::OsRng;

use crate::auth::error::AuthError;

/// Password service for hashing and verification
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordService;

impl PasswordService {
    /// Hash a password using Argon2id with a random salt
    pub fn hash_password(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                tracing::error!("Argon2 hashing failed: {}", e);
                AuthError::PasswordHashError
            })
    }

    /// Verify a password against a stored hash
    ///
    /// Returns `PasswordMismatch` when the plaintext does not match and
    /// `PasswordHashError` when the stored hash cannot be parsed.
    pub fn verify_password(hash: &str, password: &str) -> Result<(), AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            tracing::error!("Stored password hash is unreadable: {}", e);
            AuthError::PasswordHashError
        })?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::PasswordMismatch)
    }
}
