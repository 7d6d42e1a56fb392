use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};

// =============================================================================
// API tokens
// =============================================================================

/// Generate a new API token (32 random bytes, hex encoded)
///
/// Only the SHA-256 of the token is persisted; see [`hash_token`].
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash an API token for storage and lookup
///
/// `token_hash = SHA256(token)`
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

// =============================================================================
// Passwords
// =============================================================================

/// Argon2id password hasher
///
/// `insecure` selects minimal parameters so tests and local development do not
/// spend seconds per signup. Never enable it in production.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    insecure: bool,
}

impl PasswordHasher {
    pub fn new(insecure: bool) -> Self {
        Self { insecure }
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        if self.insecure {
            let params =
                Params::new(1024, 1, 1, None).map_err(|e| AppError::PasswordHash(e.to_string()))?;
            Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
        } else {
            Ok(Argon2::default())
        }
    }

    /// Hash a password into a PHC string
    pub fn hash(&self, password: &str) -> Result<String> {
        let mut salt_bytes = [0u8; 16];
        OsRng.fill_bytes(&mut salt_bytes);
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| AppError::PasswordHash(e.to_string()))?;

        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::PasswordHash(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Verify a password against a stored PHC string
    ///
    /// Parameters are read from the PHC string, so hashes made with either
    /// setting verify under both.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => {
                tracing::warn!("Stored password hash is not a valid PHC string");
                return false;
            }
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Hash on the blocking pool; Argon2 is CPU bound
    pub async fn hash_blocking(self, password: String) -> Result<String> {
        tokio::task::spawn_blocking(move || self.hash(&password)).await?
    }

    /// Verify on the blocking pool
    pub async fn verify_blocking(self, password: String, hash: String) -> Result<bool> {
        Ok(tokio::task::spawn_blocking(move || self.verify(&password, &hash)).await?)
    }
}
