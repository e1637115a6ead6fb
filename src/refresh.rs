//! Refresh token generation.
//!
//! A refresh token is an opaque bearer secret: 64 random bytes hex-encoded.
//! The first 32 hex characters double as a public lookup key, stored in
//! plaintext and indexed so the session record can be found without scanning
//! all users (the full secret is bcrypt-hashed with a random salt, so
//! equality lookup on the hash is impossible). The lookup key alone is never
//! sufficient for authorization; the full secret must hash-verify.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;

/// Raw entropy per refresh secret.
const SECRET_BYTES: usize = 64;

/// Length of the hex-encoded secret.
pub const SECRET_HEX_LEN: usize = SECRET_BYTES * 2;

/// Length of the lookup-key prefix (128 bits, hex-encoded).
pub const LOOKUP_KEY_LEN: usize = 32;

/// Refresh expiry for a normal login.
pub const LOGIN_EXPIRY_DAYS: u64 = 1;

/// Refresh expiry when the caller opts into "remember me".
pub const REMEMBER_ME_EXPIRY_DAYS: u64 = 30;

/// Refresh expiry for registration and rotation.
pub const DEFAULT_EXPIRY_DAYS: u64 = 7;

/// A freshly generated refresh credential.
///
/// Only `secret` is handed to the client; the store persists its hash
/// together with the plaintext `lookup_key` and expiry.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    /// The full bearer secret (hex)
    pub secret: String,
    /// Plaintext prefix used for indexed retrieval
    pub lookup_key: String,
    /// Expiration time (Unix timestamp)
    pub expires_at: u64,
}

impl RefreshToken {
    /// Generate a new refresh credential expiring `expiry_days` from now.
    pub fn generate(expiry_days: u64) -> Self {
        let mut bytes = [0u8; SECRET_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        let secret = hex::encode(bytes);
        let lookup_key = secret[..LOOKUP_KEY_LEN].to_string();

        Self {
            secret,
            lookup_key,
            expires_at: now_unix() + expiry_days * 24 * 60 * 60,
        }
    }
}

/// Derive the lookup key from a presented secret.
/// Returns `None` if the secret is too short to be valid.
pub fn lookup_key_of(secret: &str) -> Option<&str> {
    if secret.len() < SECRET_HEX_LEN || !secret.is_ascii() {
        return None;
    }
    Some(&secret[..LOOKUP_KEY_LEN])
}

/// Current time as Unix seconds.
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
