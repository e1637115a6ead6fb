//! One-way hashing of passwords and refresh secrets.
//!
//! Bcrypt with a tunable cost factor. The same hasher covers both stored
//! passwords and persisted refresh-secret hashes. These functions are pure
//! and intentionally slow; async callers must run them on the blocking pool
//! via `tokio::task::spawn_blocking`.

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Salted one-way hasher for credentials.
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl CredentialHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a secret with a fresh random salt.
    pub fn hash(&self, secret: &str) -> Result<String, bcrypt::BcryptError> {
        bcrypt::hash(secret, self.cost)
    }

    /// Verify a secret against a stored hash using bcrypt's own comparison.
    pub fn verify(&self, secret: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
        bcrypt::verify(secret, hash)
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum cost keeps tests fast.
    fn hasher() -> CredentialHasher {
        CredentialHasher::new(4)
    }

    #[test]
    fn test_hash_and_verify() {
        let h = hasher();
        let hash = h.hash("Aa1!aaaa").unwrap();

        assert!(h.verify("Aa1!aaaa", &hash).unwrap());
        assert!(!h.verify("Aa1!aaab", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let h = hasher();
        let a = h.hash("Aa1!aaaa").unwrap();
        let b = h.hash("Aa1!aaaa").unwrap();

        // Different salts produce different hashes for the same input.
        assert_ne!(a, b);
        assert!(h.verify("Aa1!aaaa", &a).unwrap());
        assert!(h.verify("Aa1!aaaa", &b).unwrap());
    }

    #[test]
    fn test_hash_is_not_plaintext() {
        let h = hasher();
        let hash = h.hash("Aa1!aaaa").unwrap();
        assert!(!hash.contains("Aa1!aaaa"));
    }
}
