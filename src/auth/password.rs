//! Argon2id password hashing.
//!
//! Each hash call draws a fresh random salt, so hashing the same password
//! twice yields two different digests that both verify. Cost parameters
//! are fixed at construction and never derived from request input.

use anyhow::{anyhow, Result};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher as _, PasswordVerifier as _};

/// One-way, salted, memory-hard password hasher.
#[derive(Clone, Default)]
pub struct PasswordHasher {
    inner: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new() -> Self {
        // Argon2id v19 with the crate's defaults (19 MiB, t=2, p=1).
        Self {
            inner: Argon2::default(),
        }
    }

    /// Hash a plaintext password into a PHC-format digest.
    ///
    /// Failure here means resource exhaustion or an internal argon2
    /// error, never a property of the credential itself.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .inner
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| anyhow!("password hashing failed: {e}"))?;
        Ok(digest.to_string())
    }

    /// Verify a plaintext password against a stored digest.
    ///
    /// Runs in time independent of how much of the password matches.
    /// A malformed digest verifies as `false` rather than erroring.
    pub fn verify(&self, digest: &str, plaintext: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        self.inner
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let hasher = PasswordHasher::new();
        let digest = hasher.hash("secret1").unwrap();
        assert!(hasher.verify(&digest, "secret1"));
        assert!(!hasher.verify(&digest, "secret2"));
    }

    #[test]
    fn same_password_hashes_differently() {
        let hasher = PasswordHasher::new();
        let a = hasher.hash("secret1").unwrap();
        let b = hasher.hash("secret1").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify(&a, "secret1"));
        assert!(hasher.verify(&b, "secret1"));
    }

    #[test]
    fn digest_never_contains_plaintext() {
        let hasher = PasswordHasher::new();
        let digest = hasher.hash("hunter2hunter2").unwrap();
        assert!(!digest.contains("hunter2"));
        assert!(digest.starts_with("$argon2id$"));
    }

    #[test]
    fn malformed_digest_verifies_false() {
        let hasher = PasswordHasher::new();
        assert!(!hasher.verify("", "secret1"));
        assert!(!hasher.verify("not-a-digest", "secret1"));
        assert!(!hasher.verify("$argon2id$broken", "secret1"));
    }
}
