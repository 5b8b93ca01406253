//! Password value object backed by Argon2id.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::constants::MIN_PASSWORD_LENGTH;
use crate::error::{DomainError, DomainResult};

/// Upper bound on accepted plain-text length; hashing cost grows with input.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Hash never produced by `Password::new`; verifying against it always fails.
/// Used by login to keep the unknown-email path as slow as the known one.
const UNMATCHABLE_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHRzYWx0$4Jm0zDS0GQyBmA7jG0QmnMZVz4jP0HSdh9Cf3zgq0Tc";

/// A stored password hash.
#[derive(Clone, PartialEq, Eq)]
pub struct Password {
    hash: String,
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password").field("hash", &"[REDACTED]").finish()
    }
}

impl Password {
    /// Hash a plain-text password after checking the length policy.
    pub fn new(plain_text: &str) -> DomainResult<Self> {
        let length = plain_text.chars().count();
        if length < MIN_PASSWORD_LENGTH {
            return Err(DomainError::password(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        if length > MAX_PASSWORD_LENGTH {
            return Err(DomainError::password(format!(
                "Password must be at most {} characters",
                MAX_PASSWORD_LENGTH
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| DomainError::internal(format!("Password hash failed: {}", e)))?
            .to_string();

        Ok(Self { hash })
    }

    /// Wrap a hash loaded from storage.
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    /// Placeholder that never verifies.
    pub fn unmatchable() -> Self {
        Self::from_hash(UNMATCHABLE_HASH)
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    pub fn into_string(self) -> String {
        self.hash
    }

    /// Check a plain-text candidate. Malformed hashes never verify.
    pub fn verify(&self, plain_text: &str) -> bool {
        match PasswordHash::new(&self.hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(plain_text.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_and_verifies() {
        let password = Password::new("correct horse battery").unwrap();
        assert!(password.verify("correct horse battery"));
        assert!(!password.verify("wrong horse battery"));
    }

    #[test]
    fn restores_from_stored_hash() {
        let stored = Password::new("TestPassword123").unwrap().into_string();
        assert!(Password::from_hash(stored).verify("TestPassword123"));
    }

    #[test]
    fn salts_differ_for_same_input() {
        let a = Password::new("SamePassword123").unwrap();
        let b = Password::new("SamePassword123").unwrap();
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn enforces_length_policy() {
        assert!(matches!(Password::new("short"), Err(DomainError::Password(_))));
        assert!(Password::new("12345678").is_ok());
        assert!(Password::new(&"x".repeat(129)).is_err());
    }

    #[test]
    fn unmatchable_never_verifies() {
        assert!(!Password::unmatchable().verify(""));
        assert!(!Password::unmatchable().verify("anything-at-all"));
        assert!(!Password::from_hash("not-a-hash").verify("not-a-hash"));
    }
}
