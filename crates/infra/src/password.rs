//! Argon2 credential hashing.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use warden_auth::{CollaboratorError, CredentialMatcher};

/// Argon2id hashing; salts are generated per hash and stored inside the PHC
/// string. Verification reads its parameters from the stored hash.
#[derive(Debug, Clone, Default)]
pub struct Argon2CredentialMatcher {
    params: Params,
}

impl Argon2CredentialMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimal-cost parameters for tests and local seeding.
    pub fn low_cost() -> Self {
        Self {
            params: Params::new(1024, 1, 1, None).unwrap_or_default(),
        }
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialMatcher for Argon2CredentialMatcher {
    fn matches(&self, plain: &str, hash: &str) -> Result<bool, CollaboratorError> {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(error = %err, "stored credential hash is malformed");
                return Ok(false);
            }
        };

        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }

    fn hash(&self, plain: &str) -> Result<String, CollaboratorError> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher()
            .hash_password(plain.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| CollaboratorError::new(format!("failed to hash credential: {e}")))
    }
}
