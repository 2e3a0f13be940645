//! Collaborator capabilities consumed by the engine.
//!
//! Hashing algorithms and code delivery live behind these traits; the engine
//! only decides when to call them.

use thiserror::Error;

use crate::login_type::{CodeChannel, CodeScene};

/// Failure inside a collaborator (hasher, code gateway).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

impl CollaboratorError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Verifies and produces stored credential hashes.
pub trait CredentialMatcher: Send + Sync {
    /// Whether `plain` matches the stored `hash`.
    ///
    /// A malformed hash is a mismatch, not an error; `Err` is reserved for the
    /// matcher itself being unavailable.
    fn matches(&self, plain: &str, hash: &str) -> Result<bool, CollaboratorError>;

    /// Hash a new credential for storage.
    fn hash(&self, plain: &str) -> Result<String, CollaboratorError>;
}

/// Issues and validates one-time codes for an (identifier, scene) pair.
pub trait CodeVerifier: Send + Sync {
    fn send(
        &self,
        channel: CodeChannel,
        identifier: &str,
        scene: CodeScene,
    ) -> Result<(), CollaboratorError>;

    /// `Ok(false)` for a wrong or expired code.
    fn verify(&self, identifier: &str, scene: CodeScene, code: &str)
    -> Result<bool, CollaboratorError>;
}
