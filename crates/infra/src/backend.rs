//! Wiring of the in-memory adapters into an [`AuthEngine`].

use std::sync::Arc;

use warden_auth::{
    AuditSink, AuthConfig, AuthEngine, AuthServices, CredentialMatcher, Identity, IdentityStore,
    IdentityType, NewIdentity, StoreError, User, normalize_identifier,
};
use warden_core::{Clock, IdentityId, TenantId, UserId};

use crate::audit::RecordingAuditSink;
use crate::codes::InMemoryCodeVerifier;
use crate::password::Argon2CredentialMatcher;
use crate::store::{InMemoryIdentityStore, InMemoryPermissionStore, InMemoryTenantPolicyStore};

/// Concrete handles to every in-memory adapter, for seeding and inspection.
#[derive(Clone)]
pub struct InMemoryBackend {
    pub identities: Arc<InMemoryIdentityStore>,
    pub tenants: Arc<InMemoryTenantPolicyStore>,
    pub permissions: Arc<InMemoryPermissionStore>,
    pub credentials: Arc<Argon2CredentialMatcher>,
    pub codes: Arc<InMemoryCodeVerifier>,
    pub audit: Arc<RecordingAuditSink>,
    pub clock: Arc<dyn Clock>,
}

impl InMemoryBackend {
    pub fn new(clock: Arc<dyn Clock>, credentials: Argon2CredentialMatcher) -> Self {
        Self {
            identities: Arc::new(InMemoryIdentityStore::new()),
            tenants: Arc::new(InMemoryTenantPolicyStore::new()),
            permissions: Arc::new(InMemoryPermissionStore::new()),
            credentials: Arc::new(credentials),
            codes: Arc::new(InMemoryCodeVerifier::new(clock.clone())),
            audit: Arc::new(RecordingAuditSink::new()),
            clock,
        }
    }

    pub fn services(&self) -> AuthServices {
        self.services_with_audit(self.audit.clone())
    }

    /// Same adapters, different audit destination.
    pub fn services_with_audit(&self, audit: Arc<dyn AuditSink>) -> AuthServices {
        AuthServices {
            identities: self.identities.clone(),
            tenants: self.tenants.clone(),
            permissions: self.permissions.clone(),
            credentials: self.credentials.clone(),
            codes: self.codes.clone(),
            audit,
            clock: self.clock.clone(),
        }
    }

    pub fn engine(&self, config: AuthConfig) -> AuthEngine {
        AuthEngine::new(config, self.services())
    }

    /// Create a user with one identity; `password` is hashed when given.
    pub fn seed_user(
        &self,
        identity_type: IdentityType,
        identifier: &str,
        password: Option<&str>,
        primary_tenant: Option<TenantId>,
    ) -> Result<Identity, StoreError> {
        let credential_hash = password
            .map(|p| self.credentials.hash(p))
            .transpose()
            .map_err(|e| StoreError::storage(e.to_string()))?;

        let user_id = UserId::new();
        self.identities.insert_user_with_identity(
            User::new(user_id, primary_tenant),
            NewIdentity {
                id: IdentityId::new(),
                user_id,
                identity_type,
                identifier: normalize_identifier(identity_type, identifier),
                credential_hash,
            },
        )
    }

    /// Attach another identity to an existing user.
    pub fn seed_identity(
        &self,
        user_id: UserId,
        identity_type: IdentityType,
        identifier: &str,
        password: Option<&str>,
    ) -> Result<Identity, StoreError> {
        let credential_hash = password
            .map(|p| self.credentials.hash(p))
            .transpose()
            .map_err(|e| StoreError::storage(e.to_string()))?;

        self.identities.insert_identity(NewIdentity {
            id: IdentityId::new(),
            user_id,
            identity_type,
            identifier: normalize_identifier(identity_type, identifier),
            credential_hash,
        })
    }
}
