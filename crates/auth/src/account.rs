//! Account operations around login: code delivery, password reset,
//! registration and administrative unlock.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use warden_core::{IdentityId, UserId};

use crate::capability::{CodeVerifier, CredentialMatcher};
use crate::config::AuthConfig;
use crate::engine::AuthServices;
use crate::error::LoginError;
use crate::lockout::LockoutTracker;
use crate::login::{TenantRef, resolve_tenant};
use crate::login_type::{CodeChannel, CodeScene, CredentialKind, LoginType};
use crate::policy::PolicyResolver;
use crate::resolver::IdentityResolver;
use crate::store::{IdentityStore, StoreError, TenantPolicyStore};
use crate::user::{Identity, NewIdentity, User, normalize_identifier};

/// Self-service registration of a new identity.
#[derive(Debug)]
pub struct RegistrationRequest {
    pub login_type: LoginType,
    pub identifier: String,
    /// Password for password types, one-time code for code types.
    pub secret: SecretString,
    pub tenant: TenantRef,
    /// Attach the identity to this user instead of creating a new one.
    pub existing_user: Option<UserId>,
}

impl RegistrationRequest {
    pub fn new(
        login_type: LoginType,
        identifier: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            login_type,
            identifier: identifier.into(),
            secret: SecretString::from(secret.into()),
            tenant: TenantRef::Platform,
            existing_user: None,
        }
    }

    pub fn in_tenant(mut self, tenant: TenantRef) -> Self {
        self.tenant = tenant;
        self
    }

    pub fn for_user(mut self, user_id: UserId) -> Self {
        self.existing_user = Some(user_id);
        self
    }
}

#[derive(Clone)]
pub struct AccountService {
    policies: PolicyResolver,
    resolver: IdentityResolver,
    lockout: LockoutTracker,
    tenants: Arc<dyn TenantPolicyStore>,
    identities: Arc<dyn IdentityStore>,
    credentials: Arc<dyn CredentialMatcher>,
    codes: Arc<dyn CodeVerifier>,
}

impl AccountService {
    pub fn new(config: &AuthConfig, services: &AuthServices) -> Self {
        Self {
            policies: PolicyResolver::new(config.default_policy, services.tenants.clone()),
            // Password reset and registration never auto-provision.
            resolver: IdentityResolver::new(services.identities.clone(), false),
            lockout: LockoutTracker::new(services.identities.clone()),
            tenants: services.tenants.clone(),
            identities: services.identities.clone(),
            credentials: services.credentials.clone(),
            codes: services.codes.clone(),
        }
    }

    /// Deliver a one-time code, subject to the channel's policy flag.
    pub fn send_code(
        &self,
        channel: CodeChannel,
        identifier: &str,
        scene: CodeScene,
        tenant: &TenantRef,
    ) -> Result<(), LoginError> {
        if identifier.trim().is_empty() {
            return Err(LoginError::invalid_param("identifier is required"));
        }

        let tenant_id = resolve_tenant(self.tenants.as_ref(), tenant)?;
        let policy = self.policies.resolve(tenant_id)?;
        if !policy.allows(channel.policy_flag()) {
            return Err(LoginError::LoginMethodForbidden(channel.login_type()));
        }

        let identifier = normalize_identifier(channel.identity_type(), identifier);
        self.codes.send(channel, &identifier, scene)?;
        tracing::info!(?channel, scene = scene.as_str(), tenant_id = ?tenant_id, "verification code sent");
        Ok(())
    }

    /// Overwrite a user's password after proving control of a code channel.
    ///
    /// Clears the failure counter; an active lock stays until it expires or
    /// an administrator unlocks the user.
    pub fn reset_password(
        &self,
        channel: CodeChannel,
        identifier: &str,
        code: &str,
        new_secret: &SecretString,
        tenant: &TenantRef,
    ) -> Result<(), LoginError> {
        if identifier.trim().is_empty() {
            return Err(LoginError::invalid_param("identifier is required"));
        }
        if code.trim().is_empty() {
            return Err(LoginError::invalid_param("verification code is required"));
        }
        let new_secret = new_secret.expose_secret();
        if new_secret.trim().is_empty() {
            return Err(LoginError::invalid_param("new password is required"));
        }

        let tenant_id = resolve_tenant(self.tenants.as_ref(), tenant)?;

        let normalized = normalize_identifier(channel.identity_type(), identifier);
        if !self
            .codes
            .verify(&normalized, CodeScene::ResetPassword, code.trim())?
        {
            return Err(LoginError::CodeInvalid);
        }

        let owner = self
            .resolver
            .find_existing(channel.login_type(), identifier, tenant_id)?
            .ok_or(LoginError::IdentityNotFound)?;

        let target = self
            .resolver
            .find_credential_target(owner.user_id, channel)?
            .ok_or(LoginError::IdentityNotFound)?;

        let hash = self.credentials.hash(new_secret)?;
        self.identities.update_credential(target.id, &hash)?;
        self.lockout.reset_counter(owner.user_id)?;

        tracing::info!(
            user_id = %owner.user_id,
            identity_type = target.identity_type.as_str(),
            "password reset"
        );
        Ok(())
    }

    pub fn register(&self, request: RegistrationRequest) -> Result<Identity, LoginError> {
        let login_type = request.login_type;
        if request.identifier.trim().is_empty() {
            return Err(LoginError::invalid_param("identifier is required"));
        }

        let tenant_id = resolve_tenant(self.tenants.as_ref(), &request.tenant)?;
        let policy = self.policies.resolve(tenant_id)?;
        if !policy.allows(login_type.policy_flag()) {
            return Err(LoginError::LoginMethodForbidden(login_type));
        }

        let identity_type = login_type.identity_type();
        let identifier = normalize_identifier(identity_type, &request.identifier);
        let secret = request.secret.expose_secret();

        let credential_hash = match login_type.credential_kind() {
            CredentialKind::Password => {
                if secret.trim().is_empty() {
                    return Err(LoginError::invalid_param("password is required"));
                }
                Some(self.credentials.hash(secret)?)
            }
            CredentialKind::Code(_) => {
                let valid = !secret.trim().is_empty()
                    && self
                        .codes
                        .verify(&identifier, CodeScene::Register, secret.trim())?;
                if !valid {
                    return Err(LoginError::CodeInvalid);
                }
                None
            }
            CredentialKind::External => {
                return Err(LoginError::LoginMethodNotSupported(login_type));
            }
        };

        if self
            .identities
            .count_by_type_and_identifier(identity_type, &identifier)?
            > 0
        {
            return Err(LoginError::DuplicateIdentity);
        }

        // The same address under the sibling email type must belong to the
        // user being extended, never to someone else.
        if let Some(sibling) = identity_type.shares_identifier_with() {
            let owner = self
                .identities
                .find_by_type_and_identifier(sibling, &identifier, None)?;
            if owner.is_some_and(|o| Some(o.user_id) != request.existing_user) {
                return Err(LoginError::DuplicateIdentity);
            }
        }

        let user_id = request.existing_user.unwrap_or_else(UserId::new);
        let new_identity = NewIdentity {
            id: IdentityId::new(),
            user_id,
            identity_type,
            identifier,
            credential_hash,
        };

        let inserted = match request.existing_user {
            Some(existing) => {
                if self.identities.find_user(existing)?.is_none() {
                    return Err(LoginError::invalid_param(format!("unknown user {existing}")));
                }
                self.identities.insert_identity(new_identity)
            }
            None => self
                .identities
                .insert_user_with_identity(User::new(user_id, tenant_id), new_identity),
        };

        match inserted {
            Ok(identity) => {
                tracing::info!(
                    user_id = %identity.user_id,
                    identity_type = identity.identity_type.as_str(),
                    tenant_id = ?tenant_id,
                    "identity registered"
                );
                Ok(identity)
            }
            // Lost a race with a concurrent registration.
            Err(StoreError::UniqueViolation(_)) => Err(LoginError::DuplicateIdentity),
            Err(other) => Err(other.into()),
        }
    }

    /// Administrative unlock: clears the lock and the failure counter.
    pub fn unlock_user(&self, user_id: UserId) -> Result<(), LoginError> {
        match self.lockout.unlock(user_id) {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound(_)) => {
                Err(LoginError::invalid_param(format!("unknown user {user_id}")))
            }
            Err(other) => Err(other.into()),
        }
    }
}
