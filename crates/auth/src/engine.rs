//! `AuthEngine`: the single entry point callers wire up and hold on to.

use std::sync::Arc;

use secrecy::SecretString;

use warden_core::{Clock, TenantId, UserId};

use crate::account::{AccountService, RegistrationRequest};
use crate::audit::AuditSink;
use crate::authorize::{AuthzError, Principal, authorize};
use crate::capability::{CodeVerifier, CredentialMatcher};
use crate::config::AuthConfig;
use crate::error::LoginError;
use crate::login::{LoginAttempt, LoginOrchestrator, LoginResult, TenantRef};
use crate::login_type::{CodeChannel, CodeScene};
use crate::permissions::{EffectivePermissions, PermissionAggregator, PermissionKey};
use crate::store::{IdentityStore, PermissionStore, TenantPolicyStore};
use crate::user::Identity;

/// Stores and collaborators the engine is built from.
#[derive(Clone)]
pub struct AuthServices {
    pub identities: Arc<dyn IdentityStore>,
    pub tenants: Arc<dyn TenantPolicyStore>,
    pub permissions: Arc<dyn PermissionStore>,
    pub credentials: Arc<dyn CredentialMatcher>,
    pub codes: Arc<dyn CodeVerifier>,
    pub audit: Arc<dyn AuditSink>,
    pub clock: Arc<dyn Clock>,
}

/// Cheap to clone; safe to share across threads.
#[derive(Clone)]
pub struct AuthEngine {
    config: AuthConfig,
    login: LoginOrchestrator,
    accounts: AccountService,
    aggregator: PermissionAggregator,
}

impl AuthEngine {
    pub fn new(config: AuthConfig, services: AuthServices) -> Self {
        Self {
            login: LoginOrchestrator::new(&config, &services),
            accounts: AccountService::new(&config, &services),
            aggregator: PermissionAggregator::new(services.permissions.clone()),
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn login(&self, attempt: LoginAttempt) -> Result<LoginResult, LoginError> {
        self.login.login(attempt)
    }

    pub fn aggregate_permissions(
        &self,
        user_id: UserId,
        tenant_id: Option<TenantId>,
    ) -> Result<EffectivePermissions, LoginError> {
        Ok(self.aggregator.aggregate(user_id, tenant_id)?)
    }

    /// Log in and aggregate the permissions of the resulting user in one call.
    pub fn login_principal(
        &self,
        attempt: LoginAttempt,
    ) -> Result<(LoginResult, Principal), LoginError> {
        let result = self.login(attempt)?;
        let permissions = self.aggregate_permissions(result.user.id, result.tenant_id)?;
        let principal = Principal::new(result.user.id, result.tenant_id, permissions);
        Ok((result, principal))
    }

    pub fn send_code(
        &self,
        channel: CodeChannel,
        identifier: &str,
        scene: CodeScene,
        tenant: &TenantRef,
    ) -> Result<(), LoginError> {
        self.accounts.send_code(channel, identifier, scene, tenant)
    }

    pub fn reset_password(
        &self,
        channel: CodeChannel,
        identifier: &str,
        code: &str,
        new_secret: &SecretString,
        tenant: &TenantRef,
    ) -> Result<(), LoginError> {
        self.accounts
            .reset_password(channel, identifier, code, new_secret, tenant)
    }

    pub fn register(&self, request: RegistrationRequest) -> Result<Identity, LoginError> {
        self.accounts.register(request)
    }

    pub fn unlock_user(&self, user_id: UserId) -> Result<(), LoginError> {
        self.accounts.unlock_user(user_id)
    }

    pub fn authorize(
        &self,
        principal: &Principal,
        required: &PermissionKey,
    ) -> Result<(), AuthzError> {
        authorize(principal, required)
    }
}
