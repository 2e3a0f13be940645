//! Login orchestration: the top-level decision for one login attempt.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};

use warden_core::{Clock, TenantId};

use crate::audit::{AuditSink, LoginEvent, LoginOutcome, reason};
use crate::capability::{CodeVerifier, CredentialMatcher};
use crate::config::AuthConfig;
use crate::engine::AuthServices;
use crate::error::LoginError;
use crate::lockout::{Admission, LockoutTracker, LockoutTransition};
use crate::login_type::{CodeScene, CredentialKind, LoginType};
use crate::policy::{AuthPolicy, PolicyResolver};
use crate::resolver::IdentityResolver;
use crate::store::{IdentityStore, StoreError, TenantPolicyStore};
use crate::user::{Identity, User, normalize_identifier};

// ─────────────────────────────────────────────────────────────────────────────
// Request / result
// ─────────────────────────────────────────────────────────────────────────────

/// Tenant named by a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TenantRef {
    /// Platform-scope login; no tenant policy applies.
    #[default]
    Platform,
    Id(TenantId),
    /// Tenant code, resolved through the tenant directory.
    Code(String),
}

/// One login request. Ephemeral; never persisted.
#[derive(Debug)]
pub struct LoginAttempt {
    pub login_type: LoginType,
    pub identifier: String,
    /// Password or one-time code, depending on `login_type`.
    pub secret: SecretString,
    pub tenant: TenantRef,
    pub client_source: String,
    pub client_ip: Option<IpAddr>,
}

impl LoginAttempt {
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
            client_source: String::new(),
            client_ip: None,
        }
    }

    pub fn in_tenant(mut self, tenant: TenantRef) -> Self {
        self.tenant = tenant;
        self
    }

    pub fn from_client(mut self, source: impl Into<String>, ip: Option<IpAddr>) -> Self {
        self.client_source = source.into();
        self.client_ip = ip;
        self
    }
}

/// Successful login: who logged in, with which identity, under which tenant.
///
/// Session or token minting happens in the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResult {
    pub user: User,
    pub identity: Identity,
    pub tenant_id: Option<TenantId>,
    pub login_type: LoginType,
}

/// Resolve a tenant reference to an id. `Platform` is `None`.
pub(crate) fn resolve_tenant(
    tenants: &dyn TenantPolicyStore,
    tenant: &TenantRef,
) -> Result<Option<TenantId>, LoginError> {
    match tenant {
        TenantRef::Platform => Ok(None),
        TenantRef::Id(id) => Ok(Some(*id)),
        TenantRef::Code(code) => {
            let code = code.trim();
            if code.is_empty() {
                return Ok(None);
            }
            tenants
                .find_tenant_by_code(code)?
                .map(Some)
                .ok_or_else(|| LoginError::TenantNotFound(code.to_string()))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────────────────────────────────────

/// Coordinates policy, identity resolution, lockout and credential checks.
///
/// Stateless between calls; all durable state lives in the stores.
#[derive(Clone)]
pub struct LoginOrchestrator {
    policies: PolicyResolver,
    resolver: IdentityResolver,
    lockout: LockoutTracker,
    tenants: Arc<dyn TenantPolicyStore>,
    identities: Arc<dyn IdentityStore>,
    credentials: Arc<dyn CredentialMatcher>,
    codes: Arc<dyn CodeVerifier>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

/// Fields shared by every audit event of one attempt.
struct AttemptContext<'a> {
    attempt: &'a LoginAttempt,
    tenant_id: Option<TenantId>,
    now: DateTime<Utc>,
}

impl LoginOrchestrator {
    pub fn new(config: &AuthConfig, services: &AuthServices) -> Self {
        Self {
            policies: PolicyResolver::new(config.default_policy, services.tenants.clone()),
            resolver: IdentityResolver::new(
                services.identities.clone(),
                config.auto_register_on_sms_login,
            ),
            lockout: LockoutTracker::new(services.identities.clone()),
            tenants: services.tenants.clone(),
            identities: services.identities.clone(),
            credentials: services.credentials.clone(),
            codes: services.codes.clone(),
            audit: services.audit.clone(),
            clock: services.clock.clone(),
        }
    }

    pub fn login(&self, attempt: LoginAttempt) -> Result<LoginResult, LoginError> {
        let login_type = attempt.login_type;
        if attempt.identifier.trim().is_empty() {
            return Err(LoginError::invalid_param("identifier is required"));
        }

        let tenant_id = resolve_tenant(self.tenants.as_ref(), &attempt.tenant)?;
        let policy = self.policies.resolve(tenant_id)?;

        // Before any lookup: a disabled method must not reveal whether the
        // identifier exists.
        if !policy.allows(login_type.policy_flag()) {
            tracing::warn!(%login_type, tenant_id = ?tenant_id, "login method disabled by policy");
            return Err(LoginError::LoginMethodForbidden(login_type));
        }

        let ctx = AttemptContext {
            attempt: &attempt,
            tenant_id,
            now: self.clock.now(),
        };

        let Some(mut identity) = self
            .resolver
            .resolve(login_type, &attempt.identifier, tenant_id)?
        else {
            tracing::warn!(%login_type, tenant_id = ?tenant_id, "login for unknown identity");
            self.audit_failure(&ctx, None, None, reason::IDENTITY_NOT_FOUND);
            return Err(LoginError::IdentityNotFound);
        };

        let mut user = self
            .identities
            .find_user(identity.user_id)?
            .ok_or_else(|| StoreError::not_found(format!("owner of identity {}", identity.id)))?;

        if !identity.is_enabled() {
            return Err(LoginError::IdentityDisabled);
        }
        if !user.is_active() {
            return Err(LoginError::UserDisabled);
        }

        // Mandatory immediately before the credential check.
        if let Admission::Reject { until } = self.lockout.check_admission(&user, ctx.now) {
            tracing::warn!(user_id = %user.id, %until, "login rejected: user locked");
            self.audit_failure(&ctx, Some(&user), Some(&identity), reason::USER_LOCKED);
            return Err(LoginError::UserLocked { until });
        }

        self.verify_credential(&ctx, &policy, &user, &identity)?;

        self.lockout.record_success(user.id)?;
        self.identities
            .update_last_login(identity.id, ctx.now, attempt.client_ip)?;

        user.lockout.register_success();
        user.last_login_at = Some(ctx.now);
        user.last_login_ip = attempt.client_ip;
        identity.last_login_at = Some(ctx.now);
        identity.last_login_ip = attempt.client_ip;

        self.audit(&ctx, LoginOutcome::Success, Some(&user), Some(&identity), None);
        tracing::info!(user_id = %user.id, %login_type, tenant_id = ?tenant_id, "login succeeded");

        Ok(LoginResult {
            user,
            identity,
            tenant_id,
            login_type,
        })
    }

    fn verify_credential(
        &self,
        ctx: &AttemptContext<'_>,
        policy: &AuthPolicy,
        user: &User,
        identity: &Identity,
    ) -> Result<(), LoginError> {
        let attempt = ctx.attempt;
        let secret = attempt.secret.expose_secret();

        match attempt.login_type.credential_kind() {
            CredentialKind::Password => {
                if secret.trim().is_empty() {
                    return Err(LoginError::invalid_param("password is required"));
                }

                let matched = match identity.credential_hash.as_deref() {
                    Some(hash) if !hash.is_empty() => self.credentials.matches(secret, hash)?,
                    _ => false,
                };
                if matched {
                    return Ok(());
                }

                let transition = self.lockout.record_failure(user.id, policy, ctx.now)?;
                if let LockoutTransition::Counted { fail_count } = transition {
                    tracing::warn!(user_id = %user.id, fail_count, "wrong password");
                }
                self.audit_failure(ctx, Some(user), Some(identity), reason::PASSWORD_ERROR);
                Err(LoginError::PasswordError)
            }
            CredentialKind::Code(_) => {
                let identifier =
                    normalize_identifier(attempt.login_type.identity_type(), &attempt.identifier);
                let valid = !secret.trim().is_empty()
                    && self
                        .codes
                        .verify(&identifier, CodeScene::Login, secret.trim())?;
                if valid {
                    return Ok(());
                }

                // Code failures do not feed the failure counter.
                self.audit_failure(ctx, Some(user), Some(identity), reason::CODE_INVALID);
                Err(LoginError::CodeInvalid)
            }
            CredentialKind::External => {
                self.audit_failure(ctx, Some(user), Some(identity), reason::METHOD_NOT_SUPPORTED);
                Err(LoginError::LoginMethodNotSupported(attempt.login_type))
            }
        }
    }

    fn audit_failure(
        &self,
        ctx: &AttemptContext<'_>,
        user: Option<&User>,
        identity: Option<&Identity>,
        why: &str,
    ) {
        self.audit(ctx, LoginOutcome::Failure, user, identity, Some(why));
    }

    fn audit(
        &self,
        ctx: &AttemptContext<'_>,
        outcome: LoginOutcome,
        user: Option<&User>,
        identity: Option<&Identity>,
        why: Option<&str>,
    ) {
        let event = LoginEvent {
            outcome,
            user_id: user.map(|u| u.id),
            tenant_id: ctx.tenant_id,
            identity_id: identity.map(|i| i.id),
            login_type: ctx.attempt.login_type,
            identifier: ctx.attempt.identifier.trim().to_string(),
            client_source: ctx.attempt.client_source.clone(),
            client_ip: ctx.attempt.client_ip,
            reason: why.map(str::to_string),
            occurred_at: ctx.now,
        };

        if let Err(err) = self.audit.record_login_event(event) {
            tracing::warn!(error = %err, "dropping login audit event");
        }
    }
}
