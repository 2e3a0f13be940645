//! Tenant authentication policy and its resolution.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use warden_core::TenantId;

use crate::login_type::MethodFlag;
use crate::store::{StoreError, TenantPolicyStore};

/// Effective login policy for one tenant.
///
/// Recomputed for every login and code-send; never cached, since tenant
/// administrators may change it at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPolicy {
    pub password_login_enabled: bool,
    pub sms_login_enabled: bool,
    pub email_login_enabled: bool,
    pub wechat_login_enabled: bool,
    /// Consecutive failures that lock the user; `0` disables lockout.
    pub fail_threshold: u32,
    pub lock_minutes: u32,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            password_login_enabled: true,
            sms_login_enabled: true,
            email_login_enabled: true,
            wechat_login_enabled: false,
            fail_threshold: 5,
            lock_minutes: 15,
        }
    }
}

impl AuthPolicy {
    pub fn allows(&self, flag: MethodFlag) -> bool {
        match flag {
            MethodFlag::Password => self.password_login_enabled,
            MethodFlag::Sms => self.sms_login_enabled,
            MethodFlag::Email => self.email_login_enabled,
            MethodFlag::Wechat => self.wechat_login_enabled,
        }
    }

    pub fn lockout_enabled(&self) -> bool {
        self.fail_threshold > 0
    }

    /// Apply a tenant override: every `Some` field replaces the default.
    pub fn merged_with(self, tenant: &TenantPolicyOverride) -> Self {
        Self {
            password_login_enabled: tenant
                .password_login_enabled
                .unwrap_or(self.password_login_enabled),
            sms_login_enabled: tenant.sms_login_enabled.unwrap_or(self.sms_login_enabled),
            email_login_enabled: tenant.email_login_enabled.unwrap_or(self.email_login_enabled),
            wechat_login_enabled: tenant
                .wechat_login_enabled
                .unwrap_or(self.wechat_login_enabled),
            fail_threshold: tenant.fail_threshold.unwrap_or(self.fail_threshold),
            lock_minutes: tenant.lock_minutes.unwrap_or(self.lock_minutes),
        }
    }
}

/// Per-tenant policy record. Absent fields inherit the platform default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantPolicyOverride {
    pub password_login_enabled: Option<bool>,
    pub sms_login_enabled: Option<bool>,
    pub email_login_enabled: Option<bool>,
    pub wechat_login_enabled: Option<bool>,
    pub fail_threshold: Option<u32>,
    pub lock_minutes: Option<u32>,
}

/// Resolves the effective [`AuthPolicy`] for a tenant.
#[derive(Clone)]
pub struct PolicyResolver {
    defaults: AuthPolicy,
    store: Arc<dyn TenantPolicyStore>,
}

impl PolicyResolver {
    pub fn new(defaults: AuthPolicy, store: Arc<dyn TenantPolicyStore>) -> Self {
        Self { defaults, store }
    }

    pub fn defaults(&self) -> &AuthPolicy {
        &self.defaults
    }

    /// Platform defaults for `None`; defaults merged with the tenant's
    /// override otherwise. A tenant without a record gets the defaults.
    ///
    /// Store failures propagate: a tenant that disabled a method must not have
    /// it re-enabled by an outage.
    pub fn resolve(&self, tenant_id: Option<TenantId>) -> Result<AuthPolicy, StoreError> {
        let Some(tenant_id) = tenant_id else {
            return Ok(self.defaults);
        };

        let policy = match self.store.find_by_tenant(tenant_id)? {
            Some(tenant_override) => self.defaults.merged_with(&tenant_override),
            None => self.defaults,
        };

        tracing::trace!(%tenant_id, ?policy, "resolved tenant policy");
        Ok(policy)
    }
}
