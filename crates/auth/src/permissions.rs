//! Permission keys and the effective-permission aggregator.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use warden_core::{GrantScope, RoleId, TenantId, UserId};

use crate::roles::{RoleCode, RoleStatus};
use crate::store::{PermissionStore, StoreError};

/// One authorizable action.
///
/// Keys take three shapes: `menu:{menu}`, `{menu}:{operation}` and
/// `{resource}:{interface}`. The wildcard key `"*"` is reserved for
/// super-administrator grants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionKey(Cow<'static, str>);

impl PermissionKey {
    pub const WILDCARD: &'static str = "*";

    pub fn new(key: impl Into<Cow<'static, str>>) -> Self {
        Self(key.into())
    }

    pub fn menu(menu_code: &str) -> Self {
        Self(Cow::Owned(format!("menu:{menu_code}")))
    }

    pub fn operation(menu_code: &str, operation_code: &str) -> Self {
        Self(Cow::Owned(format!("{menu_code}:{operation_code}")))
    }

    pub fn interface(resource_code: &str, interface_code: &str) -> Self {
        Self(Cow::Owned(format!("{resource_code}:{interface_code}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == Self::WILDCARD
    }
}

impl core::fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Roles and permission keys a user holds within one tenant scope.
///
/// Both collections are sets; ordering carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermissions {
    /// Tenant the set was aggregated for (`None`: platform scope).
    pub tenant_id: Option<TenantId>,
    pub role_codes: BTreeSet<RoleCode>,
    pub permission_keys: BTreeSet<PermissionKey>,
}

impl EffectivePermissions {
    pub fn has_role(&self, code: &str) -> bool {
        self.role_codes.iter().any(|r| r.as_str() == code)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.permission_keys.iter().any(|p| p.as_str() == key)
    }

    pub fn has_wildcard(&self) -> bool {
        self.permission_keys.iter().any(PermissionKey::is_wildcard)
    }
}

/// Computes a user's effective roles and permission keys for a tenant.
///
/// Union semantics over every active role assigned under the platform scope or
/// the requested tenant. Every row is scope-checked here even when the store
/// already filtered, so a misbehaving store cannot leak grants across tenants.
#[derive(Clone)]
pub struct PermissionAggregator {
    store: Arc<dyn PermissionStore>,
}

impl PermissionAggregator {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self { store }
    }

    pub fn aggregate(
        &self,
        user_id: UserId,
        tenant_id: Option<TenantId>,
    ) -> Result<EffectivePermissions, StoreError> {
        let scopes = GrantScope::visible_set(tenant_id);
        let visible = |scope: GrantScope| scope.visible_under(tenant_id);

        let mut role_codes = BTreeSet::new();
        let mut role_ids: Vec<RoleId> = Vec::new();
        let mut seen_roles: HashSet<RoleId> = HashSet::new();

        for row in self.store.roles_for_user(user_id, &scopes)? {
            if !visible(row.scope) || row.role_status != RoleStatus::Active {
                continue;
            }
            if seen_roles.insert(row.role_id) {
                role_ids.push(row.role_id);
            }
            role_codes.insert(row.role_code);
        }

        let mut permission_keys = BTreeSet::new();

        if !role_ids.is_empty() {
            let granted_by_active = |role_id: &RoleId| seen_roles.contains(role_id);

            for row in self.store.menus_for_roles(&role_ids, &scopes)? {
                if visible(row.scope) && granted_by_active(&row.role_id) {
                    permission_keys.insert(PermissionKey::menu(&row.menu_code));
                }
            }

            for row in self.store.operations_for_roles(&role_ids, &scopes)? {
                if visible(row.scope) && granted_by_active(&row.role_id) {
                    permission_keys.insert(PermissionKey::operation(
                        &row.menu_code,
                        &row.operation_code,
                    ));
                }
            }

            for row in self.store.interfaces_for_roles(&role_ids, &scopes)? {
                if visible(row.scope)
                    && visible(row.resource_scope)
                    && granted_by_active(&row.role_id)
                {
                    permission_keys.insert(PermissionKey::interface(
                        &row.resource_code,
                        &row.interface_code,
                    ));
                }
            }
        }

        tracing::debug!(
            user_id = %user_id,
            tenant_id = ?tenant_id,
            roles = role_codes.len(),
            permissions = permission_keys.len(),
            "aggregated effective permissions"
        );

        Ok(EffectivePermissions {
            tenant_id,
            role_codes,
            permission_keys,
        })
    }

    /// Distinct codes of the active roles visible under `tenant_id`.
    pub fn role_codes(
        &self,
        user_id: UserId,
        tenant_id: Option<TenantId>,
    ) -> Result<BTreeSet<RoleCode>, StoreError> {
        Ok(self.aggregate(user_id, tenant_id)?.role_codes)
    }

    pub fn permission_keys(
        &self,
        user_id: UserId,
        tenant_id: Option<TenantId>,
    ) -> Result<BTreeSet<PermissionKey>, StoreError> {
        Ok(self.aggregate(user_id, tenant_id)?.permission_keys)
    }
}
