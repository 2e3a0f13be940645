use serde::Serialize;
use thiserror::Error;

use warden_core::{TenantId, UserId};

use crate::permissions::{EffectivePermissions, PermissionKey};

/// A logged-in user bound to the tenant scope their permissions were
/// aggregated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    /// Tenant the request acts in (`None`: platform scope).
    pub active_tenant_id: Option<TenantId>,
    pub permissions: EffectivePermissions,
}

impl Principal {
    pub fn new(
        user_id: UserId,
        active_tenant_id: Option<TenantId>,
        permissions: EffectivePermissions,
    ) -> Self {
        Self {
            user_id,
            active_tenant_id,
            permissions,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Check one permission key against a principal's effective set.
///
/// Pure: no IO, no panics. A permission set aggregated for another tenant
/// than the active one is rejected outright.
pub fn authorize(principal: &Principal, required: &PermissionKey) -> Result<(), AuthzError> {
    if principal.active_tenant_id != principal.permissions.tenant_id {
        return Err(AuthzError::TenantMismatch);
    }

    let perms = &principal.permissions;
    if perms.has_wildcard() || perms.permission_keys.contains(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Why a permission check was granted or denied.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_permission: String,
    pub granted: bool,
    pub reason: String,
    pub user_id: UserId,
    pub active_tenant_id: Option<TenantId>,
    pub permissions_tenant_id: Option<TenantId>,
    pub roles: Vec<String>,
    pub has_wildcard: bool,
    pub denial: Option<DenialKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    TenantMismatch,
    MissingPermission,
}

/// Same decision as [`authorize`], with the reasoning attached.
pub fn explain_authorization(
    principal: &Principal,
    required: &PermissionKey,
) -> AuthorizationExplanation {
    let perms = &principal.permissions;
    let (granted, reason, denial) = match authorize(principal, required) {
        Ok(()) if perms.has_wildcard() => (
            true,
            "principal holds the wildcard permission '*'".to_string(),
            None,
        ),
        Ok(()) => (
            true,
            format!("principal holds '{required}'"),
            None,
        ),
        Err(AuthzError::TenantMismatch) => (
            false,
            format!(
                "permissions were aggregated for tenant {:?} but the request acts in {:?}",
                perms.tenant_id, principal.active_tenant_id
            ),
            Some(DenialKind::TenantMismatch),
        ),
        Err(AuthzError::Forbidden(_)) => (
            false,
            format!(
                "'{required}' is not among the {} keys granted by roles {:?}",
                perms.permission_keys.len(),
                perms.role_codes.iter().map(|r| r.as_str()).collect::<Vec<_>>()
            ),
            Some(DenialKind::MissingPermission),
        ),
    };

    AuthorizationExplanation {
        required_permission: required.as_str().to_string(),
        granted,
        reason,
        user_id: principal.user_id,
        active_tenant_id: principal.active_tenant_id,
        permissions_tenant_id: perms.tenant_id,
        roles: perms.role_codes.iter().map(|r| r.as_str().to_string()).collect(),
        has_wildcard: perms.has_wildcard(),
        denial,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::roles::RoleCode;

    fn principal(tenant: Option<TenantId>, keys: &[&'static str]) -> Principal {
        Principal::new(
            UserId::new(),
            tenant,
            EffectivePermissions {
                tenant_id: tenant,
                role_codes: BTreeSet::from([RoleCode::new("clerk")]),
                permission_keys: keys.iter().map(|k| PermissionKey::new(*k)).collect(),
            },
        )
    }

    #[test]
    fn granted_key_passes() {
        let p = principal(Some(TenantId::new()), &["menu:orders", "orders:export"]);
        assert!(authorize(&p, &PermissionKey::operation("orders", "export")).is_ok());
    }

    #[test]
    fn missing_key_is_forbidden() {
        let p = principal(None, &["menu:orders"]);
        let err = authorize(&p, &PermissionKey::menu("ledger")).unwrap_err();
        assert_eq!(err, AuthzError::Forbidden("menu:ledger".to_string()));
    }

    #[test]
    fn wildcard_grants_everything() {
        let p = principal(None, &["*"]);
        assert!(authorize(&p, &PermissionKey::interface("ledger", "purge")).is_ok());
    }

    #[test]
    fn permissions_from_another_tenant_are_rejected() {
        let mut p = principal(Some(TenantId::new()), &["*"]);
        p.active_tenant_id = Some(TenantId::new());
        assert_eq!(
            authorize(&p, &PermissionKey::menu("orders")),
            Err(AuthzError::TenantMismatch)
        );
    }

    #[test]
    fn explanation_matches_decision() {
        let p = principal(None, &["menu:orders"]);

        let granted = explain_authorization(&p, &PermissionKey::menu("orders"));
        assert!(granted.granted);
        assert!(granted.denial.is_none());

        let denied = explain_authorization(&p, &PermissionKey::menu("ledger"));
        assert!(!denied.granted);
        assert_eq!(denied.denial, Some(DenialKind::MissingPermission));
        assert_eq!(denied.roles, vec!["clerk".to_string()]);
    }
}
