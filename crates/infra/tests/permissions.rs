mod common;

use std::collections::BTreeSet;

use warden_auth::{
    AuthzError, IdentityType, LoginAttempt, LoginType, PermissionKey, RoleStatus, TenantRef,
    explain_authorization,
};
use warden_core::{GrantScope, TenantId, UserId};
use warden_infra::InMemoryPermissionStore;

use common::default_harness;

fn keys(effective: &BTreeSet<PermissionKey>) -> Vec<&str> {
    effective.iter().map(PermissionKey::as_str).collect()
}

/// Two roles under the platform scope plus one under tenant `t1`.
fn seeded(store: &InMemoryPermissionStore, user: UserId, t1: TenantId) {
    let viewer = store.add_role("viewer", RoleStatus::Active).unwrap();
    let clerk = store.add_role("clerk", RoleStatus::Active).unwrap();
    let t1_admin = store.add_role("t1_admin", RoleStatus::Active).unwrap();

    store.assign_role(user, viewer, GrantScope::Platform).unwrap();
    store.assign_role(user, clerk, GrantScope::Platform).unwrap();
    store.assign_role(user, t1_admin, GrantScope::Tenant(t1)).unwrap();

    store.grant_menu(viewer, "dashboard", GrantScope::Platform).unwrap();
    store.grant_menu(clerk, "dashboard", GrantScope::Platform).unwrap();
    store.grant_menu(clerk, "orders", GrantScope::Platform).unwrap();
    store
        .grant_operation(clerk, "orders", "create", GrantScope::Platform)
        .unwrap();
    store.grant_menu(t1_admin, "settings", GrantScope::Tenant(t1)).unwrap();

    store.add_resource("catalog", GrantScope::Platform).unwrap();
    store.add_resource("ledger", GrantScope::Tenant(t1)).unwrap();
    store
        .grant_interface(viewer, "catalog", "list", GrantScope::Platform)
        .unwrap();
    // Platform-scoped grant onto a tenant-owned resource.
    store
        .grant_interface(viewer, "ledger", "read", GrantScope::Platform)
        .unwrap();
}

#[test]
fn platform_scope_sees_only_platform_grants() {
    let h = default_harness();
    let user = UserId::new();
    let t1 = TenantId::new();
    seeded(&h.backend.permissions, user, t1);

    let effective = h.engine.aggregate_permissions(user, None).unwrap();

    assert_eq!(
        effective.role_codes.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
        vec!["clerk", "viewer"]
    );
    assert_eq!(
        keys(&effective.permission_keys),
        vec!["catalog:list", "menu:dashboard", "menu:orders", "orders:create"]
    );
}

#[test]
fn tenant_scope_is_the_union_of_platform_and_tenant_grants() {
    let h = default_harness();
    let user = UserId::new();
    let t1 = TenantId::new();
    seeded(&h.backend.permissions, user, t1);

    let effective = h.engine.aggregate_permissions(user, Some(t1)).unwrap();

    assert!(effective.has_role("t1_admin"));
    assert_eq!(
        keys(&effective.permission_keys),
        vec![
            "catalog:list",
            "ledger:read",
            "menu:dashboard",
            "menu:orders",
            "menu:settings",
            "orders:create",
        ]
    );
}

#[test]
fn grants_on_another_tenants_resources_never_leak() {
    let h = default_harness();
    let user = UserId::new();
    let t1 = TenantId::new();
    let t2 = TenantId::new();
    seeded(&h.backend.permissions, user, t1);

    let effective = h.engine.aggregate_permissions(user, Some(t2)).unwrap();

    assert!(!effective.has_role("t1_admin"));
    assert!(!effective.contains("ledger:read"));
    assert!(!effective.contains("menu:settings"));
    assert!(effective.contains("catalog:list"));
}

#[test]
fn revoking_a_grant_under_another_tenant_keeps_the_platform_grant() {
    let h = default_harness();
    let store = &h.backend.permissions;
    let user = UserId::new();
    let t = TenantId::new();
    let t2 = TenantId::new();

    let role_a = store.add_role("branch_clerk", RoleStatus::Active).unwrap();
    let role_b = store.add_role("reader", RoleStatus::Active).unwrap();
    store.assign_role(user, role_a, GrantScope::Tenant(t)).unwrap();
    store.assign_role(user, role_b, GrantScope::Platform).unwrap();
    store.grant_menu(role_a, "m1", GrantScope::Tenant(t)).unwrap();
    store.grant_menu(role_b, "m2", GrantScope::Platform).unwrap();
    store.grant_menu(role_b, "m2", GrantScope::Tenant(t2)).unwrap();

    let before = h.engine.aggregate_permissions(user, Some(t)).unwrap();
    assert_eq!(keys(&before.permission_keys), vec!["menu:m1", "menu:m2"]);

    assert_eq!(store.revoke_menu(role_b, "m2", GrantScope::Tenant(t2)).unwrap(), 1);

    let after = h.engine.aggregate_permissions(user, Some(t)).unwrap();
    assert_eq!(keys(&after.permission_keys), vec!["menu:m1", "menu:m2"]);
    assert!(h.engine.aggregate_permissions(user, None).unwrap().contains("menu:m2"));
}

#[test]
fn disabling_a_role_withdraws_its_grants() {
    let h = default_harness();
    let store = &h.backend.permissions;
    let user = UserId::new();
    let auditor = store.add_role("auditor", RoleStatus::Active).unwrap();
    store.assign_role(user, auditor, GrantScope::Platform).unwrap();
    store.grant_menu(auditor, "audit", GrantScope::Platform).unwrap();

    assert!(h.engine.aggregate_permissions(user, None).unwrap().contains("menu:audit"));

    store.set_role_status(auditor, RoleStatus::Disabled).unwrap();
    let effective = h.engine.aggregate_permissions(user, None).unwrap();
    assert!(effective.role_codes.is_empty());
    assert!(effective.permission_keys.is_empty());
}

#[test]
fn logged_in_principal_is_authorized_against_its_tenant() {
    let h = default_harness();
    let acme = h.backend.tenants.add_tenant("acme").unwrap();
    let identity = h
        .backend
        .seed_user(IdentityType::UsernamePassword, "tess", Some("pw"), Some(acme))
        .unwrap();
    seeded(&h.backend.permissions, identity.user_id, acme);

    let (result, principal) = h
        .engine
        .login_principal(
            LoginAttempt::new(LoginType::UsernamePassword, "tess", "pw")
                .in_tenant(TenantRef::Code("acme".to_string())),
        )
        .unwrap();

    assert_eq!(result.tenant_id, Some(acme));
    assert!(h.engine.authorize(&principal, &PermissionKey::menu("settings")).is_ok());
    assert!(
        h.engine
            .authorize(&principal, &PermissionKey::interface("ledger", "read"))
            .is_ok()
    );
    assert_eq!(
        h.engine.authorize(&principal, &PermissionKey::operation("orders", "delete")),
        Err(AuthzError::Forbidden("orders:delete".to_string()))
    );

    let mut elsewhere = principal.clone();
    elsewhere.active_tenant_id = Some(TenantId::new());
    assert_eq!(
        h.engine.authorize(&elsewhere, &PermissionKey::menu("settings")),
        Err(AuthzError::TenantMismatch)
    );
    assert!(!explain_authorization(&elsewhere, &PermissionKey::menu("settings")).granted);
}
