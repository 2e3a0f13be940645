//! Storage contracts consumed by the engine.
//!
//! These are capability traits with no storage assumptions: in-memory
//! implementations back tests, SQL or RPC implementations back production.
//!
//! ## Atomicity requirements
//!
//! - `IdentityStore::modify_lockout` must apply the closure inside one
//!   transaction (or under one lock) so two concurrent failures for the same
//!   user both land.
//! - `(identity_type, identifier)` must be unique; a violating insert returns
//!   [`StoreError::UniqueViolation`], never a generic storage error.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_core::{GrantScope, IdentityId, RoleId, TenantId, UserId};

use crate::lockout::LockoutState;
use crate::login_type::IdentityType;
use crate::policy::TenantPolicyOverride;
use crate::roles::{RoleCode, RoleStatus};
use crate::user::{Identity, NewIdentity, User};

/// Store operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn unique_violation(msg: impl Into<String>) -> Self {
        Self::UniqueViolation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Identities and users
// ─────────────────────────────────────────────────────────────────────────────

/// Users and their login identities.
pub trait IdentityStore: Send + Sync {
    /// Look up an identity visible under `tenant` (`None`: global lookup).
    fn find_by_type_and_identifier(
        &self,
        identity_type: IdentityType,
        identifier: &str,
        tenant: Option<TenantId>,
    ) -> Result<Option<Identity>, StoreError>;

    fn find_by_user_and_type(
        &self,
        user_id: UserId,
        identity_type: IdentityType,
    ) -> Result<Option<Identity>, StoreError>;

    fn find_by_user(&self, user_id: UserId) -> Result<Vec<Identity>, StoreError>;

    fn find_user(&self, user_id: UserId) -> Result<Option<User>, StoreError>;

    /// Attach a new identity to an existing user.
    fn insert_identity(&self, identity: NewIdentity) -> Result<Identity, StoreError>;

    /// Create a user together with its first identity, atomically.
    fn insert_user_with_identity(
        &self,
        user: User,
        identity: NewIdentity,
    ) -> Result<Identity, StoreError>;

    fn update_credential(
        &self,
        identity_id: IdentityId,
        credential_hash: &str,
    ) -> Result<(), StoreError>;

    /// Stamp the identity and its user with the login time and address.
    fn update_last_login(
        &self,
        identity_id: IdentityId,
        at: DateTime<Utc>,
        ip: Option<IpAddr>,
    ) -> Result<(), StoreError>;

    fn count_by_type_and_identifier(
        &self,
        identity_type: IdentityType,
        identifier: &str,
    ) -> Result<u64, StoreError>;

    /// Atomically read, modify and write a user's lockout fields.
    ///
    /// Returns the state after `apply` ran, or `NotFound` for an unknown user.
    fn modify_lockout(
        &self,
        user_id: UserId,
        apply: &mut dyn FnMut(&mut LockoutState),
    ) -> Result<LockoutState, StoreError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tenants
// ─────────────────────────────────────────────────────────────────────────────

/// Tenant directory and per-tenant policy records.
pub trait TenantPolicyStore: Send + Sync {
    fn find_by_tenant(&self, tenant_id: TenantId)
    -> Result<Option<TenantPolicyOverride>, StoreError>;

    fn find_tenant_by_code(&self, code: &str) -> Result<Option<TenantId>, StoreError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Grant graph
// ─────────────────────────────────────────────────────────────────────────────

/// A role assigned to a user, as seen through one assignment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignmentRow {
    pub role_id: RoleId,
    pub role_code: RoleCode,
    pub role_status: RoleStatus,
    /// Scope of the user→role assignment row.
    pub scope: GrantScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuGrantRow {
    pub role_id: RoleId,
    pub menu_code: String,
    pub scope: GrantScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationGrantRow {
    pub role_id: RoleId,
    pub menu_code: String,
    pub operation_code: String,
    pub scope: GrantScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceGrantRow {
    pub role_id: RoleId,
    pub resource_code: String,
    pub interface_code: String,
    /// Tenant owning the data resource itself.
    pub resource_scope: GrantScope,
    /// Scope of the role→interface grant row.
    pub scope: GrantScope,
}

/// Read-only queries over the role grant graph.
///
/// Every query receives the scopes visible to the request; implementations
/// should filter by them, and the aggregator filters again regardless.
pub trait PermissionStore: Send + Sync {
    fn roles_for_user(
        &self,
        user_id: UserId,
        scopes: &[GrantScope],
    ) -> Result<Vec<RoleAssignmentRow>, StoreError>;

    fn menus_for_roles(
        &self,
        role_ids: &[RoleId],
        scopes: &[GrantScope],
    ) -> Result<Vec<MenuGrantRow>, StoreError>;

    fn operations_for_roles(
        &self,
        role_ids: &[RoleId],
        scopes: &[GrantScope],
    ) -> Result<Vec<OperationGrantRow>, StoreError>;

    fn interfaces_for_roles(
        &self,
        role_ids: &[RoleId],
        scopes: &[GrantScope],
    ) -> Result<Vec<InterfaceGrantRow>, StoreError>;
}
