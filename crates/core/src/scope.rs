//! Tenant scoping of grants and resources.

use serde::{Deserialize, Serialize};

use crate::id::TenantId;

/// The scope a grant row (or a data resource) is defined under.
///
/// `Platform` rows are visible under every tenant; `Tenant(t)` rows only when
/// resolving for `t`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "tenant_id")]
pub enum GrantScope {
    Platform,
    Tenant(TenantId),
}

impl GrantScope {
    /// Whether a row with this scope is visible when resolving for `tenant`.
    ///
    /// A `None` tenant is a platform-scope request: only platform rows apply.
    pub fn visible_under(self, tenant: Option<TenantId>) -> bool {
        match self {
            GrantScope::Platform => true,
            GrantScope::Tenant(owner) => tenant == Some(owner),
        }
    }

    /// The scopes visible when resolving for `tenant`, platform first.
    pub fn visible_set(tenant: Option<TenantId>) -> Vec<GrantScope> {
        match tenant {
            Some(t) => vec![GrantScope::Platform, GrantScope::Tenant(t)],
            None => vec![GrantScope::Platform],
        }
    }

    pub fn tenant_id(self) -> Option<TenantId> {
        match self {
            GrantScope::Platform => None,
            GrantScope::Tenant(t) => Some(t),
        }
    }
}

impl From<Option<TenantId>> for GrantScope {
    fn from(value: Option<TenantId>) -> Self {
        value.map_or(GrantScope::Platform, GrantScope::Tenant)
    }
}

impl core::fmt::Display for GrantScope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GrantScope::Platform => f.write_str("platform"),
            GrantScope::Tenant(t) => write!(f, "tenant:{t}"),
        }
    }
}
