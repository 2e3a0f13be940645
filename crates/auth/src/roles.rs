use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role code used for RBAC (e.g. `tenant_admin`).
///
/// Codes are opaque strings at this layer; what a role grants comes from the
/// grant graph, not from the code itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleCode(Cow<'static, str>);

impl RoleCode {
    pub fn new(code: impl Into<Cow<'static, str>>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RoleCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role lifecycle status. Only active roles contribute permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RoleStatus {
    #[default]
    Active,
    Disabled,
}
