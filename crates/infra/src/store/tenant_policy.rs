use std::collections::HashMap;
use std::sync::RwLock;

use warden_auth::{StoreError, TenantPolicyOverride, TenantPolicyStore};
use warden_core::TenantId;

#[derive(Debug, Default)]
struct Directory {
    codes: HashMap<String, TenantId>,
    overrides: HashMap<TenantId, TenantPolicyOverride>,
}

/// In-memory tenant directory with per-tenant policy overrides.
#[derive(Debug, Default)]
pub struct InMemoryTenantPolicyStore {
    inner: RwLock<Directory>,
}

fn poisoned() -> StoreError {
    StoreError::storage("tenant store lock poisoned")
}

impl InMemoryTenantPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tenant under `code`, returning its id.
    pub fn add_tenant(&self, code: &str) -> Result<TenantId, StoreError> {
        let mut dir = self.inner.write().map_err(|_| poisoned())?;
        let code = code.trim().to_string();
        if dir.codes.contains_key(&code) {
            return Err(StoreError::unique_violation(format!("tenant code '{code}'")));
        }
        let id = TenantId::new();
        dir.codes.insert(code, id);
        Ok(id)
    }

    pub fn set_policy(
        &self,
        tenant_id: TenantId,
        policy: TenantPolicyOverride,
    ) -> Result<(), StoreError> {
        let mut dir = self.inner.write().map_err(|_| poisoned())?;
        dir.overrides.insert(tenant_id, policy);
        Ok(())
    }

    pub fn remove_policy(&self, tenant_id: TenantId) -> Result<(), StoreError> {
        let mut dir = self.inner.write().map_err(|_| poisoned())?;
        dir.overrides.remove(&tenant_id);
        Ok(())
    }
}

impl TenantPolicyStore for InMemoryTenantPolicyStore {
    fn find_by_tenant(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<TenantPolicyOverride>, StoreError> {
        let dir = self.inner.read().map_err(|_| poisoned())?;
        Ok(dir.overrides.get(&tenant_id).cloned())
    }

    fn find_tenant_by_code(&self, code: &str) -> Result<Option<TenantId>, StoreError> {
        let dir = self.inner.read().map_err(|_| poisoned())?;
        Ok(dir.codes.get(code.trim()).copied())
    }
}
