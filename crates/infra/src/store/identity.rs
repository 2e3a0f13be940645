use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use warden_auth::{
    Identity, IdentityStatus, IdentityStore, IdentityType, LockoutState, NewIdentity, StoreError,
    User, UserStatus,
};
use warden_core::{IdentityId, TenantId, UserId};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    identities: HashMap<IdentityId, Identity>,
    /// Unique index on `(identity_type, identifier)`.
    by_key: HashMap<(IdentityType, String), IdentityId>,
    /// Tenants a user belongs to besides its primary tenant.
    memberships: HashMap<UserId, HashSet<TenantId>>,
}

impl Tables {
    fn visible_under(&self, user_id: UserId, tenant: Option<TenantId>) -> bool {
        let Some(tenant) = tenant else {
            return true;
        };
        let primary = self
            .users
            .get(&user_id)
            .and_then(|u| u.primary_tenant_id);
        primary == Some(tenant)
            || self
                .memberships
                .get(&user_id)
                .is_some_and(|m| m.contains(&tenant))
    }

    fn check_unique(&self, identity: &NewIdentity) -> Result<(), StoreError> {
        let key = (identity.identity_type, identity.identifier.clone());
        if self.by_key.contains_key(&key) {
            return Err(StoreError::unique_violation(format!(
                "{} '{}' already exists",
                identity.identity_type, identity.identifier
            )));
        }
        if self.identities.contains_key(&identity.id) {
            return Err(StoreError::unique_violation(format!(
                "identity id {} already exists",
                identity.id
            )));
        }
        Ok(())
    }

    fn insert_unchecked(&mut self, identity: NewIdentity) -> Identity {
        let identity = identity.into_identity();
        self.by_key.insert(
            (identity.identity_type, identity.identifier.clone()),
            identity.id,
        );
        self.identities.insert(identity.id, identity.clone());
        identity
    }
}

/// In-memory user and identity store.
///
/// Intended for tests/dev. One write lock guards every table, so inserts and
/// lockout updates are atomic.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    inner: RwLock<Tables>,
}

fn poisoned() -> StoreError {
    StoreError::storage("identity store lock poisoned")
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user without any identity (seeding).
    pub fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| poisoned())?;
        if tables.users.contains_key(&user.id) {
            return Err(StoreError::unique_violation(format!("user {} already exists", user.id)));
        }
        tables.users.insert(user.id, user);
        Ok(())
    }

    /// Make `user_id` visible under `tenant_id` in addition to its primary tenant.
    pub fn add_membership(&self, user_id: UserId, tenant_id: TenantId) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| poisoned())?;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::not_found(format!("user {user_id}")));
        }
        tables.memberships.entry(user_id).or_default().insert(tenant_id);
        Ok(())
    }

    pub fn set_user_status(&self, user_id: UserId, status: UserStatus) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| poisoned())?;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::not_found(format!("user {user_id}")))?;
        user.status = status;
        Ok(())
    }

    pub fn set_identity_status(
        &self,
        identity_id: IdentityId,
        status: IdentityStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| poisoned())?;
        let identity = tables
            .identities
            .get_mut(&identity_id)
            .ok_or_else(|| StoreError::not_found(format!("identity {identity_id}")))?;
        identity.status = status;
        Ok(())
    }

    pub fn user_count(&self) -> usize {
        self.inner.read().map(|t| t.users.len()).unwrap_or(0)
    }

    pub fn identity_count(&self) -> usize {
        self.inner.read().map(|t| t.identities.len()).unwrap_or(0)
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn find_by_type_and_identifier(
        &self,
        identity_type: IdentityType,
        identifier: &str,
        tenant: Option<TenantId>,
    ) -> Result<Option<Identity>, StoreError> {
        let tables = self.inner.read().map_err(|_| poisoned())?;
        let found = tables
            .by_key
            .get(&(identity_type, identifier.to_string()))
            .and_then(|id| tables.identities.get(id))
            .filter(|identity| tables.visible_under(identity.user_id, tenant))
            .cloned();
        Ok(found)
    }

    fn find_by_user_and_type(
        &self,
        user_id: UserId,
        identity_type: IdentityType,
    ) -> Result<Option<Identity>, StoreError> {
        let tables = self.inner.read().map_err(|_| poisoned())?;
        Ok(tables
            .identities
            .values()
            .find(|i| i.user_id == user_id && i.identity_type == identity_type)
            .cloned())
    }

    fn find_by_user(&self, user_id: UserId) -> Result<Vec<Identity>, StoreError> {
        let tables = self.inner.read().map_err(|_| poisoned())?;
        Ok(tables
            .identities
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect())
    }

    fn find_user(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        let tables = self.inner.read().map_err(|_| poisoned())?;
        Ok(tables.users.get(&user_id).cloned())
    }

    fn insert_identity(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        let mut tables = self.inner.write().map_err(|_| poisoned())?;
        if !tables.users.contains_key(&identity.user_id) {
            return Err(StoreError::not_found(format!("user {}", identity.user_id)));
        }
        tables.check_unique(&identity)?;
        Ok(tables.insert_unchecked(identity))
    }

    fn insert_user_with_identity(
        &self,
        user: User,
        identity: NewIdentity,
    ) -> Result<Identity, StoreError> {
        if identity.user_id != user.id {
            return Err(StoreError::storage(format!(
                "identity {} does not belong to user {}",
                identity.id, user.id
            )));
        }

        let mut tables = self.inner.write().map_err(|_| poisoned())?;
        if tables.users.contains_key(&user.id) {
            return Err(StoreError::unique_violation(format!("user {} already exists", user.id)));
        }
        tables.check_unique(&identity)?;

        tables.users.insert(user.id, user);
        Ok(tables.insert_unchecked(identity))
    }

    fn update_credential(
        &self,
        identity_id: IdentityId,
        credential_hash: &str,
    ) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| poisoned())?;
        let identity = tables
            .identities
            .get_mut(&identity_id)
            .ok_or_else(|| StoreError::not_found(format!("identity {identity_id}")))?;
        identity.credential_hash = Some(credential_hash.to_string());
        Ok(())
    }

    fn update_last_login(
        &self,
        identity_id: IdentityId,
        at: DateTime<Utc>,
        ip: Option<IpAddr>,
    ) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| poisoned())?;
        let identity = tables
            .identities
            .get_mut(&identity_id)
            .ok_or_else(|| StoreError::not_found(format!("identity {identity_id}")))?;
        identity.last_login_at = Some(at);
        identity.last_login_ip = ip;
        let user_id = identity.user_id;

        if let Some(user) = tables.users.get_mut(&user_id) {
            user.last_login_at = Some(at);
            user.last_login_ip = ip;
        }
        Ok(())
    }

    fn count_by_type_and_identifier(
        &self,
        identity_type: IdentityType,
        identifier: &str,
    ) -> Result<u64, StoreError> {
        let tables = self.inner.read().map_err(|_| poisoned())?;
        let exists = tables
            .by_key
            .contains_key(&(identity_type, identifier.to_string()));
        Ok(u64::from(exists))
    }

    fn modify_lockout(
        &self,
        user_id: UserId,
        apply: &mut dyn FnMut(&mut LockoutState),
    ) -> Result<LockoutState, StoreError> {
        let mut tables = self.inner.write().map_err(|_| poisoned())?;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::not_found(format!("user {user_id}")))?;
        apply(&mut user.lockout);
        Ok(user.lockout)
    }
}
