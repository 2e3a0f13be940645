//! Identity resolution: login type + identifier + tenant → identity.

use std::sync::Arc;

use warden_core::{IdentityId, TenantId, UserId};

use crate::login_type::{CodeChannel, IdentityType, LoginType};
use crate::store::{IdentityStore, StoreError};
use crate::user::{Identity, NewIdentity, User, normalize_identifier};

/// Maps a login attempt's identifier to a concrete identity.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
    auto_register_on_sms_login: bool,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn IdentityStore>, auto_register_on_sms_login: bool) -> Self {
        Self {
            store,
            auto_register_on_sms_login,
        }
    }

    /// Resolve the identity a login attempt refers to.
    ///
    /// 1. direct lookup of the login type's identity type under `tenant`;
    /// 2. email-code logins fall back to the email-password identity;
    /// 3. SMS logins may auto-provision a user when configured to.
    ///
    /// `Ok(None)` means the identity does not exist (or is not visible under
    /// `tenant`).
    pub fn resolve(
        &self,
        login_type: LoginType,
        identifier: &str,
        tenant: Option<TenantId>,
    ) -> Result<Option<Identity>, StoreError> {
        if let Some(identity) = self.find_existing(login_type, identifier, tenant)? {
            return Ok(Some(identity));
        }

        // Provisioning precedes code verification: a first login with a
        // wrong code still leaves the new user behind.
        if login_type == LoginType::PhoneSms && self.auto_register_on_sms_login {
            return self.provision_phone(identifier, tenant);
        }

        Ok(None)
    }

    /// Steps 1 and 2 of [`resolve`](Self::resolve), without provisioning.
    pub fn find_existing(
        &self,
        login_type: LoginType,
        identifier: &str,
        tenant: Option<TenantId>,
    ) -> Result<Option<Identity>, StoreError> {
        if let Some(identity) = self.lookup(login_type.identity_type(), identifier, tenant)? {
            return Ok(Some(identity));
        }

        match login_type.fallback_identity_type() {
            Some(fallback) => self.lookup(fallback, identifier, tenant),
            None => Ok(None),
        }
    }

    /// Pick the identity whose credential a password reset overwrites.
    ///
    /// Preference: the password identity matching the verification channel,
    /// then the username/password identity, then any password-bearing one.
    pub fn find_credential_target(
        &self,
        user_id: UserId,
        channel: CodeChannel,
    ) -> Result<Option<Identity>, StoreError> {
        if let Some(identity_type) = channel.password_identity_type() {
            if let Some(identity) = self.store.find_by_user_and_type(user_id, identity_type)? {
                return Ok(Some(identity));
            }
        }

        if let Some(identity) = self
            .store
            .find_by_user_and_type(user_id, IdentityType::UsernamePassword)?
        {
            return Ok(Some(identity));
        }

        let mut candidates: Vec<Identity> = self
            .store
            .find_by_user(user_id)?
            .into_iter()
            .filter(|i| i.identity_type.bears_password())
            .collect();
        candidates.sort_by_key(|i| i.identity_type);
        Ok(candidates.into_iter().next())
    }

    fn lookup(
        &self,
        identity_type: IdentityType,
        identifier: &str,
        tenant: Option<TenantId>,
    ) -> Result<Option<Identity>, StoreError> {
        let identifier = normalize_identifier(identity_type, identifier);
        self.store
            .find_by_type_and_identifier(identity_type, &identifier, tenant)
    }

    /// Create a user plus phone identity for a first-time SMS login.
    ///
    /// The store's uniqueness on `(type, identifier)` arbitrates concurrent
    /// attempts: the loser re-reads and returns the winner's identity.
    fn provision_phone(
        &self,
        identifier: &str,
        tenant: Option<TenantId>,
    ) -> Result<Option<Identity>, StoreError> {
        let user = User::new(UserId::new(), tenant);
        let user_id = user.id;
        let identity = NewIdentity {
            id: IdentityId::new(),
            user_id,
            identity_type: IdentityType::PhoneSms,
            identifier: normalize_identifier(IdentityType::PhoneSms, identifier),
            credential_hash: None,
        };

        match self.store.insert_user_with_identity(user, identity) {
            Ok(identity) => {
                tracing::info!(
                    user_id = %user_id,
                    tenant_id = ?tenant,
                    "auto-registered user on first sms login"
                );
                Ok(Some(identity))
            }
            Err(StoreError::UniqueViolation(detail)) => {
                tracing::debug!(%detail, "phone identity created concurrently; re-reading");
                let existing = self.lookup(IdentityType::PhoneSms, identifier, tenant)?;
                if existing.is_none() {
                    // Registered globally but not visible under this tenant.
                    tracing::warn!(tenant_id = ?tenant, "phone identity exists outside requested tenant");
                }
                Ok(existing)
            }
            Err(other) => Err(other),
        }
    }
}
