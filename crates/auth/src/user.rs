//! User and login-identity records as the engine sees them.
//!
//! Both are owned by the identity store; the engine reads them per attempt and
//! writes back only through the narrow store operations.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{IdentityId, TenantId, UserId};

use crate::lockout::LockoutState;
use crate::login_type::IdentityType;

// ─────────────────────────────────────────────────────────────────────────────
// Statuses
// ─────────────────────────────────────────────────────────────────────────────

/// User account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UserStatus {
    /// User can authenticate.
    #[default]
    Active,
    /// User cannot authenticate with any identity.
    Disabled,
}

/// Identity status. Identities are soft-disabled, never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IdentityStatus {
    #[default]
    Enabled,
    Disabled,
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UserStatus::Active => write!(f, "Active"),
            UserStatus::Disabled => write!(f, "Disabled"),
        }
    }
}

impl core::fmt::Display for IdentityStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            IdentityStatus::Enabled => write!(f, "Enabled"),
            IdentityStatus::Disabled => write!(f, "Disabled"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// A user account.
///
/// # Invariants
/// - `lockout.fail_count` is reset on every successful authentication and
///   every credential reset.
/// - A `lockout.lock_until` in the future blocks authentication regardless of
///   credential correctness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub status: UserStatus,
    pub primary_tenant_id: Option<TenantId>,
    pub lockout: LockoutState,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<IpAddr>,
}

impl User {
    pub fn new(id: UserId, primary_tenant_id: Option<TenantId>) -> Self {
        Self {
            id,
            status: UserStatus::Active,
            primary_tenant_id,
            lockout: LockoutState::default(),
            last_login_at: None,
            last_login_ip: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// One authentication factor bound to exactly one user.
///
/// `(identity_type, identifier)` is globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub user_id: UserId,
    pub identity_type: IdentityType,
    pub identifier: String,
    /// `None` for code-only identities (e.g. auto-provisioned phones).
    pub credential_hash: Option<String>,
    pub status: IdentityStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<IpAddr>,
}

impl Identity {
    pub fn is_enabled(&self) -> bool {
        self.status == IdentityStatus::Enabled
    }

    pub fn has_credential(&self) -> bool {
        self.credential_hash.as_deref().is_some_and(|h| !h.is_empty())
    }
}

/// Identity to insert. The store assigns nothing; ids are chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    pub id: IdentityId,
    pub user_id: UserId,
    pub identity_type: IdentityType,
    pub identifier: String,
    pub credential_hash: Option<String>,
}

impl NewIdentity {
    pub fn into_identity(self) -> Identity {
        Identity {
            id: self.id,
            user_id: self.user_id,
            identity_type: self.identity_type,
            identifier: self.identifier,
            credential_hash: self.credential_hash,
            status: IdentityStatus::Enabled,
            last_login_at: None,
            last_login_ip: None,
        }
    }
}

/// Normalise an identifier before lookup or insert.
///
/// Emails compare case-insensitively; everything else only trims.
pub fn normalize_identifier(identity_type: IdentityType, identifier: &str) -> String {
    let trimmed = identifier.trim();
    match identity_type {
        IdentityType::EmailPassword | IdentityType::EmailCode => trimmed.to_lowercase(),
        IdentityType::UsernamePassword | IdentityType::PhoneSms | IdentityType::WechatQr => {
            trimmed.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_starts_active_and_unlocked() {
        let user = User::new(UserId::new(), None);
        assert!(user.is_active());
        assert_eq!(user.lockout.fail_count, 0);
        assert!(user.lockout.lock_until.is_none());
    }

    #[test]
    fn empty_hash_is_not_a_credential() {
        let identity = NewIdentity {
            id: IdentityId::new(),
            user_id: UserId::new(),
            identity_type: IdentityType::UsernamePassword,
            identifier: "alice".to_string(),
            credential_hash: Some(String::new()),
        }
        .into_identity();

        assert!(!identity.has_credential());
        assert!(identity.is_enabled());
    }

    #[test]
    fn emails_normalise_to_lowercase() {
        assert_eq!(
            normalize_identifier(IdentityType::EmailCode, "  Bob@Example.COM "),
            "bob@example.com"
        );
        assert_eq!(
            normalize_identifier(IdentityType::UsernamePassword, " Bob "),
            "Bob"
        );
    }
}
