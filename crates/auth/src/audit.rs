//! Login audit events and the sink they are written to.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_core::{IdentityId, TenantId, UserId};

use crate::login_type::LoginType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginOutcome {
    Success,
    Failure,
}

/// Reasons recorded on failed-login events.
pub mod reason {
    pub const IDENTITY_NOT_FOUND: &str = "identity not found";
    pub const USER_LOCKED: &str = "user locked";
    pub const PASSWORD_ERROR: &str = "password error";
    pub const CODE_INVALID: &str = "verification code invalid";
    pub const METHOD_NOT_SUPPORTED: &str = "login method not supported";
}

/// One audited login outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginEvent {
    pub outcome: LoginOutcome,
    pub user_id: Option<UserId>,
    pub tenant_id: Option<TenantId>,
    pub identity_id: Option<IdentityId>,
    pub login_type: LoginType,
    pub identifier: String,
    pub client_source: String,
    pub client_ip: Option<IpAddr>,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("audit sink failure: {0}")]
pub struct AuditError(pub String);

/// Destination for login audit events.
///
/// Fire-and-forget from the engine's point of view: an `Err` is logged and
/// dropped, it never changes the login result.
pub trait AuditSink: Send + Sync {
    fn record_login_event(&self, event: LoginEvent) -> Result<(), AuditError>;
}
