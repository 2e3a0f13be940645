//! Error taxonomy returned by the engine's entry points.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::capability::CollaboratorError;
use crate::login_type::LoginType;
use crate::store::StoreError;

/// Failure of a store or collaborator call.
///
/// Carried inside [`LoginError::System`]; its text is logged, never shown to
/// the caller.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("collaborator: {0}")]
    Collaborator(#[from] CollaboratorError),
}

/// Terminal outcome of a rejected login or account operation.
///
/// None of these are retried by the engine.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("login method not supported: {0}")]
    LoginMethodNotSupported(LoginType),

    #[error("tenant not found: {0}")]
    TenantNotFound(String),

    #[error("login method {0} is disabled for this tenant")]
    LoginMethodForbidden(LoginType),

    #[error("identity not found")]
    IdentityNotFound,

    #[error("identity is disabled")]
    IdentityDisabled,

    #[error("user is disabled")]
    UserDisabled,

    #[error("user is locked until {until}")]
    UserLocked { until: DateTime<Utc> },

    #[error("identity already registered")]
    DuplicateIdentity,

    #[error("wrong password")]
    PasswordError,

    #[error("verification code is invalid or expired")]
    CodeInvalid,

    #[error("internal error")]
    System(#[source] SystemError),
}

impl LoginError {
    /// Stable machine-readable code for the transport layer.
    pub fn code(&self) -> &'static str {
        match self {
            LoginError::InvalidParam(_) => "INVALID_PARAM",
            LoginError::LoginMethodNotSupported(_) => "LOGIN_METHOD_NOT_SUPPORTED",
            LoginError::TenantNotFound(_) => "TENANT_NOT_FOUND",
            LoginError::LoginMethodForbidden(_) => "LOGIN_METHOD_FORBIDDEN",
            LoginError::IdentityNotFound => "IDENTITY_NOT_FOUND",
            LoginError::IdentityDisabled => "IDENTITY_DISABLED",
            LoginError::UserDisabled => "USER_DISABLED",
            LoginError::UserLocked { .. } => "USER_LOCKED",
            LoginError::DuplicateIdentity => "DUPLICATE_IDENTITY",
            LoginError::PasswordError => "PASSWORD_ERROR",
            LoginError::CodeInvalid => "CODE_INVALID",
            LoginError::System(_) => "SYSTEM_ERROR",
        }
    }

    /// Whether the caller's request caused the failure (4xx-equivalent).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, LoginError::System(_))
    }

    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Self::InvalidParam(msg.into())
    }
}

impl From<StoreError> for LoginError {
    fn from(value: StoreError) -> Self {
        tracing::error!(error = %value, "store failure");
        LoginError::System(SystemError::Store(value))
    }
}

impl From<CollaboratorError> for LoginError {
    fn from(value: CollaboratorError) -> Self {
        tracing::error!(error = %value, "collaborator failure");
        LoginError::System(SystemError::Collaborator(value))
    }
}
