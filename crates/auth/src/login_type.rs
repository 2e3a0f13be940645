//! Login methods, identity types and the mapping between them.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use warden_core::DomainError;

/// The method presented by a login attempt.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginType {
    UsernamePassword,
    PhoneSms,
    EmailPassword,
    EmailCode,
    WechatQr,
}

/// The kind of an identity record. One user may own several.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityType {
    UsernamePassword,
    PhoneSms,
    EmailPassword,
    EmailCode,
    WechatQr,
}

/// How a login type proves possession of the identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CredentialKind {
    Password,
    Code(CodeChannel),
    /// Handled outside this engine (e.g. QR-scan federation).
    External,
}

/// Delivery channel for one-time codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CodeChannel {
    Sms,
    Email,
}

/// Purpose a one-time code was issued for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeScene {
    Login,
    Register,
    ResetPassword,
}

/// Policy toggle gating a login type or code channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MethodFlag {
    Password,
    Sms,
    Email,
    Wechat,
}

impl LoginType {
    pub const ALL: [LoginType; 5] = [
        LoginType::UsernamePassword,
        LoginType::PhoneSms,
        LoginType::EmailPassword,
        LoginType::EmailCode,
        LoginType::WechatQr,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LoginType::UsernamePassword => "USERNAME_PASSWORD",
            LoginType::PhoneSms => "PHONE_SMS",
            LoginType::EmailPassword => "EMAIL_PASSWORD",
            LoginType::EmailCode => "EMAIL_CODE",
            LoginType::WechatQr => "WECHAT_QR",
        }
    }

    /// Identity type looked up first for this login type.
    pub fn identity_type(self) -> IdentityType {
        match self {
            LoginType::UsernamePassword => IdentityType::UsernamePassword,
            LoginType::PhoneSms => IdentityType::PhoneSms,
            LoginType::EmailPassword => IdentityType::EmailPassword,
            LoginType::EmailCode => IdentityType::EmailCode,
            LoginType::WechatQr => IdentityType::WechatQr,
        }
    }

    /// Identity type tried when the primary lookup misses.
    ///
    /// One email address is one identifier regardless of how it authenticates.
    pub fn fallback_identity_type(self) -> Option<IdentityType> {
        match self {
            LoginType::EmailCode => Some(IdentityType::EmailPassword),
            LoginType::UsernamePassword
            | LoginType::PhoneSms
            | LoginType::EmailPassword
            | LoginType::WechatQr => None,
        }
    }

    pub fn credential_kind(self) -> CredentialKind {
        match self {
            LoginType::UsernamePassword | LoginType::EmailPassword => CredentialKind::Password,
            LoginType::PhoneSms => CredentialKind::Code(CodeChannel::Sms),
            LoginType::EmailCode => CredentialKind::Code(CodeChannel::Email),
            LoginType::WechatQr => CredentialKind::External,
        }
    }

    pub fn policy_flag(self) -> MethodFlag {
        match self {
            LoginType::UsernamePassword => MethodFlag::Password,
            LoginType::PhoneSms => MethodFlag::Sms,
            LoginType::EmailPassword | LoginType::EmailCode => MethodFlag::Email,
            LoginType::WechatQr => MethodFlag::Wechat,
        }
    }
}

impl IdentityType {
    pub fn as_str(self) -> &'static str {
        match self {
            IdentityType::UsernamePassword => "USERNAME_PASSWORD",
            IdentityType::PhoneSms => "PHONE_SMS",
            IdentityType::EmailPassword => "EMAIL_PASSWORD",
            IdentityType::EmailCode => "EMAIL_CODE",
            IdentityType::WechatQr => "WECHAT_QR",
        }
    }

    /// Whether identities of this type carry a password hash.
    pub fn bears_password(self) -> bool {
        matches!(
            self,
            IdentityType::UsernamePassword | IdentityType::EmailPassword
        )
    }

    /// The other identity type keyed by the same address, if any.
    ///
    /// Email-password and email-code identities share one address space: an
    /// address belongs to at most one user across both.
    pub fn shares_identifier_with(self) -> Option<IdentityType> {
        match self {
            IdentityType::EmailPassword => Some(IdentityType::EmailCode),
            IdentityType::EmailCode => Some(IdentityType::EmailPassword),
            IdentityType::UsernamePassword | IdentityType::PhoneSms | IdentityType::WechatQr => {
                None
            }
        }
    }
}

impl CodeChannel {
    pub fn policy_flag(self) -> MethodFlag {
        match self {
            CodeChannel::Sms => MethodFlag::Sms,
            CodeChannel::Email => MethodFlag::Email,
        }
    }

    /// Identity type an identifier on this channel is registered under.
    pub fn identity_type(self) -> IdentityType {
        match self {
            CodeChannel::Sms => IdentityType::PhoneSms,
            CodeChannel::Email => IdentityType::EmailCode,
        }
    }

    /// Login type whose identity lookup rules apply to this channel.
    pub fn login_type(self) -> LoginType {
        match self {
            CodeChannel::Sms => LoginType::PhoneSms,
            CodeChannel::Email => LoginType::EmailCode,
        }
    }

    /// Password-bearing identity type matching this channel, if any.
    pub fn password_identity_type(self) -> Option<IdentityType> {
        match self {
            CodeChannel::Sms => None,
            CodeChannel::Email => Some(IdentityType::EmailPassword),
        }
    }
}

impl CodeScene {
    pub fn as_str(self) -> &'static str {
        match self {
            CodeScene::Login => "login",
            CodeScene::Register => "register",
            CodeScene::ResetPassword => "reset_password",
        }
    }
}

impl core::fmt::Display for LoginType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::fmt::Display for IdentityType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::fmt::Display for CodeScene {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoginType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LoginType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::unknown_variant("login type", s))
    }
}
