//! Engine configuration.
//!
//! Defaults are compiled in; every field can be overridden through
//! `WARDEN_*` environment variables.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::AuthPolicy;

pub const ENV_AUTO_REGISTER_SMS: &str = "WARDEN_AUTO_REGISTER_SMS";
pub const ENV_PASSWORD_LOGIN_ENABLED: &str = "WARDEN_PASSWORD_LOGIN_ENABLED";
pub const ENV_SMS_LOGIN_ENABLED: &str = "WARDEN_SMS_LOGIN_ENABLED";
pub const ENV_EMAIL_LOGIN_ENABLED: &str = "WARDEN_EMAIL_LOGIN_ENABLED";
pub const ENV_WECHAT_LOGIN_ENABLED: &str = "WARDEN_WECHAT_LOGIN_ENABLED";
pub const ENV_FAIL_THRESHOLD: &str = "WARDEN_FAIL_THRESHOLD";
pub const ENV_LOCK_MINUTES: &str = "WARDEN_LOCK_MINUTES";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({expected})")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Create a user on the first SMS login of an unknown phone number.
    pub auto_register_on_sms_login: bool,
    /// Platform policy; tenant overrides are merged over it.
    pub default_policy: AuthPolicy,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            auto_register_on_sms_login: false,
            default_policy: AuthPolicy::default(),
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Missing keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let policy = &mut config.default_policy;

        if let Some(v) = read_bool(&lookup, ENV_AUTO_REGISTER_SMS)? {
            config.auto_register_on_sms_login = v;
        }
        if let Some(v) = read_bool(&lookup, ENV_PASSWORD_LOGIN_ENABLED)? {
            policy.password_login_enabled = v;
        }
        if let Some(v) = read_bool(&lookup, ENV_SMS_LOGIN_ENABLED)? {
            policy.sms_login_enabled = v;
        }
        if let Some(v) = read_bool(&lookup, ENV_EMAIL_LOGIN_ENABLED)? {
            policy.email_login_enabled = v;
        }
        if let Some(v) = read_bool(&lookup, ENV_WECHAT_LOGIN_ENABLED)? {
            policy.wechat_login_enabled = v;
        }
        if let Some(v) = read_u32(&lookup, ENV_FAIL_THRESHOLD)? {
            policy.fail_threshold = v;
        }
        if let Some(v) = read_u32(&lookup, ENV_LOCK_MINUTES)? {
            policy.lock_minutes = v;
        }

        Ok(config)
    }
}

fn read_bool<F>(lookup: &F, key: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(Some(true)),
        "false" | "0" => Ok(Some(false)),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw,
            expected: "true/false/1/0",
        }),
    }
}

fn read_u32<F>(lookup: &F, key: &'static str) -> Result<Option<u32>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u32>()
        .map(Some)
        .map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
            expected: "non-negative integer",
        })
}
