#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use warden_auth::{AuthConfig, AuthEngine, AuthPolicy};
use warden_core::FixedClock;
use warden_infra::{Argon2CredentialMatcher, InMemoryBackend};

pub struct Harness {
    pub backend: InMemoryBackend,
    pub clock: Arc<FixedClock>,
    pub engine: AuthEngine,
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

pub fn harness(config: AuthConfig) -> Harness {
    warden_observability::init_for_tests();

    let clock = Arc::new(FixedClock::new(start()));
    let backend = InMemoryBackend::new(clock.clone(), Argon2CredentialMatcher::low_cost());
    let engine = backend.engine(config);
    Harness {
        backend,
        clock,
        engine,
    }
}

pub fn default_harness() -> Harness {
    harness(AuthConfig::default())
}

pub fn config_with(policy: AuthPolicy) -> AuthConfig {
    AuthConfig {
        default_policy: policy,
        ..AuthConfig::default()
    }
}
