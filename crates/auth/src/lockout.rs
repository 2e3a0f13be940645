//! Failure counting and account lockout.
//!
//! The state machine has two states, `Active` and `Locked`. Transitions are
//! pure functions on [`LockoutState`]; [`LockoutTracker`] applies them through
//! the store's atomic read-modify-write so concurrent attempts for the same
//! user never lose an increment.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use warden_core::UserId;

use crate::policy::AuthPolicy;
use crate::store::{IdentityStore, StoreError};
use crate::user::User;

/// Persisted lockout fields of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockoutState {
    pub fail_count: u32,
    pub lock_until: Option<DateTime<Utc>>,
}

/// Result of the admission check that precedes every credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Reject { until: DateTime<Utc> },
}

/// What a recorded failure did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutTransition {
    /// Still active; the counter now holds `fail_count`.
    Counted { fail_count: u32 },
    /// Threshold reached; counter re-armed at zero.
    Locked { until: DateTime<Utc> },
    /// The user was already locked; nothing changed.
    AlreadyLocked { until: DateTime<Utc> },
}

impl LockoutState {
    /// The active lock deadline, if it is strictly after `now`.
    pub fn locked_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.lock_until.filter(|until| *until > now)
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until(now).is_some()
    }

    pub fn admission(&self, now: DateTime<Utc>) -> Admission {
        match self.locked_until(now) {
            Some(until) => Admission::Reject { until },
            None => Admission::Allow,
        }
    }

    /// Count one failed credential check.
    ///
    /// A failure observed while locked never extends or resets the lock.
    pub fn register_failure(&mut self, policy: &AuthPolicy, now: DateTime<Utc>) -> LockoutTransition {
        if let Some(until) = self.locked_until(now) {
            return LockoutTransition::AlreadyLocked { until };
        }

        self.fail_count = self.fail_count.saturating_add(1);

        if policy.lockout_enabled() && self.fail_count >= policy.fail_threshold {
            let until = now + Duration::minutes(i64::from(policy.lock_minutes));
            self.lock_until = Some(until);
            self.fail_count = 0;
            return LockoutTransition::Locked { until };
        }

        LockoutTransition::Counted {
            fail_count: self.fail_count,
        }
    }

    /// Successful authentication. Leaves an existing lock in place.
    pub fn register_success(&mut self) {
        self.fail_count = 0;
    }

    /// Administrative unlock: clear both counter and deadline.
    pub fn clear(&mut self) {
        self.fail_count = 0;
        self.lock_until = None;
    }
}

/// Store-backed lockout operations for one engine instance.
#[derive(Clone)]
pub struct LockoutTracker {
    store: Arc<dyn IdentityStore>,
}

impl LockoutTracker {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Reject iff the user's lock deadline is strictly after `now`.
    pub fn check_admission(&self, user: &User, now: DateTime<Utc>) -> Admission {
        user.lockout.admission(now)
    }

    pub fn record_failure(
        &self,
        user_id: UserId,
        policy: &AuthPolicy,
        now: DateTime<Utc>,
    ) -> Result<LockoutTransition, StoreError> {
        let mut transition = None;
        self.store.modify_lockout(user_id, &mut |state: &mut LockoutState| {
            transition = Some(state.register_failure(policy, now));
        })?;

        let transition =
            transition.ok_or_else(|| StoreError::not_found(format!("user {user_id}")))?;

        match transition {
            LockoutTransition::Locked { until } => {
                tracing::warn!(user_id = %user_id, %until, "user locked after repeated failures");
            }
            LockoutTransition::Counted { fail_count } => {
                tracing::debug!(user_id = %user_id, fail_count, "failed attempt counted");
            }
            LockoutTransition::AlreadyLocked { .. } => {}
        }

        Ok(transition)
    }

    pub fn record_success(&self, user_id: UserId) -> Result<(), StoreError> {
        self.store
            .modify_lockout(user_id, &mut |state: &mut LockoutState| state.register_success())?;
        Ok(())
    }

    /// Credential reset re-arms the counter; the lock deadline stays.
    pub fn reset_counter(&self, user_id: UserId) -> Result<(), StoreError> {
        self.record_success(user_id)
    }

    pub fn unlock(&self, user_id: UserId) -> Result<(), StoreError> {
        self.store.modify_lockout(user_id, &mut |state: &mut LockoutState| state.clear())?;
        tracing::info!(user_id = %user_id, "user unlocked");
        Ok(())
    }
}
