mod common;

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, Utc};

use warden_auth::audit::reason;
use warden_auth::{
    AuthConfig, AuthEngine, AuthPolicy, CodeChannel, CodeScene, Identity, IdentityStatus,
    IdentityStore, IdentityType, LockoutState, LoginAttempt, LoginError, LoginOutcome, LoginType,
    NewIdentity, StoreError, TenantPolicyOverride, TenantRef, User, UserStatus,
};
use warden_core::{IdentityId, TenantId, UserId};
use warden_infra::{FailingAuditSink, InMemoryIdentityStore};

use common::{config_with, default_harness, harness, start};

/// Counts identity lookups on the way to the real store.
struct CountingIdentityStore {
    inner: Arc<InMemoryIdentityStore>,
    lookups: AtomicUsize,
}

impl IdentityStore for CountingIdentityStore {
    fn find_by_type_and_identifier(
        &self,
        identity_type: IdentityType,
        identifier: &str,
        tenant: Option<TenantId>,
    ) -> Result<Option<Identity>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner
            .find_by_type_and_identifier(identity_type, identifier, tenant)
    }

    fn find_by_user_and_type(
        &self,
        user_id: UserId,
        identity_type: IdentityType,
    ) -> Result<Option<Identity>, StoreError> {
        self.inner.find_by_user_and_type(user_id, identity_type)
    }

    fn find_by_user(&self, user_id: UserId) -> Result<Vec<Identity>, StoreError> {
        self.inner.find_by_user(user_id)
    }

    fn find_user(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        self.inner.find_user(user_id)
    }

    fn insert_identity(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        self.inner.insert_identity(identity)
    }

    fn insert_user_with_identity(
        &self,
        user: User,
        identity: NewIdentity,
    ) -> Result<Identity, StoreError> {
        self.inner.insert_user_with_identity(user, identity)
    }

    fn update_credential(
        &self,
        identity_id: IdentityId,
        credential_hash: &str,
    ) -> Result<(), StoreError> {
        self.inner.update_credential(identity_id, credential_hash)
    }

    fn update_last_login(
        &self,
        identity_id: IdentityId,
        at: DateTime<Utc>,
        ip: Option<IpAddr>,
    ) -> Result<(), StoreError> {
        self.inner.update_last_login(identity_id, at, ip)
    }

    fn count_by_type_and_identifier(
        &self,
        identity_type: IdentityType,
        identifier: &str,
    ) -> Result<u64, StoreError> {
        self.inner
            .count_by_type_and_identifier(identity_type, identifier)
    }

    fn modify_lockout(
        &self,
        user_id: UserId,
        apply: &mut dyn FnMut(&mut LockoutState),
    ) -> Result<LockoutState, StoreError> {
        self.inner.modify_lockout(user_id, apply)
    }
}

fn password_login(identifier: &str, password: &str) -> LoginAttempt {
    LoginAttempt::new(LoginType::UsernamePassword, identifier, password)
}

// ─────────────────────────────────────────────────────────────────────────────
// End-to-end scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn sms_disabled_by_tenant_is_forbidden_before_any_lookup() {
    let h = harness(AuthConfig {
        auto_register_on_sms_login: true,
        ..AuthConfig::default()
    });
    let acme = h.backend.tenants.add_tenant("acme").unwrap();
    h.backend
        .tenants
        .set_policy(
            acme,
            TenantPolicyOverride {
                sms_login_enabled: Some(false),
                ..TenantPolicyOverride::default()
            },
        )
        .unwrap();

    let counting = Arc::new(CountingIdentityStore {
        inner: h.backend.identities.clone(),
        lookups: AtomicUsize::new(0),
    });
    let spy: Arc<dyn IdentityStore> = counting.clone();
    let mut services = h.backend.services();
    services.identities = spy;
    let engine = AuthEngine::new(
        AuthConfig {
            auto_register_on_sms_login: true,
            ..AuthConfig::default()
        },
        services,
    );

    let err = engine
        .login(
            LoginAttempt::new(LoginType::PhoneSms, "13800000000", "123456")
                .in_tenant(TenantRef::Code("acme".to_string())),
        )
        .unwrap_err();

    assert!(matches!(err, LoginError::LoginMethodForbidden(LoginType::PhoneSms)));
    assert_eq!(counting.lookups.load(Ordering::SeqCst), 0);
    assert_eq!(h.backend.identities.user_count(), 0);
    assert!(h.backend.audit.is_empty());
}

#[test]
fn unknown_username_is_audited_once() {
    let h = default_harness();

    let err = h.engine.login(password_login("ghost", "whatever")).unwrap_err();

    assert!(matches!(err, LoginError::IdentityNotFound));
    let events = h.backend.audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, LoginOutcome::Failure);
    assert_eq!(events[0].reason.as_deref(), Some(reason::IDENTITY_NOT_FOUND));
    assert_eq!(events[0].identifier, "ghost");
    assert!(events[0].user_id.is_none());
}

#[test]
fn correct_password_resets_failures_and_stamps_last_login() {
    let h = default_harness();
    let identity = h
        .backend
        .seed_user(IdentityType::UsernamePassword, "alice", Some("s3cret"), None)
        .unwrap();
    h.backend
        .identities
        .modify_lockout(identity.user_id, &mut |s: &mut LockoutState| s.fail_count = 2)
        .unwrap();
    let ip: IpAddr = "192.0.2.10".parse().unwrap();

    let result = h
        .engine
        .login(password_login("alice", "s3cret").from_client("web", Some(ip)))
        .unwrap();

    assert_eq!(result.user.id, identity.user_id);
    assert_eq!(result.user.lockout.fail_count, 0);
    assert_eq!(result.user.last_login_at, Some(start()));

    let stored = h
        .backend
        .identities
        .find_user(identity.user_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.lockout.fail_count, 0);
    assert_eq!(stored.last_login_at, Some(start()));
    assert_eq!(stored.last_login_ip, Some(ip));

    let stored_identity = h
        .backend
        .identities
        .find_by_user_and_type(identity.user_id, IdentityType::UsernamePassword)
        .unwrap()
        .unwrap();
    assert_eq!(stored_identity.last_login_ip, Some(ip));

    let events = h.backend.audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, LoginOutcome::Success);
    assert_eq!(events[0].client_source, "web");
}

#[test]
fn third_wrong_password_locks_and_fourth_attempt_is_rejected_unchecked() {
    let h = harness(config_with(AuthPolicy {
        fail_threshold: 3,
        lock_minutes: 15,
        ..AuthPolicy::default()
    }));
    let identity = h
        .backend
        .seed_user(IdentityType::UsernamePassword, "bob", Some("right"), None)
        .unwrap();
    let user_of = || {
        h.backend
            .identities
            .find_user(identity.user_id)
            .unwrap()
            .unwrap()
    };

    for expected_count in 1..=2 {
        let err = h.engine.login(password_login("bob", "wrong")).unwrap_err();
        assert!(matches!(err, LoginError::PasswordError));
        assert_eq!(user_of().lockout.fail_count, expected_count);
    }

    let err = h.engine.login(password_login("bob", "wrong")).unwrap_err();
    assert!(matches!(err, LoginError::PasswordError));
    let locked = user_of().lockout;
    assert_eq!(locked.lock_until, Some(start() + Duration::minutes(15)));
    assert_eq!(locked.fail_count, 0);

    // Correct password, still rejected: no credential check while locked.
    let err = h.engine.login(password_login("bob", "right")).unwrap_err();
    match err {
        LoginError::UserLocked { until } => assert_eq!(until, start() + Duration::minutes(15)),
        other => panic!("expected UserLocked, got {other:?}"),
    }
    assert_eq!(user_of().lockout, locked);

    let reasons: Vec<_> = h
        .backend
        .audit
        .failures()
        .into_iter()
        .filter_map(|e| e.reason)
        .collect();
    assert_eq!(
        reasons,
        vec![
            reason::PASSWORD_ERROR,
            reason::PASSWORD_ERROR,
            reason::PASSWORD_ERROR,
            reason::USER_LOCKED,
        ]
    );
}

#[test]
fn lock_expires_at_its_deadline() {
    let h = harness(config_with(AuthPolicy {
        fail_threshold: 1,
        lock_minutes: 15,
        ..AuthPolicy::default()
    }));
    h.backend
        .seed_user(IdentityType::UsernamePassword, "carol", Some("pw"), None)
        .unwrap();

    assert!(matches!(
        h.engine.login(password_login("carol", "nope")),
        Err(LoginError::PasswordError)
    ));

    h.clock.advance(Duration::minutes(15) - Duration::seconds(1));
    assert!(matches!(
        h.engine.login(password_login("carol", "pw")),
        Err(LoginError::UserLocked { .. })
    ));

    h.clock.advance(Duration::seconds(1));
    assert!(h.engine.login(password_login("carol", "pw")).is_ok());
}

// ─────────────────────────────────────────────────────────────────────────────
// Policy
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn tenant_without_policy_uses_platform_defaults() {
    let h = default_harness();
    let acme = h.backend.tenants.add_tenant("acme").unwrap();
    h.backend
        .seed_user(IdentityType::UsernamePassword, "dave", Some("pw"), Some(acme))
        .unwrap();

    let ok = h
        .engine
        .login(password_login("dave", "pw").in_tenant(TenantRef::Id(acme)))
        .unwrap();
    assert_eq!(ok.tenant_id, Some(acme));

    // Wechat is off by default.
    let err = h
        .engine
        .login(LoginAttempt::new(LoginType::WechatQr, "openid-1", "").in_tenant(TenantRef::Id(acme)))
        .unwrap_err();
    assert!(matches!(err, LoginError::LoginMethodForbidden(LoginType::WechatQr)));
}

#[test]
fn partial_override_keeps_other_defaults() {
    let h = default_harness();
    let acme = h.backend.tenants.add_tenant("acme").unwrap();
    h.backend
        .tenants
        .set_policy(
            acme,
            TenantPolicyOverride {
                password_login_enabled: Some(false),
                ..TenantPolicyOverride::default()
            },
        )
        .unwrap();
    let phone = h
        .backend
        .seed_user(IdentityType::PhoneSms, "13900000000", None, Some(acme))
        .unwrap();
    h.backend
        .codes
        .issue(&phone.identifier, CodeScene::Login, "424242");

    let tenant = TenantRef::Code("acme".to_string());
    assert!(matches!(
        h.engine
            .login(password_login("anyone", "pw").in_tenant(tenant.clone())),
        Err(LoginError::LoginMethodForbidden(LoginType::UsernamePassword))
    ));
    let ok = h
        .engine
        .login(LoginAttempt::new(LoginType::PhoneSms, "13900000000", "424242").in_tenant(tenant))
        .unwrap();
    assert_eq!(ok.identity.id, phone.id);
}

#[test]
fn unknown_tenant_code_is_rejected_without_audit() {
    let h = default_harness();
    let err = h
        .engine
        .login(password_login("alice", "pw").in_tenant(TenantRef::Code("nowhere".to_string())))
        .unwrap_err();

    assert!(matches!(err, LoginError::TenantNotFound(ref code) if code == "nowhere"));
    assert!(h.backend.audit.is_empty());
}

#[test]
fn identities_of_other_tenants_are_invisible() {
    let h = default_harness();
    let acme = h.backend.tenants.add_tenant("acme").unwrap();
    let globex = h.backend.tenants.add_tenant("globex").unwrap();
    h.backend
        .seed_user(IdentityType::UsernamePassword, "erin", Some("pw"), Some(acme))
        .unwrap();

    let err = h
        .engine
        .login(password_login("erin", "pw").in_tenant(TenantRef::Id(globex)))
        .unwrap_err();
    assert!(matches!(err, LoginError::IdentityNotFound));
}

// ─────────────────────────────────────────────────────────────────────────────
// Status and input checks
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn disabled_identity_and_user_are_rejected_without_audit() {
    let h = default_harness();
    let identity = h
        .backend
        .seed_user(IdentityType::UsernamePassword, "frank", Some("pw"), None)
        .unwrap();

    h.backend
        .identities
        .set_identity_status(identity.id, IdentityStatus::Disabled)
        .unwrap();
    assert!(matches!(
        h.engine.login(password_login("frank", "pw")),
        Err(LoginError::IdentityDisabled)
    ));

    h.backend
        .identities
        .set_identity_status(identity.id, IdentityStatus::Enabled)
        .unwrap();
    h.backend
        .identities
        .set_user_status(identity.user_id, UserStatus::Disabled)
        .unwrap();
    assert!(matches!(
        h.engine.login(password_login("frank", "pw")),
        Err(LoginError::UserDisabled)
    ));

    assert!(h.backend.audit.is_empty());
}

#[test]
fn blank_identifier_or_password_is_invalid() {
    let h = default_harness();
    h.backend
        .seed_user(IdentityType::UsernamePassword, "gina", Some("pw"), None)
        .unwrap();

    let err = h.engine.login(password_login("   ", "pw")).unwrap_err();
    assert_eq!(err.code(), "INVALID_PARAM");

    let err = h.engine.login(password_login("gina", "")).unwrap_err();
    assert_eq!(err.code(), "INVALID_PARAM");
}

// ─────────────────────────────────────────────────────────────────────────────
// Code logins
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn sms_code_login_round_trip() {
    let h = default_harness();
    let phone = h
        .backend
        .seed_user(IdentityType::PhoneSms, "13700000000", None, None)
        .unwrap();

    h.engine
        .send_code(CodeChannel::Sms, "13700000000", CodeScene::Login, &TenantRef::Platform)
        .unwrap();
    let code = h
        .backend
        .codes
        .last_sent("13700000000", CodeScene::Login)
        .unwrap();

    let ok = h
        .engine
        .login(LoginAttempt::new(LoginType::PhoneSms, "13700000000", code))
        .unwrap();
    assert_eq!(ok.identity.id, phone.id);
}

#[test]
fn wrong_code_is_audited_but_not_counted() {
    let h = default_harness();
    let phone = h
        .backend
        .seed_user(IdentityType::PhoneSms, "13600000000", None, None)
        .unwrap();
    h.backend
        .codes
        .issue("13600000000", CodeScene::Login, "111111");

    let err = h
        .engine
        .login(LoginAttempt::new(LoginType::PhoneSms, "13600000000", "222222"))
        .unwrap_err();

    assert!(matches!(err, LoginError::CodeInvalid));
    let user = h
        .backend
        .identities
        .find_user(phone.user_id)
        .unwrap()
        .unwrap();
    assert_eq!(user.lockout, LockoutState::default());
    assert_eq!(
        h.backend.audit.failures()[0].reason.as_deref(),
        Some(reason::CODE_INVALID)
    );
}

#[test]
fn email_code_falls_back_to_email_password_identity() {
    let h = default_harness();
    let identity = h
        .backend
        .seed_user(IdentityType::EmailPassword, "Hana@Example.com", Some("pw"), None)
        .unwrap();
    assert_eq!(identity.identifier, "hana@example.com");

    h.engine
        .send_code(CodeChannel::Email, "HANA@example.com", CodeScene::Login, &TenantRef::Platform)
        .unwrap();
    let code = h
        .backend
        .codes
        .last_sent("hana@example.com", CodeScene::Login)
        .unwrap();

    let ok = h
        .engine
        .login(LoginAttempt::new(LoginType::EmailCode, "hana@example.com", code))
        .unwrap();
    assert_eq!(ok.identity.id, identity.id);
    assert_eq!(ok.identity.identity_type, IdentityType::EmailPassword);
    assert_eq!(ok.login_type, LoginType::EmailCode);
}

#[test]
fn first_sms_login_provisions_a_user_in_the_requested_tenant() {
    let h = harness(AuthConfig {
        auto_register_on_sms_login: true,
        ..AuthConfig::default()
    });
    let acme = h.backend.tenants.add_tenant("acme").unwrap();
    h.backend
        .codes
        .issue("13500000000", CodeScene::Login, "909090");

    let ok = h
        .engine
        .login(
            LoginAttempt::new(LoginType::PhoneSms, " 13500000000 ", "909090")
                .in_tenant(TenantRef::Id(acme)),
        )
        .unwrap();

    assert_eq!(ok.user.primary_tenant_id, Some(acme));
    assert_eq!(ok.identity.identifier, "13500000000");
    assert!(ok.identity.credential_hash.is_none());
    assert_eq!(h.backend.identities.user_count(), 1);
}

#[test]
fn provisioned_user_outlives_a_wrong_first_code() {
    let h = harness(AuthConfig {
        auto_register_on_sms_login: true,
        ..AuthConfig::default()
    });
    h.backend
        .codes
        .issue("13900000000", CodeScene::Login, "123123");

    let err = h
        .engine
        .login(LoginAttempt::new(LoginType::PhoneSms, "13900000000", "000000"))
        .unwrap_err();
    assert!(matches!(err, LoginError::CodeInvalid));
    assert_eq!(h.backend.identities.user_count(), 1);

    // The retry with the right code lands on the same user.
    let ok = h
        .engine
        .login(LoginAttempt::new(LoginType::PhoneSms, "13900000000", "123123"))
        .unwrap();
    assert_eq!(h.backend.identities.user_count(), 1);
    assert_eq!(ok.identity.identifier, "13900000000");
}

#[test]
fn wechat_login_is_not_supported_even_when_enabled() {
    let h = harness(config_with(AuthPolicy {
        wechat_login_enabled: true,
        ..AuthPolicy::default()
    }));
    h.backend
        .seed_user(IdentityType::WechatQr, "openid-7", None, None)
        .unwrap();

    let err = h
        .engine
        .login(LoginAttempt::new(LoginType::WechatQr, "openid-7", "ticket"))
        .unwrap_err();
    assert!(matches!(err, LoginError::LoginMethodNotSupported(LoginType::WechatQr)));
    assert_eq!(
        h.backend.audit.failures()[0].reason.as_deref(),
        Some(reason::METHOD_NOT_SUPPORTED)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Audit
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn audit_failures_never_change_the_result() {
    let h = default_harness();
    h.backend
        .seed_user(IdentityType::UsernamePassword, "ivan", Some("pw"), None)
        .unwrap();
    let engine = AuthEngine::new(
        AuthConfig::default(),
        h.backend.services_with_audit(Arc::new(FailingAuditSink)),
    );

    assert!(engine.login(password_login("ivan", "pw")).is_ok());
    assert!(matches!(
        engine.login(password_login("ivan", "bad")),
        Err(LoginError::PasswordError)
    ));
    assert!(matches!(
        engine.login(password_login("nobody", "pw")),
        Err(LoginError::IdentityNotFound)
    ));
}
