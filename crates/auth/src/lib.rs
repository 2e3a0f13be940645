//! `warden-auth`: multi-tenant login and permission aggregation.
//!
//! Decoupled from transport and storage: persistence, hashing and code
//! delivery are injected through the traits in [`store`] and [`capability`].

pub mod account;
pub mod audit;
pub mod authorize;
pub mod capability;
pub mod config;
pub mod engine;
pub mod error;
pub mod lockout;
pub mod login;
pub mod login_type;
pub mod permissions;
pub mod policy;
pub mod resolver;
pub mod roles;
pub mod store;
pub mod user;

pub use account::{AccountService, RegistrationRequest};
pub use audit::{AuditError, AuditSink, LoginEvent, LoginOutcome};
pub use authorize::{AuthzError, Principal, authorize, explain_authorization};
pub use capability::{CodeVerifier, CollaboratorError, CredentialMatcher};
pub use config::{AuthConfig, ConfigError};
pub use engine::{AuthEngine, AuthServices};
pub use error::{LoginError, SystemError};
pub use lockout::{Admission, LockoutState, LockoutTracker, LockoutTransition};
pub use login::{LoginAttempt, LoginOrchestrator, LoginResult, TenantRef};
pub use login_type::{CodeChannel, CodeScene, CredentialKind, IdentityType, LoginType, MethodFlag};
pub use permissions::{EffectivePermissions, PermissionAggregator, PermissionKey};
pub use policy::{AuthPolicy, PolicyResolver, TenantPolicyOverride};
pub use resolver::IdentityResolver;
pub use roles::{RoleCode, RoleStatus};
pub use store::{
    IdentityStore, InterfaceGrantRow, MenuGrantRow, OperationGrantRow, PermissionStore,
    RoleAssignmentRow, StoreError, TenantPolicyStore,
};
pub use user::{Identity, IdentityStatus, NewIdentity, User, UserStatus, normalize_identifier};
