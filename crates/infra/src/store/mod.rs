//! In-memory implementations of the engine's storage contracts.
//!
//! Intended for tests/dev and single-process deployments.

pub mod identity;
pub mod permission;
pub mod tenant_policy;

pub use identity::InMemoryIdentityStore;
pub use permission::InMemoryPermissionStore;
pub use tenant_policy::InMemoryTenantPolicyStore;
