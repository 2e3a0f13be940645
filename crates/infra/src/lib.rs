//! Infrastructure layer: in-memory stores, hashing, code delivery, audit sinks.

pub mod audit;
pub mod backend;
pub mod codes;
pub mod password;
pub mod store;


pub use audit::{FailingAuditSink, RecordingAuditSink, TracingAuditSink};
pub use backend::InMemoryBackend;
pub use codes::{InMemoryCodeVerifier, SentCode};
pub use password::Argon2CredentialMatcher;
pub use store::{InMemoryIdentityStore, InMemoryPermissionStore, InMemoryTenantPolicyStore};
