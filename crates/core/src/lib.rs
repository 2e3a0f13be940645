//! `warden-core`: foundation types shared by the auth engine and its adapters.
//!
//! No IO lives here: identifiers, tenant scoping, time and the domain error.

pub mod clock;
pub mod error;
pub mod id;
pub mod scope;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::DomainError;
pub use id::{IdentityId, RoleId, TenantId, UserId};
pub use scope::GrantScope;
