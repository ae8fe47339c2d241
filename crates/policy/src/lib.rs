//! Capability-based access policy.
//!
//! Core principle: **nothing is visible without an explicit capability.**
//! Unauthenticated sessions, unknown roles and empty requirements all
//! resolve to "denied".

mod capability;
mod error;
mod policy;
mod requirement;
mod set;

pub use capability::Capability;
pub use error::{Error, Result};
pub use policy::{Decision, DenyRules, Policy, RoleGrant};
pub use requirement::{Combinator, Required, Requirement, evaluate};
pub use set::{CapabilitySet, HasPermission};
