//! Chantier runtime: sessions, capability resolution, gates and guards.
//!
//! This crate turns an auth provider's session into what the application is
//! allowed to show.
//!
//! # Overview
//!
//! The runtime is organized around these concepts:
//!
//! - **Session**: the auth provider's `{ user, loading }` view of the visitor.
//! - **PermissionResolver**: maps a session to a [`CapabilitySet`] through an
//!   [`IdentitySource`] and a role [`Policy`](policy::Policy). Failures
//!   resolve to the empty set.
//! - **AccessContext**: the explicitly passed owner of session state. It
//!   publishes session and capabilities together as a [`Snapshot`].
//! - **PermissionGate**: shows content only when a requirement holds.
//! - **RouteGuard**: waits while loading, redirects anonymous visitors to
//!   login, renders for signed-in users.
//! - **RouteTable**: the application's screens and how each is protected.
//!
//! # Example
//!
//! ```
//! use policy::{Capability, Policy};
//! use runtime::{AccessContext, History, PermissionResolver, RouteGuard, RouteTable, StaticIdentity, Visit};
//! use storage::UserId;
//!
//! # async fn example() {
//! let user = UserId::new();
//! let identity = StaticIdentity::new().with_user(user, ["technician"]);
//! let mut ctx = AccessContext::init(PermissionResolver::new(identity, Policy::field_service()));
//!
//! ctx.sign_in(user, None).await;
//! assert!(ctx.has_permission(&Capability::WorklogsManage));
//!
//! let mut history = History::default();
//! let visit = ctx.visit(&RouteTable::field_service(), &RouteGuard::default(), "/admin", &mut history);
//! assert!(matches!(visit, Visit::Denied(_)));
//! # }
//! ```
//!
//! [`CapabilitySet`]: policy::CapabilitySet

mod context;
mod error;
mod gate;
mod guard;
pub mod identity;
mod navigation;
mod resolver;
mod routes;
mod session;

// Error types
pub use error::{Error, Result};

// Session state
pub use context::{AccessContext, Snapshot};
pub use session::Session;

// Identity lookup and resolution
pub use identity::{IdentitySource, RestIdentity, StaticIdentity};
pub use resolver::{PermissionResolver, Resolution};

// Gates, guards and routing
pub use gate::{AccessDenied, GateOutcome, GateSubscription, PermissionGate};
pub use guard::{
    DEFAULT_HOME_PATH, DEFAULT_LOGIN_PATH, GuardOutcome, GuardState, GuardSubscription, RouteGuard,
};
pub use navigation::{Entry, History, Navigator, RedirectState};
pub use routes::{Access, Route, RouteConfig, RouteTable, Visit};
