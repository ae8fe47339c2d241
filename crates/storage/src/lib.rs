//! SQLite-backed access audit log.
//!
//! Every sign-in, sign-out, token refresh, refused view and login redirect
//! is appended here so that the security dashboard can answer "who was
//! turned away from what, and when?".
//!
//! # Core Concepts
//!
//! ## AuditStore
//!
//! The [`AuditStore`] wraps a SQLite database. Events are append-only and
//! read back per session, in append order.
//!
//! ## Event
//!
//! An [`Event`] carries a unique ID, the [`SessionId`] it belongs to, a
//! timestamp and an [`EventKind`]:
//! - `SessionStart` / `SessionRefresh` / `SessionEnd`: Session lifecycle
//! - `AccessDenied`: A gated view was refused
//! - `Redirected`: An anonymous visit was sent to the login page
//! - `LookupFailed`: The identity backend failed; access degraded to nothing
//!
//! # Example
//!
//! ```no_run
//! use storage::{AuditStore, Event, EventKind, SessionId, UserId};
//!
//! let store = AuditStore::open("audit.db")?;
//!
//! let session_id = SessionId::new();
//! store.append(&Event::new(session_id, EventKind::SessionStart { user_id: UserId::new() }))?;
//! store.append(&Event::access_denied(session_id, "/settings/security", "system.security"))?;
//!
//! for summary in store.list_sessions()? {
//!     println!("{}: {} denials", summary.id, summary.denial_count);
//! }
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod event;
mod store;

pub use error::{Error, Result};
pub use event::{Event, EventKind, SessionId, UserId};
pub use store::{AuditStore, SessionSummary};
