//! Event types for the access audit log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// The backend's identifier for a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// The kind of event that occurred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// A user signed in.
    SessionStart { user_id: UserId },
    /// The session token was refreshed.
    SessionRefresh,
    /// The session ended (sign-out or expiry).
    SessionEnd,
    /// A gated view was refused.
    AccessDenied { path: String, required: String },
    /// An unauthenticated visit was sent to the login page.
    Redirected { from: String, to: String },
    /// The identity backend could not be reached; the session got no
    /// capabilities.
    LookupFailed { error: String },
}

impl EventKind {
    /// Stable name stored in the `kind` column.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::SessionStart { .. } => "session_start",
            EventKind::SessionRefresh => "session_refresh",
            EventKind::SessionEnd => "session_end",
            EventKind::AccessDenied { .. } => "access_denied",
            EventKind::Redirected { .. } => "redirected",
            EventKind::LookupFailed { .. } => "lookup_failed",
        }
    }
}

/// An event in the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

impl Event {
    pub fn new(session_id: SessionId, kind: EventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn access_denied(
        session_id: SessionId,
        path: impl Into<String>,
        required: impl Into<String>,
    ) -> Self {
        Self::new(
            session_id,
            EventKind::AccessDenied {
                path: path.into(),
                required: required.into(),
            },
        )
    }

    pub fn redirected(session_id: SessionId, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(
            session_id,
            EventKind::Redirected {
                from: from.into(),
                to: to.into(),
            },
        )
    }
}
