//! Session state as reported by the auth provider.

use chrono::{DateTime, Utc};
use storage::{SessionId, UserId};

/// The auth provider's view of the current visitor.
///
/// A session starts out `loading` when the application boots, becomes
/// signed-in or anonymous once the provider answers, and ends on sign-out or
/// when its token expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub user_id: Option<UserId>,
    pub loading: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// The provider has not answered yet.
    pub fn loading() -> Self {
        Self {
            id: SessionId::new(),
            user_id: None,
            loading: true,
            expires_at: None,
        }
    }

    /// The provider answered: nobody is signed in.
    pub fn anonymous() -> Self {
        Self {
            loading: false,
            ..Self::loading()
        }
    }

    pub fn signed_in(user_id: UserId, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: SessionId::new(),
            user_id: Some(user_id),
            loading: false,
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Signed in, settled and not expired.
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(Utc::now())
    }

    pub fn is_authenticated_at(&self, now: DateTime<Utc>) -> bool {
        !self.loading && self.user_id.is_some() && !self.is_expired_at(now)
    }

    /// The signed-in user, if the session is authenticated.
    pub fn user(&self) -> Option<UserId> {
        self.user_id.filter(|_| self.is_authenticated())
    }
}
