//! Session-aware route guard.
//!
//! The guard is a classifier, not a one-shot check: every session change
//! reclassifies it, and there is no terminal state.

use crate::context::Snapshot;
use crate::navigation::{Navigator, RedirectState};
use crate::Session;
use tokio::sync::watch;
use tracing::debug;

pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_HOME_PATH: &str = "/";

/// Where a session stands from the guard's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Loading,
    Authenticated,
    Unauthenticated,
}

impl GuardState {
    pub fn classify(session: &Session) -> Self {
        if session.loading {
            Self::Loading
        } else if session.is_authenticated() {
            Self::Authenticated
        } else {
            Self::Unauthenticated
        }
    }
}

/// What the guard did with a visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome<V> {
    /// Session not settled yet; show a neutral waiting indicator.
    Waiting,
    /// Sent to the login page; `from` is the location that was requested.
    Redirected { to: String, from: String },
    /// Protected content.
    Render(V),
}

impl<V> GuardOutcome<V> {
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render(_))
    }
}

/// Guard configuration: where to send anonymous visitors and where to land
/// after login when no safe origin is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    login_path: String,
    home_path: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_PATH, DEFAULT_HOME_PATH)
    }
}

impl RouteGuard {
    pub fn new(login_path: impl Into<String>, home_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            home_path: home_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn home_path(&self) -> &str {
        &self.home_path
    }

    /// Guard a visit to `location`.
    ///
    /// An explicit `element` takes precedence over the nested `outlet`
    /// content. The outlet is only built when it is actually rendered.
    /// The login page itself is never redirected.
    pub fn check<V>(
        &self,
        session: &Session,
        location: &str,
        element: Option<V>,
        outlet: impl FnOnce() -> V,
        navigator: &mut impl Navigator,
    ) -> GuardOutcome<V> {
        match GuardState::classify(session) {
            GuardState::Loading => GuardOutcome::Waiting,
            GuardState::Unauthenticated if path_only(location) == self.login_path => {
                GuardOutcome::Render(element.unwrap_or_else(outlet))
            }
            GuardState::Unauthenticated => {
                debug!(from = location, to = %self.login_path, "redirecting to login");
                navigator.redirect(
                    &self.login_path,
                    RedirectState {
                        from: location.to_string(),
                    },
                );
                GuardOutcome::Redirected {
                    to: self.login_path.clone(),
                    from: location.to_string(),
                }
            }
            GuardState::Authenticated => GuardOutcome::Render(element.unwrap_or_else(outlet)),
        }
    }

    /// Where to go once login succeeds.
    ///
    /// The captured origin is used only if it is a local path; anything else
    /// (absent, external, protocol-relative, the login page itself) lands on
    /// the home path.
    pub fn return_path(&self, state: Option<&RedirectState>) -> String {
        state
            .map(|s| s.from.as_str())
            .filter(|from| is_local_path(from))
            .filter(|from| path_only(from) != self.login_path)
            .unwrap_or(self.home_path.as_str())
            .to_string()
    }

    /// Follow session changes published by an access context.
    pub fn subscribe(&self, rx: watch::Receiver<Snapshot>) -> GuardSubscription {
        GuardSubscription { rx }
    }
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\")
}

/// `path` without query string or fragment.
pub(crate) fn path_only(location: &str) -> &str {
    location
        .split(['?', '#'])
        .next()
        .unwrap_or(location)
}

/// Reclassifies the guard on every published snapshot.
pub struct GuardSubscription {
    rx: watch::Receiver<Snapshot>,
}

impl GuardSubscription {
    pub fn state(&self) -> GuardState {
        GuardState::classify(&self.rx.borrow().session)
    }

    /// Wait for the next session change and return the new state.
    ///
    /// Returns `None` once the access context has been dropped.
    pub async fn changed(&mut self) -> Option<GuardState> {
        self.rx.changed().await.ok()?;
        Some(self.state())
    }
}
