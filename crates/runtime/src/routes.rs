//! Route table for the application's screens.
//!
//! Each screen declares how it is protected. Visiting a path runs the route
//! guard first and the screen's gate second.

use crate::context::Snapshot;
use crate::gate::{AccessDenied, PermissionGate};
use crate::guard::{GuardOutcome, RouteGuard, path_only};
use crate::navigation::Navigator;
use crate::{Error, Result};
use policy::{Capability, Combinator, Requirement};
use serde::{Deserialize, Serialize};

/// How a screen is protected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Reachable without signing in.
    Public,
    /// Any signed-in user.
    Authenticated,
    /// Signed-in users whose capabilities satisfy the requirement.
    Requires(Requirement),
}

impl Access {
    pub fn requirement(&self) -> Option<&Requirement> {
        match self {
            Self::Requires(req) => Some(req),
            Self::Public | Self::Authenticated => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub access: Access,
}

/// A route as written in configuration.
///
/// ```toml
/// [[routes]]
/// path = "/settings/security"
/// require = ["admin", "system.security"]
/// mode = "any"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteConfig {
    pub path: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub require: Vec<Capability>,
    #[serde(default)]
    pub mode: Combinator,
}

impl TryFrom<RouteConfig> for Route {
    type Error = Error;

    fn try_from(config: RouteConfig) -> Result<Self> {
        if !config.path.starts_with('/') {
            return Err(Error::Config(format!(
                "route path must start with '/': {:?}",
                config.path
            )));
        }
        let access = match (config.public, config.require.is_empty()) {
            (true, true) => Access::Public,
            (true, false) => {
                return Err(Error::Config(format!(
                    "route {} is public but lists required capabilities",
                    config.path
                )));
            }
            (false, true) => Access::Authenticated,
            (false, false) => Access::Requires(Requirement::new(config.require, config.mode)),
        };
        Ok(Route {
            path: config.path,
            access,
        })
    }
}

/// Result of visiting a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visit {
    /// The session is still loading.
    Waiting,
    /// Anonymous visitor sent to the login page.
    Redirected { to: String, from: String },
    /// Signed in, but the screen's requirement is not met.
    Denied(AccessDenied),
    /// The screen may be shown.
    Allowed,
}

static UNLISTED: Access = Access::Authenticated;

/// Path → protection, longest segment-prefix match wins.
///
/// Paths with no matching route need an authenticated session.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: impl Into<String>, access: Access) -> Self {
        self.routes.push(Route {
            path: path.into(),
            access,
        });
        self
    }

    pub fn from_config(configs: impl IntoIterator<Item = RouteConfig>) -> Result<Self> {
        let routes = configs
            .into_iter()
            .map(Route::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { routes })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// The screens of the field-service application.
    pub fn field_service() -> Self {
        use Capability::*;

        Self::new()
            .route("/", Access::Authenticated)
            .route("/login", Access::Public)
            .route("/register", Access::Public)
            .route("/reset-password", Access::Public)
            .route("/profile", Access::Authenticated)
            .route(
                "/chantiers",
                Access::Requires(Requirement::any([ProjectsView, ProjectsManage])),
            )
            .route(
                "/chantiers/new",
                Access::Requires(Requirement::any(ProjectsManage)),
            )
            .route(
                "/worklogs",
                Access::Requires(Requirement::any([WorklogsView, WorklogsManage])),
            )
            .route(
                "/tasks",
                Access::Requires(Requirement::any([TasksManage, WorklogsManage])),
            )
            .route(
                "/worksheets",
                Access::Requires(Requirement::any(WorksheetsManage)),
            )
            .route("/messages", Access::Requires(Requirement::any(MessagesSend)))
            .route("/reports", Access::Requires(Requirement::any(ReportsExport)))
            .route("/settings", Access::Authenticated)
            .route(
                "/settings/users",
                Access::Requires(Requirement::any([Admin, UsersManage])),
            )
            .route(
                "/settings/security",
                Access::Requires(Requirement::any([Admin, SystemSecurity])),
            )
            .route("/admin", Access::Requires(Requirement::any(Admin)))
    }

    /// Protection for `location` (query string and fragment are ignored).
    pub fn access_for(&self, location: &str) -> &Access {
        let path = path_only(location);
        self.routes
            .iter()
            .filter(|route| matches_prefix(&route.path, path))
            .max_by_key(|route| segments(&route.path).count())
            .map(|route| &route.access)
            .unwrap_or(&UNLISTED)
    }

    /// Run the guard, then the screen's gate.
    pub fn visit(
        &self,
        location: &str,
        snapshot: &Snapshot,
        guard: &RouteGuard,
        navigator: &mut impl Navigator,
    ) -> Visit {
        let access = self.access_for(location);
        if *access == Access::Public || path_only(location) == guard.login_path() {
            return Visit::Allowed;
        }

        match guard.check(&snapshot.session, location, Some(()), || (), navigator) {
            GuardOutcome::Waiting => Visit::Waiting,
            GuardOutcome::Redirected { to, from } => Visit::Redirected { to, from },
            GuardOutcome::Render(()) => match access.requirement() {
                None => Visit::Allowed,
                Some(req) => PermissionGate::new(req.clone())
                    .access_denied(snapshot, guard.home_path())
                    .map_or(Visit::Allowed, Visit::Denied),
            },
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// `/settings` covers `/settings/users`; `/` covers only itself.
fn matches_prefix(route: &str, path: &str) -> bool {
    let mut route_segments = segments(route).peekable();
    if route_segments.peek().is_none() {
        return segments(path).next().is_none();
    }
    let mut path_segments = segments(path);
    route_segments.all(|r| path_segments.next() == Some(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::History;
    use crate::Session;
    use policy::Policy;
    use storage::UserId;

    fn signed_in(roles: &[&str]) -> Snapshot {
        Snapshot {
            session: Session::signed_in(UserId::new(), None),
            capabilities: Policy::field_service().capabilities_for(roles),
        }
    }

    #[test]
    fn longest_prefix_wins() {
        let table = RouteTable::field_service();
        assert_eq!(
            table.access_for("/chantiers/new"),
            &Access::Requires(Requirement::any(Capability::ProjectsManage))
        );
        assert_eq!(
            table.access_for("/chantiers/17/edit"),
            &Access::Requires(Requirement::any([
                Capability::ProjectsView,
                Capability::ProjectsManage
            ]))
        );
        assert_eq!(table.access_for("/settings/profile"), &Access::Authenticated);
    }

    #[test]
    fn root_does_not_cover_everything() {
        let table = RouteTable::new().route("/", Access::Public);
        assert_eq!(table.access_for("/"), &Access::Public);
        assert_eq!(table.access_for("/anything"), &Access::Authenticated);
    }

    #[test]
    fn prefix_matches_whole_segments_only() {
        assert!(matches_prefix("/settings", "/settings/users"));
        assert!(!matches_prefix("/settings", "/settingsx"));
        assert!(matches_prefix("/login", "/login/"));
        assert!(!matches_prefix("/admin", "/"));
    }

    #[test]
    fn public_routes_skip_the_guard() {
        let table = RouteTable::field_service();
        let mut history = History::new("/login");
        let visit = table.visit("/login", &Snapshot::loading(), &RouteGuard::default(), &mut history);
        assert_eq!(visit, Visit::Allowed);
        assert!(history.current().state.is_none());
    }

    #[test]
    fn login_page_is_reachable_when_not_listed() {
        let table = RouteTable::field_service();
        let guard = RouteGuard::new("/connexion", "/");
        let mut history = History::new("/connexion");

        for snapshot in [Snapshot::anonymous(), Snapshot::loading()] {
            assert_eq!(
                table.visit("/connexion?next=1", &snapshot, &guard, &mut history),
                Visit::Allowed
            );
        }
        assert_eq!(history.current().path, "/connexion");
        assert!(history.current().state.is_none());

        // Other unlisted paths still go through the guard.
        assert_eq!(
            table.visit("/connexion2", &Snapshot::anonymous(), &guard, &mut history),
            Visit::Redirected {
                to: "/connexion".into(),
                from: "/connexion2".into()
            }
        );
    }

    #[test]
    fn loading_waits_and_anonymous_redirects() {
        let table = RouteTable::field_service();
        let guard = RouteGuard::default();
        let mut history = History::new("/messages");

        assert_eq!(
            table.visit("/messages", &Snapshot::loading(), &guard, &mut history),
            Visit::Waiting
        );
        assert_eq!(
            table.visit("/messages", &Snapshot::anonymous(), &guard, &mut history),
            Visit::Redirected {
                to: "/login".into(),
                from: "/messages".into()
            }
        );
    }

    #[test]
    fn technician_sees_worklogs_but_not_security() {
        let table = RouteTable::field_service();
        let guard = RouteGuard::default();
        let mut history = History::default();
        let tech = signed_in(&["technician"]);

        assert_eq!(table.visit("/worklogs", &tech, &guard, &mut history), Visit::Allowed);
        assert_eq!(
            table.visit("/settings/security", &tech, &guard, &mut history),
            Visit::Denied(AccessDenied {
                missing: vec![Capability::Admin, Capability::SystemSecurity],
                return_to: "/".into(),
            })
        );
    }

    #[test]
    fn admin_reaches_every_screen() {
        let table = RouteTable::field_service();
        let guard = RouteGuard::default();
        let mut history = History::default();
        let admin = signed_in(&["admin"]);

        for route in table.routes() {
            assert_eq!(
                table.visit(&route.path, &admin, &guard, &mut history),
                Visit::Allowed,
                "{}",
                route.path
            );
        }
    }

    #[test]
    fn expired_capabilities_are_not_honoured() {
        let table = RouteTable::field_service();
        let mut history = History::default();
        let mut snapshot = signed_in(&["admin"]);
        snapshot.session.expires_at = Some(chrono::Utc::now() - chrono::Duration::seconds(1));

        assert!(matches!(
            table.visit("/admin", &snapshot, &RouteGuard::default(), &mut history),
            Visit::Redirected { .. }
        ));
    }

    #[test]
    fn config_routes() {
        let table = RouteTable::from_config([
            RouteConfig {
                path: "/help".into(),
                public: true,
                ..Default::default()
            },
            RouteConfig {
                path: "/settings/security".into(),
                require: vec![Capability::Admin, Capability::SystemSecurity],
                mode: Combinator::All,
                ..Default::default()
            },
        ])
        .unwrap();

        assert_eq!(table.access_for("/help"), &Access::Public);
        assert_eq!(
            table.access_for("/settings/security").requirement().map(Requirement::combinator),
            Some(Combinator::All)
        );

        let bad = RouteTable::from_config([RouteConfig {
            path: "/x".into(),
            public: true,
            require: vec![Capability::Admin],
            ..Default::default()
        }]);
        assert!(matches!(bad, Err(Error::Config(_))));
        assert!(RouteTable::from_config([RouteConfig {
            path: "relative".into(),
            ..Default::default()
        }])
        .is_err());
    }
}
