//! The access context: the one owner of session and capability state.
//!
//! There is no global session. An [`AccessContext`] is created when the
//! application starts, passed to whatever needs it, and torn down on
//! sign-out. Consumers get read-only [`Snapshot`]s through a watch channel;
//! session and capabilities are always published together.

use crate::gate::{GateSubscription, PermissionGate};
use crate::guard::{GuardSubscription, RouteGuard, path_only};
use crate::identity::IdentitySource;
use crate::navigation::Navigator;
use crate::resolver::PermissionResolver;
use crate::routes::{RouteTable, Visit};
use crate::Session;
use chrono::{DateTime, Utc};
use policy::{Capability, CapabilitySet, HasPermission};
use std::sync::{Mutex, PoisonError};
use storage::{AuditStore, Event, EventKind, UserId};
use tokio::sync::watch;
use tracing::{info, warn};

/// A consistent view of session and capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub session: Session,
    pub capabilities: CapabilitySet,
}

impl Snapshot {
    pub fn loading() -> Self {
        Self {
            session: Session::loading(),
            capabilities: CapabilitySet::empty(),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            session: Session::anonymous(),
            capabilities: CapabilitySet::empty(),
        }
    }
}

impl HasPermission for Snapshot {
    fn has_permission(&self, capability: &Capability) -> bool {
        self.session.is_authenticated() && self.capabilities.has_permission(capability)
    }
}

/// Owns the session, resolves its capabilities and publishes snapshots.
///
/// The context is `Send + Sync` when its identity source is, so it can be
/// moved into a spawned task. The audit store sits behind a mutex because
/// a SQLite connection is not `Sync`.
pub struct AccessContext<I> {
    resolver: PermissionResolver<I>,
    tx: watch::Sender<Snapshot>,
    audit: Option<Mutex<AuditStore>>,
}

impl<I: IdentitySource> AccessContext<I> {
    /// Start in the loading state.
    pub fn init(resolver: PermissionResolver<I>) -> Self {
        let (tx, _) = watch::channel(Snapshot::loading());
        Self {
            resolver,
            tx,
            audit: None,
        }
    }

    /// Record lifecycle and access events in `store`.
    pub fn with_audit(mut self, store: AuditStore) -> Self {
        self.audit = Some(Mutex::new(store));
        self
    }

    pub fn resolver(&self) -> &PermissionResolver<I> {
        &self.resolver
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    pub fn has_permission(&self, capability: &Capability) -> bool {
        self.tx.borrow().has_permission(capability)
    }

    pub fn gate(&self, gate: &PermissionGate) -> GateSubscription {
        gate.subscribe(self.subscribe())
    }

    pub fn guard(&self, guard: &RouteGuard) -> GuardSubscription {
        guard.subscribe(self.subscribe())
    }

    /// The auth provider reported a signed-in user.
    ///
    /// Consumers see a loading snapshot while roles are looked up, then the
    /// signed-in session together with its capabilities. A session that is
    /// still signed in is ended first.
    pub async fn sign_in(&mut self, user: UserId, expires_at: Option<DateTime<Utc>>) -> Snapshot {
        let previous = self.snapshot().session;
        if previous.user_id.is_some() {
            info!(session = %previous.id, "replacing signed-in session");
            self.record(Event::new(previous.id, EventKind::SessionEnd));
        }

        let mut session = Session::signed_in(user, expires_at);
        session.loading = true;
        self.publish(Snapshot {
            session: session.clone(),
            capabilities: CapabilitySet::empty(),
        });

        session.loading = false;
        self.record(Event::new(session.id, EventKind::SessionStart { user_id: user }));
        let capabilities = self.resolve(&session).await;
        info!(%user, session = %session.id, %capabilities, "signed in");
        self.publish(Snapshot {
            session,
            capabilities,
        })
    }

    /// The session token was refreshed; roles are looked up again.
    pub async fn refresh(&mut self, expires_at: Option<DateTime<Utc>>) -> Snapshot {
        let current = self.snapshot();
        if !current.session.is_authenticated() {
            warn!(session = %current.session.id, "refresh without an authenticated session");
            return self.expire_if_needed(Utc::now());
        }

        let session = Session {
            expires_at,
            ..current.session
        };
        self.record(Event::new(session.id, EventKind::SessionRefresh));
        let capabilities = self.resolve(&session).await;
        self.publish(Snapshot {
            session,
            capabilities,
        })
    }

    /// The auth provider settled without a user.
    pub fn settle_anonymous(&mut self) -> Snapshot {
        self.publish(Snapshot::anonymous())
    }

    /// Tear the session down.
    pub fn sign_out(&mut self) -> Snapshot {
        let current = self.snapshot();
        if current.session.user_id.is_some() {
            info!(session = %current.session.id, "signed out");
            self.record(Event::new(current.session.id, EventKind::SessionEnd));
        }
        self.publish(Snapshot::anonymous())
    }

    /// Sign out if the current token has expired by `now`.
    pub fn expire_if_needed(&mut self, now: DateTime<Utc>) -> Snapshot {
        let current = self.snapshot();
        if current.session.user_id.is_some() && current.session.is_expired_at(now) {
            info!(session = %current.session.id, "session expired");
            return self.sign_out();
        }
        current
    }

    /// Route a visit through the guard and the route's gate, auditing
    /// redirects and refusals.
    pub fn visit(
        &mut self,
        routes: &RouteTable,
        guard: &RouteGuard,
        location: &str,
        navigator: &mut impl Navigator,
    ) -> Visit {
        let snapshot = self.snapshot();
        let visit = routes.visit(location, &snapshot, guard, navigator);
        match &visit {
            Visit::Redirected { to, from } => {
                self.record(Event::redirected(snapshot.session.id, from, to));
            }
            Visit::Denied(_) => {
                let path = path_only(location);
                let required = routes
                    .access_for(path)
                    .requirement()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                warn!(path, %required, "access denied");
                self.record(Event::access_denied(snapshot.session.id, path, required));
            }
            Visit::Waiting | Visit::Allowed => {}
        }
        visit
    }

    async fn resolve(&self, session: &Session) -> CapabilitySet {
        let resolution = self.resolver.resolve_detailed(session).await;
        if let Some(e) = resolution.lookup_error {
            self.record(Event::new(
                session.id,
                EventKind::LookupFailed {
                    error: e.to_string(),
                },
            ));
        }
        resolution.capabilities
    }

    fn publish(&self, snapshot: Snapshot) -> Snapshot {
        self.tx.send_replace(snapshot.clone());
        snapshot
    }

    fn record(&self, event: Event) {
        let Some(store) = &self.audit else {
            return;
        };
        let store = store.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = store.append(&event) {
            warn!(error = %e, kind = event.kind.name(), "failed to write audit event");
        }
    }
}
