//! Declarative capability gates.

use crate::context::Snapshot;
use policy::{Capability, HasPermission, Required, Requirement};
use std::fmt;
use tokio::sync::watch;

/// What a gate produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome<V> {
    /// The requirement holds; here is the guarded content.
    Granted(V),
    /// The requirement does not hold; here is the caller's fallback.
    Fallback(V),
    /// The requirement does not hold and there is no fallback.
    Hidden,
}

impl<V> GateOutcome<V> {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    /// Whatever should be shown, if anything.
    pub fn into_option(self) -> Option<V> {
        match self {
            Self::Granted(v) | Self::Fallback(v) => Some(v),
            Self::Hidden => None,
        }
    }
}

/// Generic "access denied" view model with a way back to a safe page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDenied {
    pub missing: Vec<Capability>,
    pub return_to: String,
}

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missing: Vec<&str> = self.missing.iter().map(Capability::as_str).collect();
        write!(
            f,
            "access denied (requires {}); return to {}",
            missing.join(", "),
            self.return_to
        )
    }
}

/// A guard keyed on capability membership.
///
/// The gate only asks the permissions provider about individual tokens; it
/// never inspects the capability set behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGate {
    requirement: Requirement,
}

impl PermissionGate {
    pub fn new(requirement: Requirement) -> Self {
        Self { requirement }
    }

    /// Open if any of `required` is granted.
    pub fn any(required: impl Into<Required>) -> Self {
        Self::new(Requirement::any(required))
    }

    /// Open only if all of `required` are granted.
    pub fn all(required: impl Into<Required>) -> Self {
        Self::new(Requirement::all(required))
    }

    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    pub fn allows(&self, perms: &impl HasPermission) -> bool {
        self.requirement.is_satisfied_by(perms)
    }

    /// Build `content` if the gate is open; otherwise show nothing.
    pub fn render<V>(&self, perms: &impl HasPermission, content: impl FnOnce() -> V) -> GateOutcome<V> {
        if self.allows(perms) {
            GateOutcome::Granted(content())
        } else {
            GateOutcome::Hidden
        }
    }

    /// Build `content` if the gate is open; otherwise build `fallback`.
    pub fn render_or<V>(
        &self,
        perms: &impl HasPermission,
        content: impl FnOnce() -> V,
        fallback: impl FnOnce() -> V,
    ) -> GateOutcome<V> {
        if self.allows(perms) {
            GateOutcome::Granted(content())
        } else {
            GateOutcome::Fallback(fallback())
        }
    }

    /// The access-denied view for `perms`, or `None` if the gate is open.
    pub fn access_denied(&self, perms: &impl HasPermission, return_to: &str) -> Option<AccessDenied> {
        if self.allows(perms) {
            return None;
        }
        Some(AccessDenied {
            missing: self.requirement.missing(perms),
            return_to: return_to.to_string(),
        })
    }

    /// Follow capability changes published by an access context.
    pub fn subscribe(&self, rx: watch::Receiver<Snapshot>) -> GateSubscription {
        GateSubscription {
            gate: self.clone(),
            rx,
        }
    }
}

/// Re-evaluates a gate on every published snapshot, so a revoked grant
/// closes the gate as soon as it is published.
pub struct GateSubscription {
    gate: PermissionGate,
    rx: watch::Receiver<Snapshot>,
}

impl GateSubscription {
    pub fn is_open(&self) -> bool {
        self.gate.allows(&*self.rx.borrow())
    }

    /// Wait for the next change and return whether the gate is open.
    ///
    /// Returns `None` once the access context has been dropped.
    pub async fn changed(&mut self) -> Option<bool> {
        self.rx.changed().await.ok()?;
        Some(self.is_open())
    }
}
