//! Capability sets and the permissions-provider contract.

use crate::Capability;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Anything that can answer "is this capability granted?".
///
/// Gates consume this contract only; they never look inside the set that
/// backs it.
pub trait HasPermission {
    fn has_permission(&self, capability: &Capability) -> bool;
}

/// The capabilities granted to a session.
///
/// There are no public mutators: a set is built once from an iterator and
/// replaced wholesale when the session changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// The empty set. Every unauthenticated session resolves to this.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, capability: &Capability) -> bool {
        self.0.contains(capability)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.0.iter()
    }

    /// Capabilities present in both sets.
    pub fn intersection(&self, other: &CapabilitySet) -> CapabilitySet {
        self.0.intersection(&other.0).cloned().collect()
    }

    /// A copy of this set without the given capabilities.
    pub fn without<'a>(&self, removed: impl IntoIterator<Item = &'a Capability>) -> CapabilitySet {
        let removed: BTreeSet<&Capability> = removed.into_iter().collect();
        self.0
            .iter()
            .filter(|cap| !removed.contains(cap))
            .cloned()
            .collect()
    }
}

impl HasPermission for CapabilitySet {
    fn has_permission(&self, capability: &Capability) -> bool {
        self.contains(capability)
    }
}

impl<T: HasPermission + ?Sized> HasPermission for &T {
    fn has_permission(&self, capability: &Capability) -> bool {
        (**self).has_permission(capability)
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a CapabilitySet {
    type Item = &'a Capability;
    type IntoIter = std::collections::btree_set::Iter<'a, Capability>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<&str> = self.0.iter().map(Capability::as_str).collect();
        write!(f, "{{{}}}", tokens.join(", "))
    }
}
