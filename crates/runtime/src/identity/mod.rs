//! Identity lookup.
//!
//! An [`IdentitySource`] answers "which roles does this user hold?". The
//! answer is turned into capabilities by the resolver; sources know nothing
//! about capabilities.

mod rest;

pub use rest::{RestIdentity, RestIdentityBuilder};

use crate::{Error, Result};
use std::collections::HashMap;
use std::future::Future;
use storage::UserId;

/// Trait for identity backends.
pub trait IdentitySource: Send + Sync {
    /// Role names held by `user`.
    fn roles(&self, user: UserId) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// Fixed user → roles table, typically loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    users: HashMap<UserId, Vec<String>>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user's roles.
    pub fn with_user<S: Into<String>>(mut self, user: UserId, roles: impl IntoIterator<Item = S>) -> Self {
        self.users
            .insert(user, roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl FromIterator<(UserId, Vec<String>)> for StaticIdentity {
    fn from_iter<T: IntoIterator<Item = (UserId, Vec<String>)>>(iter: T) -> Self {
        Self {
            users: iter.into_iter().collect(),
        }
    }
}

impl IdentitySource for StaticIdentity {
    async fn roles(&self, user: UserId) -> Result<Vec<String>> {
        self.users
            .get(&user)
            .cloned()
            .ok_or_else(|| Error::UnknownUser(user.to_string()))
    }
}
