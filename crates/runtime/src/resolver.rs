//! Session → capability resolution.

use crate::identity::IdentitySource;
use crate::{Error, Session};
use policy::{CapabilitySet, Policy};
use tracing::{debug, warn};

/// Outcome of a resolution, including a lookup failure if one was swallowed.
#[derive(Debug)]
pub struct Resolution {
    pub capabilities: CapabilitySet,
    pub lookup_error: Option<Error>,
}

/// Maps a session to its capability set through an identity source and a
/// role policy.
pub struct PermissionResolver<I> {
    identity: I,
    policy: Policy,
}

impl<I: IdentitySource> PermissionResolver<I> {
    pub fn new(identity: I, policy: Policy) -> Self {
        Self { identity, policy }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Capabilities granted to `session`.
    ///
    /// Loading, anonymous and expired sessions get the empty set, and so does
    /// any session whose identity lookup fails.
    pub async fn resolve(&self, session: &Session) -> CapabilitySet {
        self.resolve_detailed(session).await.capabilities
    }

    /// Like [`resolve`](Self::resolve), but hands back the swallowed lookup
    /// error so callers can audit it.
    pub async fn resolve_detailed(&self, session: &Session) -> Resolution {
        let Some(user) = session.user() else {
            return Resolution {
                capabilities: CapabilitySet::empty(),
                lookup_error: None,
            };
        };

        match self.identity.roles(user).await {
            Ok(roles) => {
                let capabilities = self.policy.capabilities_for(&roles);
                debug!(%user, ?roles, %capabilities, "resolved capabilities");
                Resolution {
                    capabilities,
                    lookup_error: None,
                }
            }
            Err(e) => {
                warn!(%user, error = %e, "identity lookup failed; denying all capabilities");
                Resolution {
                    capabilities: CapabilitySet::empty(),
                    lookup_error: Some(e),
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::identity::StaticIdentity;
    use crate::Result;
    use policy::Capability;
    use storage::UserId;

    /// Identity source whose backend is always down.
    pub(crate) struct Unreachable;

    impl IdentitySource for Unreachable {
        async fn roles(&self, _user: UserId) -> Result<Vec<String>> {
            Err(Error::Network("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn signed_in_user_gets_role_capabilities() {
        let user = UserId::new();
        let resolver = PermissionResolver::new(
            StaticIdentity::new().with_user(user, ["technician"]),
            Policy::field_service(),
        );
        let caps = resolver.resolve(&Session::signed_in(user, None)).await;
        assert!(caps.contains(&Capability::WorklogsManage));
        assert!(!caps.contains(&Capability::Admin));
    }

    #[tokio::test]
    async fn unauthenticated_sessions_resolve_empty() {
        let user = UserId::new();
        let resolver = PermissionResolver::new(
            StaticIdentity::new().with_user(user, ["admin"]),
            Policy::field_service(),
        );

        assert!(resolver.resolve(&Session::loading()).await.is_empty());
        assert!(resolver.resolve(&Session::anonymous()).await.is_empty());

        let mut loading = Session::signed_in(user, None);
        loading.loading = true;
        assert!(resolver.resolve(&loading).await.is_empty());

        let expired = Session::signed_in(user, Some(chrono::Utc::now() - chrono::Duration::seconds(1)));
        assert!(resolver.resolve(&expired).await.is_empty());
    }

    #[tokio::test]
    async fn lookup_failure_degrades_to_empty() {
        let resolver = PermissionResolver::new(Unreachable, Policy::field_service());
        let session = Session::signed_in(UserId::new(), None);

        let resolution = resolver.resolve_detailed(&session).await;
        assert!(resolution.capabilities.is_empty());
        assert!(matches!(resolution.lookup_error, Some(Error::Network(_))));
    }

    #[tokio::test]
    async fn unknown_user_degrades_to_empty() {
        let resolver = PermissionResolver::new(StaticIdentity::new(), Policy::field_service());
        let caps = resolver
            .resolve(&Session::signed_in(UserId::new(), None))
            .await;
        assert!(caps.is_empty());
    }
}
