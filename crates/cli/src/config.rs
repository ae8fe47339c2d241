//! Configuration loading from chantier.toml.

use policy::Policy;
use runtime::{IdentitySource, RestIdentity, RouteConfig, RouteGuard, RouteTable, StaticIdentity};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use storage::UserId;

const API_KEY_ENV: &str = "CHANTIER_API_KEY";

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Login and landing pages.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Hosted identity backend. Without it, roles come from `[users]`.
    pub backend: Option<BackendConfig>,

    /// Static user → roles table.
    #[serde(default)]
    pub users: BTreeMap<UserId, Vec<String>>,

    /// Screen protections. Empty means the built-in field-service routes.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    /// Role grants and denials.
    #[serde(flatten)]
    pub policy: Policy,
}

#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_login_path")]
    pub login_path: String,

    #[serde(default = "default_home_path")]
    pub home_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            home_path: default_home_path(),
        }
    }
}

/// Hosted backend (REST API) configuration.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,

    /// Public API key. Falls back to the `CHANTIER_API_KEY` environment
    /// variable.
    pub api_key: Option<String>,

    /// Table holding `(user_id, role)` rows.
    pub table: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

fn default_login_path() -> String {
    runtime::DEFAULT_LOGIN_PATH.to_string()
}

fn default_home_path() -> String {
    runtime::DEFAULT_HOME_PATH.to_string()
}

/// The identity source selected by configuration.
pub enum Identity {
    Static(StaticIdentity),
    Rest(RestIdentity),
}

impl IdentitySource for Identity {
    async fn roles(&self, user: UserId) -> runtime::Result<Vec<String>> {
        match self {
            Self::Static(identity) => identity.roles(user).await,
            Self::Rest(identity) => identity.roles(user).await,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Create a default configuration: built-in routes, no roles, no users.
    pub fn default_config() -> Self {
        Self {
            auth: AuthConfig::default(),
            backend: None,
            users: BTreeMap::new(),
            routes: Vec::new(),
            policy: Policy::restrictive(),
        }
    }

    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(&self.auth.login_path, &self.auth.home_path)
    }

    pub fn route_table(&self) -> Result<RouteTable, ConfigError> {
        if self.routes.is_empty() {
            return Ok(RouteTable::field_service());
        }
        RouteTable::from_config(self.routes.iter().cloned())
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Build the identity source.
    ///
    /// A `[backend]` section selects the REST backend and requires an API
    /// key; otherwise the `[users]` table is used.
    pub fn identity(&self) -> Result<Identity, ConfigError> {
        let Some(backend) = &self.backend else {
            let users = self.users.iter().map(|(id, roles)| (*id, roles.clone()));
            return Ok(Identity::Static(users.collect()));
        };

        let api_key = match &backend.api_key {
            Some(key) => key.clone(),
            None => std::env::var(API_KEY_ENV).map_err(|_| ConfigError::MissingApiKey)?,
        };

        let mut builder = RestIdentity::builder(&backend.url, api_key);
        if let Some(table) = &backend.table {
            builder = builder.table(table);
        }
        if let Some(secs) = backend.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Identity::Rest(builder.build()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("backend API key not configured: set backend.api_key or CHANTIER_API_KEY")]
    MissingApiKey,
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy::Capability;

    const SAMPLE: &str = r#"
[auth]
login_path = "/connexion"

[users]
"6f1c3c1e-0000-4000-8000-000000000001" = ["foreman"]

[roles.foreman]
capabilities = ["projects.view", "worklogs.manage"]

[deny]
capabilities = ["reports.export"]

[[routes]]
path = "/chantiers"
require = ["projects.view"]
"#;

    #[test]
    fn parses_sections() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.auth.login_path, "/connexion");
        assert_eq!(config.auth.home_path, "/");
        assert_eq!(config.users.len(), 1);
        assert_eq!(config.routes.len(), 1);

        let caps = config.policy.capabilities_for(&["foreman"]);
        assert!(caps.contains(&Capability::WorklogsManage));
        assert_eq!(config.policy.deny.capabilities, vec![Capability::ReportsExport]);
    }

    #[test]
    fn no_backend_means_static_identity() {
        let config = Config::parse(SAMPLE).unwrap();
        assert!(matches!(config.identity(), Ok(Identity::Static(_))));
    }

    #[test]
    fn backend_with_key_means_rest_identity() {
        let config = Config::parse(
            r#"
[backend]
url = "https://example.supabase.co"
api_key = "anon"
table = "profiles_roles"
"#,
        )
        .unwrap();
        assert!(matches!(config.identity(), Ok(Identity::Rest(_))));
    }

    #[test]
    fn default_config_uses_builtin_routes() {
        let config = Config::default_config();
        let table = config.route_table().unwrap();
        assert!(!table.routes().is_empty());
        assert_eq!(config.guard().login_path(), "/login");
    }

    #[test]
    fn default_config_grants_nothing() {
        let config = Config::default_config();
        assert!(config.policy.roles.is_empty());
        assert!(config.policy.capabilities_for(&["admin"]).is_empty());
        assert!(config.users.is_empty());
    }

    #[test]
    fn configured_login_page_stays_reachable() {
        use runtime::{History, Snapshot, Visit};

        let config = Config::parse(SAMPLE).unwrap();
        let table = config.route_table().unwrap();
        let mut history = History::new("/connexion");

        let visit = table.visit("/connexion", &Snapshot::anonymous(), &config.guard(), &mut history);
        assert_eq!(visit, Visit::Allowed);
        assert!(history.current().state.is_none());
    }

    #[test]
    fn rejects_invalid_routes() {
        let config = Config::parse(
            r#"
[[routes]]
path = "no-slash"
"#,
        )
        .unwrap();
        assert!(matches!(config.route_table(), Err(ConfigError::Invalid(_))));
    }
}
