//! PostgREST-style identity backend (the hosted database's REST API).

use super::IdentitySource;
use crate::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use storage::UserId;

const DEFAULT_TABLE: &str = "user_roles";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct RoleRow {
    role: String,
}

/// Builder for creating a REST identity source.
#[derive(Debug, Clone)]
pub struct RestIdentityBuilder {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    table: String,
    timeout: Duration,
}

impl RestIdentityBuilder {
    /// Create a new builder with the project URL and its public API key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            access_token: None,
            table: DEFAULT_TABLE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Send the signed-in user's token instead of the API key as bearer.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Table holding `(user_id, role)` rows.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the identity source.
    pub fn build(self) -> RestIdentity {
        RestIdentity {
            client: reqwest::Client::new(),
            base_url: self.base_url.trim_end_matches('/').to_string(),
            api_key: self.api_key,
            access_token: self.access_token,
            table: self.table,
            timeout: self.timeout,
        }
    }
}

/// Looks roles up with `GET /rest/v1/<table>?select=role&user_id=eq.<id>`.
pub struct RestIdentity {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    table: String,
    timeout: Duration,
}

impl RestIdentity {
    /// Create a builder for the REST identity source.
    pub fn builder(base_url: impl Into<String>, api_key: impl Into<String>) -> RestIdentityBuilder {
        RestIdentityBuilder::new(base_url, api_key)
    }

    fn roles_url(&self, user: UserId) -> String {
        format!(
            "{}/rest/v1/{}?select=role&user_id=eq.{}",
            self.base_url, self.table, user
        )
    }
}

impl std::fmt::Display for RestIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rest({}/{})", self.base_url, self.table)
    }
}

impl IdentitySource for RestIdentity {
    async fn roles(&self, user: UserId) -> Result<Vec<String>> {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);

        let response = self
            .client
            .get(self.roles_url(user))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {bearer}"))
            .header("accept", "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{status}: {body}")));
        }

        let rows: Vec<RoleRow> = response
            .json()
            .await
            .map_err(|e| Error::Api(e.to_string()))?;

        Ok(rows.into_iter().map(|r| r.role).collect())
    }
}
