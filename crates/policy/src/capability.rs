use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single granted permission.
///
/// Known tokens get their own variant so call sites are checked at compile
/// time. Tokens configured by administrators at runtime land in
/// [`Capability::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Capability {
    Admin,
    UsersView,
    UsersManage,
    SystemSettings,
    SystemSecurity,
    ProjectsView,
    ProjectsManage,
    WorklogsView,
    WorklogsManage,
    TasksManage,
    WorksheetsManage,
    MessagesSend,
    ReportsExport,
    Custom(String),
}

const KNOWN: &[(&str, Capability)] = &[
    ("admin", Capability::Admin),
    ("users.view", Capability::UsersView),
    ("users.manage", Capability::UsersManage),
    ("system.settings", Capability::SystemSettings),
    ("system.security", Capability::SystemSecurity),
    ("projects.view", Capability::ProjectsView),
    ("projects.manage", Capability::ProjectsManage),
    ("worklogs.view", Capability::WorklogsView),
    ("worklogs.manage", Capability::WorklogsManage),
    ("tasks.manage", Capability::TasksManage),
    ("worksheets.manage", Capability::WorksheetsManage),
    ("messages.send", Capability::MessagesSend),
    ("reports.export", Capability::ReportsExport),
];

impl Capability {
    /// The wire token for this capability, e.g. `"users.manage"`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::UsersView => "users.view",
            Self::UsersManage => "users.manage",
            Self::SystemSettings => "system.settings",
            Self::SystemSecurity => "system.security",
            Self::ProjectsView => "projects.view",
            Self::ProjectsManage => "projects.manage",
            Self::WorklogsView => "worklogs.view",
            Self::WorklogsManage => "worklogs.manage",
            Self::TasksManage => "tasks.manage",
            Self::WorksheetsManage => "worksheets.manage",
            Self::MessagesSend => "messages.send",
            Self::ReportsExport => "reports.export",
            Self::Custom(token) => token,
        }
    }

    /// Parse a token, mapping known tokens to their variant.
    pub fn parse(token: &str) -> Result<Self> {
        let valid = !token.is_empty()
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(Error::InvalidToken(token.to_string()));
        }

        Ok(KNOWN
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, cap)| cap.clone())
            .unwrap_or_else(|| Self::Custom(token.to_string())))
    }

    /// All known (non-custom) capabilities.
    pub fn known() -> impl Iterator<Item = Capability> {
        KNOWN.iter().map(|(_, cap)| cap.clone())
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Capability {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Capability> for String {
    fn from(cap: Capability) -> Self {
        match cap {
            Capability::Custom(token) => token,
            other => other.as_str().to_string(),
        }
    }
}
