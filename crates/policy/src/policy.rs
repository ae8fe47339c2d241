//! Role policy configuration and enforcement.

use crate::{Capability, CapabilitySet, Error, Requirement, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Policy configuration loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    /// Capabilities granted by each role name.
    #[serde(default)]
    pub roles: BTreeMap<String, RoleGrant>,

    /// Capabilities that are explicitly denied (overrides role grants).
    #[serde(default)]
    pub deny: DenyRules,
}

/// Capabilities granted to holders of a role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleGrant {
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

/// Rules for denied capabilities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DenyRules {
    /// Never granted, whatever the roles say.
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

/// Result of a requirement check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl Policy {
    /// Load policy from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse policy from TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        let policy: Self = toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    /// A policy with no roles: every session resolves to the empty set.
    pub fn restrictive() -> Self {
        Self::default()
    }

    /// Built-in roles of the field-service application.
    pub fn field_service() -> Self {
        use Capability::*;

        let mut roles = BTreeMap::new();
        roles.insert(
            "admin".to_string(),
            RoleGrant {
                capabilities: Capability::known().collect(),
            },
        );
        roles.insert(
            "manager".to_string(),
            RoleGrant {
                capabilities: vec![
                    UsersView,
                    ProjectsView,
                    ProjectsManage,
                    WorklogsView,
                    WorklogsManage,
                    TasksManage,
                    WorksheetsManage,
                    MessagesSend,
                    ReportsExport,
                ],
            },
        );
        roles.insert(
            "technician".to_string(),
            RoleGrant {
                capabilities: vec![
                    ProjectsView,
                    WorklogsView,
                    WorklogsManage,
                    WorksheetsManage,
                    MessagesSend,
                ],
            },
        );
        roles.insert(
            "client".to_string(),
            RoleGrant {
                capabilities: vec![ProjectsView, WorklogsView, MessagesSend],
            },
        );

        Self {
            roles,
            deny: DenyRules::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(name) = self.roles.keys().find(|name| name.trim().is_empty()) {
            return Err(Error::Invalid(format!("empty role name {name:?}")));
        }
        Ok(())
    }

    /// Union of the grants of `roles`, minus denied capabilities.
    ///
    /// Unknown role names contribute nothing.
    pub fn capabilities_for<S: AsRef<str>>(&self, roles: &[S]) -> CapabilitySet {
        let granted: CapabilitySet = roles
            .iter()
            .filter_map(|role| self.roles.get(role.as_ref()))
            .flat_map(|grant| grant.capabilities.iter().cloned())
            .collect();
        granted.without(&self.deny.capabilities)
    }

    /// Check a requirement against a resolved set.
    pub fn check(&self, requirement: &Requirement, current: &CapabilitySet) -> Decision {
        if requirement.tokens().is_empty() {
            return Decision::Deny {
                reason: "empty requirement".to_string(),
            };
        }

        if requirement.is_satisfied_by(current) {
            return Decision::Allow;
        }

        let missing: Vec<String> = requirement
            .missing(current)
            .iter()
            .map(ToString::to_string)
            .collect();
        Decision::Deny {
            reason: format!(
                "{:?} requirement not met (missing: {})",
                requirement.combinator(),
                missing.join(", ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restrictive_grants_nothing() {
        let policy = Policy::restrictive();
        assert!(policy.capabilities_for(&["admin"]).is_empty());
    }

    #[test]
    fn test_field_service_roles() {
        let policy = Policy::field_service();

        let admin = policy.capabilities_for(&["admin"]);
        assert!(admin.contains(&Capability::SystemSecurity));
        assert!(admin.contains(&Capability::UsersManage));

        let tech = policy.capabilities_for(&["technician"]);
        assert!(tech.contains(&Capability::WorklogsManage));
        assert!(!tech.contains(&Capability::UsersManage));
    }

    #[test]
    fn test_unknown_role_contributes_nothing() {
        let policy = Policy::field_service();
        let caps = policy.capabilities_for(&["client", "ghost"]);
        assert_eq!(caps, policy.capabilities_for(&["client"]));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[roles.admin]
capabilities = ["admin", "users.manage", "reports.export"]

[roles.foreman]
capabilities = ["projects.view", "chantiers.archive"]

[deny]
capabilities = ["reports.export"]
"#;
        let policy = Policy::parse(toml).unwrap();
        let caps = policy.capabilities_for(&["admin", "foreman"]);

        // Granted
        assert!(caps.contains(&Capability::Admin));
        assert!(caps.contains(&Capability::Custom("chantiers.archive".into())));

        // Denied overrides grant
        assert!(!caps.contains(&Capability::ReportsExport));
    }

    #[test]
    fn test_parse_rejects_bad_tokens() {
        let toml = r#"
[roles.admin]
capabilities = ["not a token"]
"#;
        assert!(matches!(Policy::parse(toml), Err(Error::Parse(_))));
    }

    #[test]
    fn test_check_reports_missing() {
        let policy = Policy::field_service();
        let caps = policy.capabilities_for(&["technician"]);
        let req = Requirement::all([Capability::ProjectsView, Capability::UsersManage]);

        match policy.check(&req, &caps) {
            Decision::Deny { reason } => assert!(reason.contains("users.manage")),
            Decision::Allow => panic!("technician must not manage users"),
        }
        assert!(policy
            .check(&Requirement::any([Capability::ProjectsView]), &caps)
            .is_allowed());
    }

    #[test]
    fn test_check_denies_empty_requirement() {
        let policy = Policy::field_service();
        let caps = policy.capabilities_for(&["admin"]);
        let req = Requirement::any(Vec::<Capability>::new());
        assert!(!policy.check(&req, &caps).is_allowed());
    }
}
