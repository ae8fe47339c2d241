//! Permission requirements and their evaluation.
//!
//! A requirement is a list of capability tokens plus a [`Combinator`].
//! An empty token list never grants access.

use crate::{Capability, CapabilitySet, HasPermission, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the tokens of a requirement are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    /// At least one token must be granted.
    #[default]
    Any,
    /// Every token must be granted.
    All,
}

impl Combinator {
    pub fn from_require_all(require_all: bool) -> Self {
        if require_all { Self::All } else { Self::Any }
    }
}

/// Required tokens, normalized from a single capability or a sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Required(Vec<Capability>);

impl Required {
    /// Parse string tokens.
    pub fn parse<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tokens
            .into_iter()
            .map(|t| Capability::parse(t.as_ref()))
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn as_slice(&self) -> &[Capability] {
        &self.0
    }
}

impl From<Capability> for Required {
    fn from(cap: Capability) -> Self {
        Self(vec![cap])
    }
}

impl From<Vec<Capability>> for Required {
    fn from(caps: Vec<Capability>) -> Self {
        Self(caps)
    }
}

impl From<&[Capability]> for Required {
    fn from(caps: &[Capability]) -> Self {
        Self(caps.to_vec())
    }
}

impl<const N: usize> From<[Capability; N]> for Required {
    fn from(caps: [Capability; N]) -> Self {
        Self(caps.into())
    }
}

/// Tokens plus combinator, declared once per protected view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(rename = "require")]
    tokens: Vec<Capability>,
    #[serde(default)]
    mode: Combinator,
}

impl Requirement {
    pub fn new(required: impl Into<Required>, combinator: Combinator) -> Self {
        Self {
            tokens: required.into().0,
            mode: combinator,
        }
    }

    /// Granted if any token is present.
    pub fn any(required: impl Into<Required>) -> Self {
        Self::new(required, Combinator::Any)
    }

    /// Granted only if every token is present.
    pub fn all(required: impl Into<Required>) -> Self {
        Self::new(required, Combinator::All)
    }

    pub fn tokens(&self) -> &[Capability] {
        &self.tokens
    }

    pub fn combinator(&self) -> Combinator {
        self.mode
    }

    /// Evaluate against a permissions provider.
    pub fn is_satisfied_by(&self, perms: &impl HasPermission) -> bool {
        if self.tokens.is_empty() {
            return false;
        }
        match self.mode {
            Combinator::All => self.tokens.iter().all(|t| perms.has_permission(t)),
            Combinator::Any => self.tokens.iter().any(|t| perms.has_permission(t)),
        }
    }

    /// Tokens not granted by `perms`, in declaration order.
    pub fn missing(&self, perms: &impl HasPermission) -> Vec<Capability> {
        self.tokens
            .iter()
            .filter(|t| !perms.has_permission(t))
            .cloned()
            .collect()
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = match self.mode {
            Combinator::Any => " | ",
            Combinator::All => " & ",
        };
        let tokens: Vec<&str> = self.tokens.iter().map(Capability::as_str).collect();
        f.write_str(&tokens.join(sep))
    }
}

/// Decide whether `current` satisfies `required`.
///
/// With `require_all` every token must be present; otherwise one is enough.
/// An empty `required` is always denied.
pub fn evaluate(required: impl Into<Required>, require_all: bool, current: &CapabilitySet) -> bool {
    Requirement::new(required, Combinator::from_require_all(require_all)).is_satisfied_by(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(caps: &[Capability]) -> CapabilitySet {
        caps.iter().cloned().collect()
    }

    #[test]
    fn admin_scenario() {
        let current = set(&[Capability::Admin]);
        let required = [Capability::Admin, Capability::UsersManage];
        assert!(evaluate(required.clone(), false, &current));
        assert!(!evaluate(required, true, &current));
    }

    #[test]
    fn empty_set_denies_everything() {
        let current = CapabilitySet::empty();
        for cap in Capability::known() {
            assert!(!evaluate(cap.clone(), false, &current));
            assert!(!evaluate(cap, true, &current));
        }
    }

    #[test]
    fn empty_requirement_is_denied() {
        let everything: CapabilitySet = Capability::known().collect();
        assert!(!evaluate(Vec::<Capability>::new(), false, &everything));
        assert!(!evaluate(Vec::<Capability>::new(), true, &everything));
    }

    #[test]
    fn any_matches_intersection_and_all_matches_subset() {
        let universe: Vec<Capability> = Capability::known().take(5).collect();
        // Every subset of a small universe against every subset.
        for c_mask in 0u32..32 {
            for r_mask in 1u32..32 {
                let pick = |mask: u32| -> Vec<Capability> {
                    universe
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| mask & (1 << i) != 0)
                        .map(|(_, c)| c.clone())
                        .collect()
                };
                let current: CapabilitySet = pick(c_mask).into_iter().collect();
                let required = pick(r_mask);
                assert_eq!(
                    evaluate(required.clone(), false, &current),
                    c_mask & r_mask != 0
                );
                assert_eq!(
                    evaluate(required.clone(), true, &current),
                    c_mask & r_mask == r_mask
                );
            }
        }
    }

    #[test]
    fn evaluation_is_idempotent() {
        let current = set(&[Capability::ProjectsView, Capability::WorklogsManage]);
        let req = Requirement::all([Capability::ProjectsView, Capability::WorklogsManage]);
        assert_eq!(req.is_satisfied_by(&current), req.is_satisfied_by(&current));
        assert!(req.is_satisfied_by(&current));
    }

    #[test]
    fn missing_lists_ungranted_tokens() {
        let current = set(&[Capability::Admin]);
        let req = Requirement::all([Capability::Admin, Capability::SystemSecurity]);
        assert_eq!(req.missing(&current), vec![Capability::SystemSecurity]);
    }

    #[test]
    fn parse_normalizes_strings() {
        let required = Required::parse(["admin", "chantiers.archive"]).unwrap();
        assert_eq!(
            required.as_slice(),
            &[
                Capability::Admin,
                Capability::Custom("chantiers.archive".into())
            ]
        );
        assert!(Required::parse(["ok", "not ok"]).is_err());
    }

    #[test]
    fn requirement_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            gate: Requirement,
        }
        let parsed: Wrapper = toml::from_str(
            r#"
[gate]
require = ["admin", "system.security"]
mode = "all"
"#,
        )
        .unwrap();
        assert_eq!(parsed.gate.combinator(), Combinator::All);
        assert_eq!(parsed.gate.to_string(), "admin & system.security");
    }
}
