//! Engine configuration and declarative override rules.
//!
//! Configuration comes from TOML or from the environment:
//!
//! ```toml
//! conflict-policy = "reject"
//! cache-verdicts = true
//!
//! [[overrides]]
//! set = "SupportsFloorCeil"
//! type-key = "numpy.float64"
//! action = "include"
//! ```

use crate::error::NumeraryError;
use crate::shape::TypeKey;
use serde::{Deserialize, Serialize};

pub const ENV_CONFLICT_POLICY: &str = "NUMERARY_CONFLICT_POLICY";
pub const ENV_CACHE: &str = "NUMERARY_CACHE";

const TRUTHY: &[&str] = &["on", "t", "true", "yes"];
const FALSY: &[&str] = &["off", "f", "false", "no"];

/// What to do when bases of a set disagree on an override for a type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Refuse the declaration or mutation that introduces the conflict.
    #[default]
    Reject,
    /// Accept it; the first declared base yielding an override decides.
    FirstDeclared,
}

impl ConflictPolicy {
    pub fn parse(raw: &str) -> Result<Self, NumeraryError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(ConflictPolicy::Reject),
            "first-declared" | "first_declared" => Ok(ConflictPolicy::FirstDeclared),
            other => Err(NumeraryError::InvalidConfig(format!(
                "unrecognized conflict policy ({other}), expected \"reject\" or \"first-declared\""
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineConfig {
    pub conflict_policy: ConflictPolicy,
    /// Default caching flag for newly declared sets.
    pub cache_verdicts: bool,
    pub overrides: Vec<OverrideRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::Reject,
            cache_verdicts: true,
            overrides: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, NumeraryError> {
        toml::from_str(raw).map_err(|source| NumeraryError::ParseConfig { source })
    }

    /// Defaults overlaid with `NUMERARY_CONFLICT_POLICY` and `NUMERARY_CACHE`.
    pub fn from_env() -> Result<Self, NumeraryError> {
        Self::default().with_env_lookup(|name| std::env::var(name).ok())
    }

    /// Overlay values from `lookup`; unset variables leave fields untouched.
    pub fn with_env_lookup(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, NumeraryError> {
        if let Some(raw) = lookup(ENV_CONFLICT_POLICY) {
            self.conflict_policy = ConflictPolicy::parse(&raw)?;
        }
        if let Some(raw) = lookup(ENV_CACHE) {
            self.cache_verdicts = parse_switch(ENV_CACHE, &raw)?;
        }
        Ok(self)
    }
}

/// Parse an on/off switch: any integer, or one of the truthy/falsy words.
pub fn parse_switch(variable: &str, raw: &str) -> Result<bool, NumeraryError> {
    let trimmed = raw.trim();
    if let Ok(number) = trimmed.parse::<i64>() {
        return Ok(number != 0);
    }
    let lowered = trimmed.to_ascii_lowercase();
    if TRUTHY.contains(&lowered.as_str()) {
        Ok(true)
    } else if FALSY.contains(&lowered.as_str()) {
        Ok(false)
    } else {
        let accepted: Vec<&str> = TRUTHY.iter().chain(FALSY).copied().collect();
        Err(NumeraryError::InvalidConfig(format!(
            "unrecognized value ({raw}) for {variable} (should be \"{}\", or an integer)",
            accepted.join("\", \"")
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Include,
    Exclude,
    Reset,
}

/// One override expressed as data, addressed by set name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OverrideRule {
    pub set: String,
    pub type_key: TypeKey,
    pub action: RuleAction,
}

impl OverrideRule {
    pub fn new(set: impl Into<String>, type_key: impl Into<TypeKey>, action: RuleAction) -> Self {
        Self {
            set: set.into(),
            type_key: type_key.into(),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_reject_conflicts_and_cache() {
        let config = EngineConfig::default();
        assert_eq!(config.conflict_policy, ConflictPolicy::Reject);
        assert!(config.cache_verdicts);
        assert!(config.overrides.is_empty());
    }

    #[test]
    fn toml_with_override_rules() {
        let config = EngineConfig::from_toml_str(
            r#"
            conflict-policy = "first-declared"

            [[overrides]]
            set = "SupportsDivmod"
            type-key = "complex"
            action = "exclude"
            "#,
        )
        .expect("must parse");

        assert_eq!(config.conflict_policy, ConflictPolicy::FirstDeclared);
        assert!(config.cache_verdicts);
        assert_eq!(
            config.overrides,
            vec![OverrideRule::new(
                "SupportsDivmod",
                "complex",
                RuleAction::Exclude
            )]
        );
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = EngineConfig::from_toml_str("cache-verdicts = \"maybe\"")
            .expect_err("string is not a bool");
        assert!(matches!(err, NumeraryError::ParseConfig { .. }));
    }

    #[test]
    fn env_switches_accept_words_and_integers() {
        for (raw, expected) in [("0", false), ("12", true), ("Yes", true), ("OFF", false)] {
            let config = EngineConfig::default()
                .with_env_lookup(lookup(&[(ENV_CACHE, raw)]))
                .expect("valid switch");
            assert_eq!(config.cache_verdicts, expected, "{raw}");
        }
    }

    #[test]
    fn env_rejects_unknown_words() {
        let err = EngineConfig::default()
            .with_env_lookup(lookup(&[(ENV_CACHE, "sometimes")]))
            .expect_err("unknown switch");
        assert!(err.to_string().contains("NUMERARY_CACHE"));

        let err = EngineConfig::default()
            .with_env_lookup(lookup(&[(ENV_CONFLICT_POLICY, "last")]))
            .expect_err("unknown policy");
        assert!(matches!(err, NumeraryError::InvalidConfig(_)));
    }

    #[test]
    fn env_policy_overrides_default() {
        let config = EngineConfig::default()
            .with_env_lookup(lookup(&[(ENV_CONFLICT_POLICY, "First-Declared")]))
            .expect("valid policy");
        assert_eq!(config.conflict_policy, ConflictPolicy::FirstDeclared);
    }
}
