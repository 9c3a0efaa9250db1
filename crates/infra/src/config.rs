//! Configuration loading and representation.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use lendledger_borrowers::BorrowerClass;
use lendledger_lending::{LendingLimits, PolicyTable};

/// Path to a JSON file of per-class policy overrides.
pub const POLICY_FILE_ENV: &str = "LENDLEDGER_POLICY_FILE";

/// Settings for a [`Circulation`](crate::circulation::Circulation).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CirculationConfig {
    pub policy: PolicyTable,
}

/// Override file layout: class name → limits. Classes left out keep their
/// defaults.
///
/// ```json
/// { "Student": { "max_active_loans": 2, "loan_duration_days": 7 } }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
struct PolicyOverrides(HashMap<BorrowerClass, LendingLimits>);

impl CirculationConfig {
    pub fn with_policy(policy: PolicyTable) -> Self {
        Self { policy }
    }

    /// Defaults, overlaid with the file named by `LENDLEDGER_POLICY_FILE`
    /// when it is set.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var_os(POLICY_FILE_ENV) {
            Some(path) if !path.is_empty() => Self::from_policy_file(Path::new(&path))
                .with_context(|| format!("{POLICY_FILE_ENV} is set but could not be loaded")),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_policy_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading policy file {}", path.display()))?;
        Self::from_policy_json(&raw).with_context(|| format!("parsing policy file {}", path.display()))
    }

    pub fn from_policy_json(raw: &str) -> anyhow::Result<Self> {
        let overrides: PolicyOverrides = serde_json::from_str(raw)?;
        let mut policy = PolicyTable::default();
        for (class, limits) in overrides.0 {
            policy.set_rule(class, limits);
        }
        tracing::debug!(?policy, "lending policy loaded");
        Ok(Self { policy })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_named_classes() {
        let config = CirculationConfig::from_policy_json(
            r#"{ "Student": { "max_active_loans": 1, "loan_duration_days": 7 } }"#,
        )
        .unwrap();

        assert_eq!(
            config.policy.limits(BorrowerClass::Student).unwrap(),
            LendingLimits {
                max_active_loans: 1,
                loan_duration_days: 7
            }
        );
        assert_eq!(
            config.policy.limits(BorrowerClass::Teacher).unwrap(),
            PolicyTable::default().limits(BorrowerClass::Teacher).unwrap()
        );
    }

    #[test]
    fn unknown_class_in_file_is_an_error() {
        let err = CirculationConfig::from_policy_json(
            r#"{ "Alumni": { "max_active_loans": 1, "loan_duration_days": 7 } }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Alumni"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = CirculationConfig::from_policy_file(Path::new("/nonexistent/policy.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/policy.json"));
    }
}
