//! Chain configuration and feature gates.

use crate::core::ProjectId;
use crate::errors::ConfigError;
use crate::seed::{SeedLimits, DEFAULT_MAX_NEEDS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Environment variable overriding [`ChainConfig::max_needs`].
pub const ENV_MAX_NEEDS: &str = "PIPELINE_CHAIN_MAX_NEEDS";

/// Environment variable enabling the deferred seed block globally.
pub const ENV_SEED_BLOCK_AFTER_WORKFLOW_RULES: &str = "PIPELINE_CHAIN_SEED_BLOCK_AFTER_WORKFLOW_RULES";

/// A feature toggle, on globally or for listed projects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureGate {
    /// Enabled for every project.
    #[serde(default)]
    pub enabled: bool,
    /// Projects the gate is enabled for.
    #[serde(default)]
    pub projects: HashSet<ProjectId>,
}

impl FeatureGate {
    /// A gate enabled everywhere.
    #[must_use]
    pub fn on() -> Self {
        Self {
            enabled: true,
            projects: HashSet::new(),
        }
    }

    /// A gate enabled for the given projects only.
    #[must_use]
    pub fn for_projects(projects: impl IntoIterator<Item = ProjectId>) -> Self {
        Self {
            enabled: false,
            projects: projects.into_iter().collect(),
        }
    }

    /// Returns true if the gate is on for `project`.
    #[must_use]
    pub fn is_enabled_for(&self, project: ProjectId) -> bool {
        self.enabled || self.projects.contains(&project)
    }
}

/// Feature gates consulted by the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Run the caller's seed block after workflow rules instead of during
    /// seeding.
    #[serde(default)]
    pub seed_block_after_workflow_rules: FeatureGate,
}

impl FeatureFlags {
    /// Resolves every gate for one project.
    #[must_use]
    pub fn resolve(&self, project: ProjectId) -> ResolvedFeatures {
        ResolvedFeatures {
            seed_block_after_workflow_rules: self.seed_block_after_workflow_rules.is_enabled_for(project),
        }
    }
}

/// Feature gates resolved for one chain execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedFeatures {
    /// See [`FeatureFlags::seed_block_after_workflow_rules`].
    pub seed_block_after_workflow_rules: bool,
}

/// Configuration for pipeline creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Maximum needs per job.
    #[serde(default = "default_max_needs")]
    pub max_needs: usize,
    /// Feature gates.
    #[serde(default)]
    pub features: FeatureFlags,
}

fn default_max_needs() -> usize {
    DEFAULT_MAX_NEEDS
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_needs: default_max_needs(),
            features: FeatureFlags::default(),
        }
    }
}

impl ChainConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document; missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the needs limit.
    #[must_use]
    pub fn with_max_needs(mut self, max_needs: usize) -> Self {
        self.max_needs = max_needs;
        self
    }

    /// Sets the feature gates.
    #[must_use]
    pub fn with_features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Applies overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(std::env::vars())
    }

    /// Applies overrides from key/value pairs.
    pub fn with_overrides<I, K, V>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                ENV_MAX_NEEDS => {
                    self.max_needs = value.trim().parse().map_err(|_| invalid(key, value))?;
                }
                ENV_SEED_BLOCK_AFTER_WORKFLOW_RULES => {
                    self.features.seed_block_after_workflow_rules.enabled =
                        parse_bool(value).ok_or_else(|| invalid(key, value))?;
                }
                _ => {}
            }
        }
        Ok(self)
    }

    /// Returns the seed graph limits.
    #[must_use]
    pub fn seed_limits(&self) -> SeedLimits {
        SeedLimits {
            max_needs: self.max_needs,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChainConfig::default();

        assert_eq!(config.max_needs, 50);
        assert!(!config.features.seed_block_after_workflow_rules.enabled);
        assert_eq!(config.seed_limits(), SeedLimits::default());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = ChainConfig::from_json_str(
            r#"{ "features": { "seed_block_after_workflow_rules": { "projects": [7] } } }"#,
        )
        .unwrap();

        assert_eq!(config.max_needs, 50);
        let resolved = config.features.resolve(ProjectId(7));
        assert!(resolved.seed_block_after_workflow_rules);
        assert!(!config.features.resolve(ProjectId(8)).seed_block_after_workflow_rules);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            ChainConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let config = ChainConfig::default()
            .with_overrides([
                (ENV_MAX_NEEDS, "10"),
                (ENV_SEED_BLOCK_AFTER_WORKFLOW_RULES, "true"),
                ("UNRELATED", "x"),
            ])
            .unwrap();

        assert_eq!(config.max_needs, 10);
        assert!(config.features.seed_block_after_workflow_rules.is_enabled_for(ProjectId(1)));
    }

    #[test]
    fn test_invalid_override() {
        let err = ChainConfig::default()
            .with_overrides([(ENV_MAX_NEEDS, "many")])
            .unwrap_err();

        assert_eq!(err.to_string(), "invalid value for PIPELINE_CHAIN_MAX_NEEDS: 'many'");
    }

    #[test]
    fn test_feature_gate_for_projects() {
        let gate = FeatureGate::for_projects([ProjectId(1), ProjectId(2)]);

        assert!(gate.is_enabled_for(ProjectId(2)));
        assert!(!gate.is_enabled_for(ProjectId(3)));
        assert!(FeatureGate::on().is_enabled_for(ProjectId(3)));
    }
}
