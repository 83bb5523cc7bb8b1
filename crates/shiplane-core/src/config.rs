//! shiplane.toml configuration parser.
//!
//! Every field has a default so the CLI can run without a config file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::tag::DerivePolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiplaneConfig {
    pub registry: RegistryConfig,
    pub orchestrator: OrchestratorConfig,
    pub rollout: RolloutSettings,
    pub promotion: PromotionConfig,
}

/// Registry endpoint and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base URL of the registry (OCI distribution v2 endpoint).
    pub url: String,
    /// Optional bearer token.
    pub token: Option<String>,
    /// Attempts for transient transport errors (first try included).
    pub max_attempts: u32,
    /// Base backoff between attempts; doubles per attempt.
    pub backoff_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000".to_string(),
            token: None,
            max_attempts: 3,
            backoff_ms: 500,
        }
    }
}

/// Orchestrator API endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Base URL of the orchestrator's REST API.
    pub url: String,
    /// Optional bearer token.
    pub token: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8001".to_string(),
            token: None,
        }
    }
}

/// Rollout polling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutSettings {
    /// Seconds between status polls.
    pub poll_interval_secs: u64,
    /// Seconds before an unconverged rollout is declared failed.
    pub timeout_secs: u64,
    /// Container restarts before the rollout counts as crash-looping.
    pub crash_loop_threshold: u32,
}

impl Default for RolloutSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            timeout_secs: 300,
            crash_loop_threshold: 3,
        }
    }
}

impl RolloutSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Promotion behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionConfig {
    /// Stable-tag derivation rule. Unknown names are a config error.
    pub derive_policy: DerivePolicy,
}

impl ShiplaneConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ShiplaneConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let cfg = ShiplaneConfig::default();
        assert_eq!(cfg.registry.max_attempts, 3);
        assert_eq!(cfg.rollout.timeout_secs, 300);
        assert_eq!(cfg.promotion.derive_policy, DerivePolicy::StripDev);
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: ShiplaneConfig = toml::from_str(
            r#"
            [registry]
            url = "https://registry.example.com"
            max_attempts = 5

            [rollout]
            timeout_secs = 60

            [promotion]
            derive_policy = "strip-dev"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.registry.url, "https://registry.example.com");
        assert_eq!(cfg.registry.max_attempts, 5);
        assert_eq!(cfg.registry.backoff_ms, 500); // default fills in
        assert_eq!(cfg.rollout.timeout_secs, 60);
    }

    #[test]
    fn rejects_unknown_policy() {
        let result: Result<ShiplaneConfig, _> = toml::from_str(
            r#"
            [promotion]
            derive_policy = "guess"
            "#,
        );
        assert!(result.is_err());
    }
}
