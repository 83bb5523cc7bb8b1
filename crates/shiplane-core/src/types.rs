//! Domain types shared across the shiplane crates.
//!
//! Promotion records are the audit trail of the promoter; rollout states
//! are the phases of the rollout driver. All types serialize to JSON for
//! storage in the ledger and for `--format json` CLI output.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use thiserror::Error;

/// A content-addressed manifest digest, `sha256:<64 hex chars>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

/// Errors from digest parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigestError {
    #[error("invalid digest: {0}")]
    Invalid(String),
}

impl Digest {
    /// Validate and wrap a `sha256:<hex>` string.
    pub fn parse(s: &str) -> Result<Self, DigestError> {
        let hex_part = s
            .strip_prefix("sha256:")
            .ok_or_else(|| DigestError::Invalid(format!("{s:?}: missing sha256: prefix")))?;
        if hex_part.len() != 64 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DigestError::Invalid(format!("{s:?}: bad hex payload")));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Compute the canonical digest of raw manifest bytes.
    pub fn of(bytes: &[u8]) -> Self {
        let hash = Sha256::digest(bytes);
        Self(format!("sha256:{}", hex::encode(hash)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A deployment target, `{namespace}/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentRef {
    pub namespace: String,
    pub name: String,
}

impl DeploymentRef {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for DeploymentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Error from parsing a `{namespace}/{name}` deployment reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid deployment reference {0:?}: expected namespace/name")]
pub struct InvalidDeploymentRef(pub String);

impl FromStr for DeploymentRef {
    type Err = InvalidDeploymentRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() => Ok(Self::new(ns, name)),
            _ => Err(InvalidDeploymentRef(s.to_string())),
        }
    }
}

/// How a promotion concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionOutcome {
    /// The stable tag was pushed by this run.
    Promoted,
    /// The stable tag already carried this digest; no registry writes.
    AlreadyPromoted,
}

/// Audit record of one promotion. Append-only; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionRecord {
    /// The dev tag the promotion started from.
    pub source_tag: String,
    /// The derived stable tag.
    pub stable_tag: String,
    /// Content digest shared by both tags.
    pub digest: Digest,
    /// Unix timestamp (seconds) when the record was created.
    pub promoted_at: u64,
    pub outcome: PromotionOutcome,
}

impl PromotionRecord {
    pub fn new(
        source_tag: String,
        stable_tag: String,
        digest: Digest,
        outcome: PromotionOutcome,
    ) -> Self {
        Self {
            source_tag,
            stable_tag,
            digest,
            promoted_at: unix_now(),
            outcome,
        }
    }
}

/// Phase of a rollout. Terminal states: Healthy, Failed, RolledBack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloutState {
    /// Not yet patched.
    Pending,
    /// Patch applied, replicas converging.
    InProgress,
    /// All replicas ready within the timeout.
    Healthy,
    /// Timed out or crash-looped; rollback not yet attempted or landed.
    Failed,
    /// Image reference reverted to its pre-rollout value.
    RolledBack,
}

impl RolloutState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Healthy | Self::Failed | Self::RolledBack)
    }
}

impl fmt::Display for RolloutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Healthy => "healthy",
            Self::Failed => "failed",
            Self::RolledBack => "rolled-back",
        };
        f.write_str(s)
    }
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_parse_validates() {
        let hex64 = "a".repeat(64);
        assert!(Digest::parse(&format!("sha256:{hex64}")).is_ok());
        assert!(Digest::parse(&hex64).is_err());
        assert!(Digest::parse("sha256:abc").is_err());
        assert!(Digest::parse(&format!("sha256:{}", "z".repeat(64))).is_err());
    }

    #[test]
    fn digest_of_is_deterministic() {
        let a = Digest::of(b"manifest");
        let b = Digest::of(b"manifest");
        assert_eq!(a, b);
        assert_ne!(a, Digest::of(b"other"));
        assert!(a.as_str().starts_with("sha256:"));
    }

    #[test]
    fn deployment_ref_parses() {
        let r: DeploymentRef = "prod/web".parse().unwrap();
        assert_eq!(r, DeploymentRef::new("prod", "web"));
        assert_eq!(r.to_string(), "prod/web");
        assert!("prod".parse::<DeploymentRef>().is_err());
        assert!("/web".parse::<DeploymentRef>().is_err());
    }

    #[test]
    fn rollout_terminal_states() {
        assert!(RolloutState::Healthy.is_terminal());
        assert!(RolloutState::RolledBack.is_terminal());
        assert!(!RolloutState::InProgress.is_terminal());
    }
}
