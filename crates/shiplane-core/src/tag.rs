//! Image tag parsing, ordering, and stable-tag derivation.
//!
//! A tag is `{repo}:{major}.{minor}.{patch}` (stable channel) or
//! `{repo}:{major}.{minor}.{patch}-dev{N}` (dev channel, `N` is a
//! monotonically increasing build counter). Dev tags order by
//! `(major, minor, patch, build)`; stable tags are never compared
//! for recency.

use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from tag parsing and derivation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("malformed tag: {0}")]
    Malformed(String),
}

/// Release channel embedded in a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum Channel {
    /// Pre-release build, carrying its build counter.
    Dev { build: u32 },
    /// Production-promoted build.
    Stable,
}

/// How a stable tag is derived from a dev tag.
///
/// Exactly one policy ships today; the enum exists so other derivation
/// rules can be added without touching call sites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DerivePolicy {
    /// Drop the `-devN` suffix, keeping `major.minor.patch`.
    #[default]
    StripDev,
}

/// A fully-qualified image tag: repository, version, channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageTag {
    pub repo: String,
    pub version: Version,
    pub channel: Channel,
}

impl ImageTag {
    /// Parse the tag portion (no repository) against a known repository.
    ///
    /// This is the form registry tag listings return.
    pub fn parse_tag(repo: &str, tag: &str) -> Result<Self, TagError> {
        if repo.is_empty() || repo.contains(':') || repo.contains(char::is_whitespace) {
            return Err(TagError::Malformed(format!("invalid repository {repo:?}")));
        }

        let (version_part, channel) = match tag.rsplit_once("-dev") {
            Some((version, build)) if !build.is_empty() => {
                let build: u32 = build
                    .parse()
                    .map_err(|_| TagError::Malformed(format!("bad dev build counter in {tag:?}")))?;
                (version, Channel::Dev { build })
            }
            _ => (tag, Channel::Stable),
        };

        let version = Version::parse(version_part)
            .map_err(|e| TagError::Malformed(format!("{tag:?}: {e}")))?;
        // Strictly major.minor.patch: semver pre-release/build metadata
        // would make dev and stable forms ambiguous.
        if !version.pre.is_empty() || !version.build.is_empty() {
            return Err(TagError::Malformed(format!(
                "{tag:?}: pre-release or build metadata not allowed"
            )));
        }

        Ok(Self {
            repo: repo.to_string(),
            version,
            channel,
        })
    }

    /// The tag portion, without the repository.
    pub fn tag(&self) -> String {
        match self.channel {
            Channel::Dev { build } => format!("{}-dev{}", self.version, build),
            Channel::Stable => self.version.to_string(),
        }
    }

    /// The dev build counter, if this is a dev tag.
    pub fn dev_build(&self) -> Option<u32> {
        match self.channel {
            Channel::Dev { build } => Some(build),
            Channel::Stable => None,
        }
    }

    /// Sort key for recency among dev tags of one repository.
    pub fn ordering_key(&self) -> (u64, u64, u64, u32) {
        (
            self.version.major,
            self.version.minor,
            self.version.patch,
            self.dev_build().unwrap_or(0),
        )
    }

    /// Derive the stable counterpart of a dev tag.
    ///
    /// Deterministic and pure. Fails on a tag that is already stable:
    /// there is no dev suffix to strip, and guessing risks shipping the
    /// wrong artifact.
    pub fn derive_stable(&self, policy: DerivePolicy) -> Result<Self, TagError> {
        match policy {
            DerivePolicy::StripDev => match self.channel {
                Channel::Dev { .. } => Ok(Self {
                    repo: self.repo.clone(),
                    version: self.version.clone(),
                    channel: Channel::Stable,
                }),
                Channel::Stable => Err(TagError::Malformed(format!(
                    "{} is already a stable tag",
                    self
                ))),
            },
        }
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repo, self.tag())
    }
}

impl FromStr for ImageTag {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, TagError> {
        let (repo, tag) = s
            .rsplit_once(':')
            .ok_or_else(|| TagError::Malformed(format!("{s:?}: missing ':'")))?;
        Self::parse_tag(repo, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dev_tag() {
        let tag: ImageTag = "app:1.2.0-dev3".parse().unwrap();
        assert_eq!(tag.repo, "app");
        assert_eq!(tag.version, Version::new(1, 2, 0));
        assert_eq!(tag.channel, Channel::Dev { build: 3 });
        assert_eq!(tag.to_string(), "app:1.2.0-dev3");
    }

    #[test]
    fn parses_stable_tag() {
        let tag: ImageTag = "app:1.2.0".parse().unwrap();
        assert_eq!(tag.channel, Channel::Stable);
        assert_eq!(tag.tag(), "1.2.0");
    }

    #[test]
    fn rejects_malformed_tags() {
        for bad in ["app", "app:latest", "app:1.2", "app:1.2.0-rc1", "app:1.2.0-devx", "app:1.2.0-dev", ":1.2.0"] {
            assert!(bad.parse::<ImageTag>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn derive_strips_dev_suffix() {
        let dev: ImageTag = "app:1.2.0-dev2".parse().unwrap();
        let stable = dev.derive_stable(DerivePolicy::StripDev).unwrap();
        assert_eq!(stable.to_string(), "app:1.2.0");
        // Deriving twice from the same input yields the same output.
        assert_eq!(stable, dev.derive_stable(DerivePolicy::StripDev).unwrap());
    }

    #[test]
    fn derive_rejects_stable_input() {
        let stable: ImageTag = "app:1.2.0".parse().unwrap();
        assert!(matches!(
            stable.derive_stable(DerivePolicy::StripDev),
            Err(TagError::Malformed(_))
        ));
    }

    #[test]
    fn dev_tags_order_by_version_then_build() {
        let a: ImageTag = "app:1.1.9-dev5".parse().unwrap();
        let b: ImageTag = "app:1.2.0-dev1".parse().unwrap();
        let c: ImageTag = "app:1.2.0-dev2".parse().unwrap();
        assert!(a.ordering_key() < b.ordering_key());
        assert!(b.ordering_key() < c.ordering_key());
    }
}
