//! The `Registry` trait and latest-dev-tag resolution.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use shiplane_core::{Digest, ImageTag};

use crate::error::{RegistryError, RegistryResult};

/// Operations shiplane needs from a container registry.
///
/// Pulls are digest-addressed: the promoter never pulls by a mutable tag.
/// Pushes are conditional: a tag can be created, or re-pointed at the
/// digest it already holds, but never silently moved to a different one.
#[async_trait]
pub trait Registry: Send + Sync {
    /// List every tag in a repository.
    async fn list_tags(&self, repo: &str) -> RegistryResult<Vec<String>>;

    /// Resolve a tag to its manifest digest. `None` if the tag is absent.
    async fn manifest_digest(&self, repo: &str, tag: &str) -> RegistryResult<Option<Digest>>;

    /// Fetch raw manifest bytes by digest.
    async fn fetch_manifest(&self, repo: &str, digest: &Digest) -> RegistryResult<Bytes>;

    /// Push a manifest under `tag`, returning its digest.
    ///
    /// Fails with [`RegistryError::Conflict`] if the tag exists with a
    /// different digest. Pushing the digest a tag already holds is a
    /// no-op.
    async fn put_manifest(&self, repo: &str, tag: &str, manifest: Bytes) -> RegistryResult<Digest>;
}

/// Resolve the most recent dev-channel tag in a repository.
///
/// Tags that do not parse as dev tags (`latest`, stable tags, arbitrary
/// strings) are skipped. Recency is `(major, minor, patch, build)`.
pub async fn latest_dev_tag(registry: &dyn Registry, repo: &str) -> RegistryResult<ImageTag> {
    let tags = registry.list_tags(repo).await?;
    let mut best: Option<ImageTag> = None;

    for raw in &tags {
        match ImageTag::parse_tag(repo, raw) {
            Ok(tag) if tag.dev_build().is_some() => {
                let newer = best
                    .as_ref()
                    .is_none_or(|b| tag.ordering_key() > b.ordering_key());
                if newer {
                    best = Some(tag);
                }
            }
            Ok(_) => {} // stable tag, not a promotion candidate
            Err(e) => debug!(repo, tag = raw.as_str(), error = %e, "skipping unparseable tag"),
        }
    }

    best.ok_or_else(|| RegistryError::NotFound(format!("no dev tag in repository {repo}")))
}
