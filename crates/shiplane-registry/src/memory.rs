//! In-memory registry for tests and dry runs.
//!
//! Conditional push is atomic here (one lock), which makes it a faithful
//! stand-in for a registry with conditional-tag semantics.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use shiplane_core::Digest;

use crate::client::Registry;
use crate::error::{RegistryError, RegistryResult};

#[derive(Default)]
struct Inner {
    /// repo → tag → digest.
    tags: HashMap<String, HashMap<String, Digest>>,
    /// digest → manifest bytes.
    manifests: HashMap<Digest, Bytes>,
    /// Number of writes that actually landed.
    pushes: u64,
}

/// Thread-safe in-memory registry.
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRegistry {
    /// Store a manifest and point `tag` at it, bypassing conditional-push
    /// checks. Test setup only.
    pub fn seed_tag(&self, repo: &str, tag: &str, manifest: Vec<u8>) -> Digest {
        let manifest = Bytes::from(manifest);
        let digest = Digest::of(&manifest);
        let mut inner = self.inner.lock().unwrap();
        inner.manifests.insert(digest.clone(), manifest);
        inner
            .tags
            .entry(repo.to_string())
            .or_default()
            .insert(tag.to_string(), digest.clone());
        digest
    }

    /// How many pushes have mutated the registry. Idempotent re-pushes
    /// do not count.
    pub fn push_count(&self) -> u64 {
        self.inner.lock().unwrap().pushes
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn list_tags(&self, repo: &str) -> RegistryResult<Vec<String>> {
        let inner = self.inner.lock().unwrap();
        match inner.tags.get(repo) {
            Some(tags) => {
                let mut names: Vec<String> = tags.keys().cloned().collect();
                names.sort();
                Ok(names)
            }
            None => Err(RegistryError::NotFound(format!("repository {repo}"))),
        }
    }

    async fn manifest_digest(&self, repo: &str, tag: &str) -> RegistryResult<Option<Digest>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.tags.get(repo).and_then(|t| t.get(tag)).cloned())
    }

    async fn fetch_manifest(&self, _repo: &str, digest: &Digest) -> RegistryResult<Bytes> {
        let inner = self.inner.lock().unwrap();
        inner
            .manifests
            .get(digest)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("manifest {digest}")))
    }

    async fn put_manifest(&self, repo: &str, tag: &str, manifest: Bytes) -> RegistryResult<Digest> {
        let digest = Digest::of(&manifest);
        let mut inner = self.inner.lock().unwrap();

        if let Some(existing) = inner.tags.get(repo).and_then(|t| t.get(tag)) {
            if *existing == digest {
                return Ok(digest); // already points here, no write
            }
            return Err(RegistryError::Conflict {
                tag: format!("{repo}:{tag}"),
                existing: existing.clone(),
                attempted: digest,
            });
        }

        inner.manifests.insert(digest.clone(), manifest);
        inner
            .tags
            .entry(repo.to_string())
            .or_default()
            .insert(tag.to_string(), digest.clone());
        inner.pushes += 1;
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn conditional_push_rejects_differing_digest() {
        let registry = MemoryRegistry::default();
        registry.seed_tag("app", "1.2.0", b"original".to_vec());

        let err = registry
            .put_manifest("app", "1.2.0", Bytes::from_static(b"different"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { .. }));
    }

    #[tokio::test]
    async fn identical_push_is_a_noop() {
        let registry = MemoryRegistry::default();
        let digest = registry
            .put_manifest("app", "1.2.0", Bytes::from_static(b"manifest"))
            .await
            .unwrap();
        assert_eq!(registry.push_count(), 1);

        let again = registry
            .put_manifest("app", "1.2.0", Bytes::from_static(b"manifest"))
            .await
            .unwrap();
        assert_eq!(again, digest);
        assert_eq!(registry.push_count(), 1);
    }

    #[tokio::test]
    async fn fetch_by_digest_round_trips() {
        let registry = MemoryRegistry::default();
        let digest = registry.seed_tag("app", "1.0.0-dev1", b"payload".to_vec());

        let bytes = registry.fetch_manifest("app", &digest).await.unwrap();
        assert_eq!(&bytes[..], b"payload");
    }
}
