//! Promoter — digest-addressed, idempotent re-tag of a dev image.

use tracing::info;

use shiplane_core::{DerivePolicy, ImageTag, PromotionOutcome, PromotionRecord};
use shiplane_ledger::Ledger;
use shiplane_registry::{Registry, RegistryError, RetryPolicy, with_retry};

use crate::error::PipelineError;

/// Promotes a dev tag to its stable counterpart.
///
/// The source image is always addressed by digest once resolved, never
/// by its mutable tag, so a tag moved mid-run cannot swap the artifact.
/// At-most-one logical promotion per (digest, stable tag) pair holds via
/// the registry's conditional-push semantics.
pub struct Promoter<'a> {
    registry: &'a dyn Registry,
    ledger: &'a Ledger,
    policy: DerivePolicy,
    retry: RetryPolicy,
}

impl<'a> Promoter<'a> {
    pub fn new(
        registry: &'a dyn Registry,
        ledger: &'a Ledger,
        policy: DerivePolicy,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            ledger,
            policy,
            retry,
        }
    }

    /// Promote `source`, returning the audit record.
    ///
    /// Idempotent: if the stable tag already holds the source digest,
    /// the prior record is returned (or an `AlreadyPromoted` record is
    /// written if the promotion happened out-of-band) and the registry
    /// is not touched. A stable tag holding a *different* digest is a
    /// conflict and requires manual intervention.
    pub async fn promote(&self, source: &ImageTag) -> Result<PromotionRecord, PipelineError> {
        let stable = source.derive_stable(self.policy)?;
        let source_ref = source.tag();
        let stable_ref = stable.tag();

        let source_digest = with_retry("resolve source digest", self.retry, || {
            self.registry.manifest_digest(&source.repo, &source_ref)
        })
        .await?
        .ok_or_else(|| RegistryError::NotFound(format!("source tag {source}")))?;

        let existing = with_retry("resolve stable digest", self.retry, || {
            self.registry.manifest_digest(&stable.repo, &stable_ref)
        })
        .await?;

        match existing {
            Some(digest) if digest == source_digest => {
                if let Some(prior) = self.ledger.get_for_stable_tag(&stable.to_string())? {
                    info!(stable = %stable, "already promoted, returning prior record");
                    return Ok(prior);
                }
                // Promoted out-of-band; record it so the audit trail is
                // complete.
                let record = PromotionRecord::new(
                    source.to_string(),
                    stable.to_string(),
                    source_digest,
                    PromotionOutcome::AlreadyPromoted,
                );
                self.ledger.append(&record)?;
                info!(stable = %stable, "already promoted out-of-band, recorded");
                Ok(record)
            }
            Some(digest) => Err(RegistryError::Conflict {
                tag: stable.to_string(),
                existing: digest,
                attempted: source_digest,
            }
            .into()),
            None => {
                let manifest = with_retry("pull manifest by digest", self.retry, || {
                    self.registry.fetch_manifest(&source.repo, &source_digest)
                })
                .await?;

                // Conditional push: safe to retry, a lost race surfaces
                // as a conflict.
                let pushed = with_retry("push stable tag", self.retry, || {
                    self.registry
                        .put_manifest(&stable.repo, &stable_ref, manifest.clone())
                })
                .await?;

                let record = PromotionRecord::new(
                    source.to_string(),
                    stable.to_string(),
                    pushed,
                    PromotionOutcome::Promoted,
                );
                self.ledger.append(&record)?;
                info!(source = %source, stable = %stable, digest = %record.digest, "promoted");
                Ok(record)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiplane_ledger::Ledger;
    use shiplane_registry::MemoryRegistry;

    fn promoter<'a>(registry: &'a MemoryRegistry, ledger: &'a Ledger) -> Promoter<'a> {
        Promoter::new(
            registry,
            ledger,
            DerivePolicy::StripDev,
            RetryPolicy {
                max_attempts: 1,
                base_backoff: std::time::Duration::from_millis(1),
            },
        )
    }

    fn tag(s: &str) -> ImageTag {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn promotes_and_records() {
        let registry = MemoryRegistry::default();
        let ledger = Ledger::open_in_memory().unwrap();
        let digest = registry.seed_tag("app", "1.2.0-dev2", b"manifest".to_vec());

        let record = promoter(&registry, &ledger)
            .promote(&tag("app:1.2.0-dev2"))
            .await
            .unwrap();

        assert_eq!(record.stable_tag, "app:1.2.0");
        assert_eq!(record.digest, digest);
        assert_eq!(record.outcome, PromotionOutcome::Promoted);
        // Stable tag now resolves to the same digest.
        let stable = registry.manifest_digest("app", "1.2.0").await.unwrap();
        assert_eq!(stable, Some(digest));
        // And the ledger has the record.
        assert!(ledger.get("app@1.2.0").unwrap().is_some());
    }

    #[tokio::test]
    async fn second_promotion_is_idempotent() {
        let registry = MemoryRegistry::default();
        let ledger = Ledger::open_in_memory().unwrap();
        registry.seed_tag("app", "1.2.0-dev2", b"manifest".to_vec());

        let p = promoter(&registry, &ledger);
        let first = p.promote(&tag("app:1.2.0-dev2")).await.unwrap();
        let pushes_after_first = registry.push_count();
        let second = p.promote(&tag("app:1.2.0-dev2")).await.unwrap();

        assert_eq!(first, second);
        // No duplicate registry writes.
        assert_eq!(registry.push_count(), pushes_after_first);
    }

    #[tokio::test]
    async fn conflicting_digest_is_fatal() {
        let registry = MemoryRegistry::default();
        let ledger = Ledger::open_in_memory().unwrap();
        registry.seed_tag("app", "1.2.0-dev2", b"first build".to_vec());
        // The stable tag is already taken by a different artifact.
        registry.seed_tag("app", "1.2.0", b"someone else".to_vec());

        let err = promoter(&registry, &ledger)
            .promote(&tag("app:1.2.0-dev2"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Registry(RegistryError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn missing_source_manifest_is_not_found() {
        let registry = MemoryRegistry::default();
        let ledger = Ledger::open_in_memory().unwrap();
        registry.seed_tag("app", "9.9.9-dev1", b"unrelated".to_vec());

        let err = promoter(&registry, &ledger)
            .promote(&tag("app:1.2.0-dev2"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Registry(RegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn out_of_band_promotion_is_backfilled() {
        let registry = MemoryRegistry::default();
        let ledger = Ledger::open_in_memory().unwrap();
        let digest = registry.seed_tag("app", "1.2.0-dev2", b"manifest".to_vec());
        // Stable tag already points at the same digest, but the ledger
        // knows nothing about it.
        registry.seed_tag("app", "1.2.0", b"manifest".to_vec());

        let record = promoter(&registry, &ledger)
            .promote(&tag("app:1.2.0-dev2"))
            .await
            .unwrap();
        assert_eq!(record.outcome, PromotionOutcome::AlreadyPromoted);
        assert_eq!(record.digest, digest);
        assert!(ledger.get("app@1.2.0").unwrap().is_some());
    }
}
