//! Pipeline — resolve → derive → promote → roll out, as one operation.

use std::sync::Arc;

use tracing::info;

use shiplane_core::{DeploymentRef, ImageTag, PromotionRecord, ShiplaneConfig};
use shiplane_ledger::Ledger;
use shiplane_registry::{Registry, RetryPolicy, latest_dev_tag, with_retry};
use shiplane_rollout::{Orchestrator, RolloutDriver, RolloutReport};

use crate::error::PipelineError;
use crate::promote::Promoter;

/// Result of a full promote-and-deploy run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The dev tag the run promoted from.
    pub source_tag: ImageTag,
    /// The image the deployment was rolled onto.
    pub stable_tag: String,
    pub promotion: PromotionRecord,
    pub rollout: RolloutReport,
}

/// The promote-then-deploy controller.
///
/// Stages run strictly in order; promotion must be durably visible in
/// the registry before rollout starts, which sequencing alone
/// guarantees. Cancellation at any await point leaves a valid state:
/// promoted-but-undeployed is recoverable by re-running.
pub struct Pipeline {
    registry: Arc<dyn Registry>,
    orchestrator: Arc<dyn Orchestrator>,
    ledger: Ledger,
    config: ShiplaneConfig,
}

impl Pipeline {
    pub fn new(
        registry: Arc<dyn Registry>,
        orchestrator: Arc<dyn Orchestrator>,
        ledger: Ledger,
        config: ShiplaneConfig,
    ) -> Self {
        Self {
            registry,
            orchestrator,
            ledger,
            config,
        }
    }

    /// Resolve the latest dev tag for `repo` (retrying transient
    /// registry errors).
    pub async fn resolve_latest(&self, repo: &str) -> Result<ImageTag, PipelineError> {
        let retry = RetryPolicy::from_config(&self.config.registry);
        let tag = with_retry("resolve latest dev tag", retry, || {
            latest_dev_tag(self.registry.as_ref(), repo)
        })
        .await?;
        Ok(tag)
    }

    /// Promote `source` to its stable counterpart.
    pub async fn promote(&self, source: &ImageTag) -> Result<PromotionRecord, PipelineError> {
        let retry = RetryPolicy::from_config(&self.config.registry);
        let promoter = Promoter::new(
            self.registry.as_ref(),
            &self.ledger,
            self.config.promotion.derive_policy,
            retry,
        );
        promoter.promote(source).await
    }

    /// The sole end-to-end entry point: promote the latest dev build of
    /// `repo` and roll `target` onto it.
    ///
    /// If promotion fails, rollout is never attempted. If rollout fails,
    /// the stable tag stays promoted — re-deploying the prior image is a
    /// separate rollout, not a de-promotion.
    pub async fn run(
        &self,
        repo: &str,
        target: &DeploymentRef,
    ) -> Result<RunOutcome, PipelineError> {
        let source_tag = self.resolve_latest(repo).await?;
        info!(source = %source_tag, "resolved latest dev tag");

        let promotion = self.promote(&source_tag).await?;
        let stable_tag = promotion.stable_tag.clone();

        let driver = RolloutDriver::new(self.orchestrator.as_ref(), self.config.rollout.clone());
        let rollout = driver.run(target, &stable_tag).await?;

        Ok(RunOutcome {
            source_tag,
            stable_tag,
            promotion,
            rollout,
        })
    }

    /// Promotion history for a repository, straight from the ledger.
    pub fn history(&self, repo: &str) -> Result<Vec<PromotionRecord>, PipelineError> {
        Ok(self.ledger.list_for_repo(repo)?)
    }
}
