//! End-to-end pipeline tests against in-memory collaborators.

use std::sync::Arc;

use shiplane_core::{DeploymentRef, PromotionOutcome, RolloutState, ShiplaneConfig};
use shiplane_ledger::Ledger;
use shiplane_pipeline::{Pipeline, PipelineError};
use shiplane_registry::{MemoryRegistry, Registry, RegistryError};
use shiplane_rollout::MemoryOrchestrator;

fn test_config(timeout_secs: u64) -> ShiplaneConfig {
    let mut config = ShiplaneConfig::default();
    config.registry.backoff_ms = 1;
    config.rollout.poll_interval_secs = 0;
    config.rollout.timeout_secs = timeout_secs;
    config
}

fn pipeline(
    registry: &MemoryRegistry,
    orchestrator: &MemoryOrchestrator,
    timeout_secs: u64,
) -> Pipeline {
    Pipeline::new(
        Arc::new(registry.clone()),
        Arc::new(orchestrator.clone()),
        Ledger::open_in_memory().unwrap(),
        test_config(timeout_secs),
    )
}

fn target() -> DeploymentRef {
    "prod/app".parse().unwrap()
}

#[tokio::test]
async fn promote_and_deploy_ends_healthy() {
    let registry = MemoryRegistry::default();
    for tag in ["1.2.0-dev1", "1.2.0-dev2", "1.1.9-dev5"] {
        registry.seed_tag("app", tag, format!("manifest {tag}").into_bytes());
    }
    // Deployment becomes ready on the third poll after the patch.
    let orchestrator = MemoryOrchestrator::new("app:1.1.9", 3).ready_after(3);

    let outcome = pipeline(&registry, &orchestrator, 30)
        .run("app", &target())
        .await
        .unwrap();

    assert_eq!(outcome.source_tag.to_string(), "app:1.2.0-dev2");
    assert_eq!(outcome.stable_tag, "app:1.2.0");
    assert_eq!(outcome.promotion.outcome, PromotionOutcome::Promoted);
    assert_eq!(outcome.rollout.state, RolloutState::Healthy);
    assert_eq!(orchestrator.current_image(), "app:1.2.0");
}

#[tokio::test]
async fn rerun_promotes_idempotently() {
    let registry = MemoryRegistry::default();
    registry.seed_tag("app", "1.2.0-dev2", b"manifest".to_vec());
    let orchestrator = MemoryOrchestrator::new("app:1.1.9", 2);

    let p = pipeline(&registry, &orchestrator, 30);
    let first = p.run("app", &target()).await.unwrap();
    let pushes = registry.push_count();

    let second = p.run("app", &target()).await.unwrap();
    assert_eq!(second.promotion, first.promotion);
    assert_eq!(registry.push_count(), pushes); // no duplicate writes
    assert_eq!(second.rollout.state, RolloutState::Healthy);
}

#[tokio::test]
async fn promotion_conflict_skips_rollout() {
    let registry = MemoryRegistry::default();
    registry.seed_tag("app", "1.2.0-dev2", b"this build".to_vec());
    registry.seed_tag("app", "1.2.0", b"a different build".to_vec());
    let orchestrator = MemoryOrchestrator::new("app:1.1.9", 2);

    let err = pipeline(&registry, &orchestrator, 30)
        .run("app", &target())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Registry(RegistryError::Conflict { .. })
    ));
    // Rollout was never attempted.
    assert_eq!(orchestrator.patch_count(), 0);
    assert_eq!(orchestrator.current_image(), "app:1.1.9");
}

#[tokio::test]
async fn rollout_failure_keeps_tag_promoted() {
    let registry = MemoryRegistry::default();
    registry.seed_tag("app", "1.2.0-dev1", b"manifest".to_vec());
    let orchestrator = MemoryOrchestrator::new("app:1.1.9", 3).never_ready();

    let outcome = pipeline(&registry, &orchestrator, 0)
        .run("app", &target())
        .await
        .unwrap();

    assert_eq!(outcome.rollout.state, RolloutState::RolledBack);
    // The deployment reverted...
    assert_eq!(orchestrator.current_image(), "app:1.1.9");
    // ...but the stable tag stays promoted: re-deploying the prior image
    // is a rollback, not a de-promotion.
    let stable = registry.manifest_digest("app", "1.2.0").await.unwrap();
    assert!(stable.is_some());
}

#[tokio::test]
async fn no_dev_tag_is_not_found() {
    let registry = MemoryRegistry::default();
    registry.seed_tag("app", "1.2.0", b"stable only".to_vec());
    let orchestrator = MemoryOrchestrator::new("app:1.1.9", 2);

    let err = pipeline(&registry, &orchestrator, 30)
        .run("app", &target())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Registry(RegistryError::NotFound(_))
    ));
    assert_eq!(orchestrator.patch_count(), 0);
}

#[tokio::test]
async fn history_lists_promotions_for_repo() {
    let registry = MemoryRegistry::default();
    registry.seed_tag("app", "1.2.0-dev1", b"m1".to_vec());
    let orchestrator = MemoryOrchestrator::new("app:1.1.9", 1);

    let p = pipeline(&registry, &orchestrator, 30);
    p.run("app", &target()).await.unwrap();

    let history = p.history("app").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].stable_tag, "app:1.2.0");
}
