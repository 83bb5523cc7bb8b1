//! `promote-and-deploy` and `promote` commands.

use shiplane_core::{DeploymentRef, ImageTag, RolloutState};
use shiplane_pipeline::PipelineError;

use crate::exit;
use crate::Cli;

use super::build_pipeline;

pub async fn promote_and_deploy(
    cli: &Cli,
    repo: &str,
    target: &DeploymentRef,
) -> anyhow::Result<u8> {
    let pipeline = build_pipeline(cli)?;
    let outcome = pipeline.run(repo, target).await?;

    match outcome.rollout.state {
        RolloutState::Healthy => {
            println!(
                "healthy: {} promoted from {} and deployed to {}",
                outcome.stable_tag, outcome.source_tag, target
            );
            Ok(exit::SUCCESS)
        }
        state => {
            let reason = outcome
                .rollout
                .failure
                .map(|f| f.to_string())
                .unwrap_or_else(|| "rollout did not converge".to_string());
            println!(
                "{state}: {} reverted to {} ({reason}); {} stays promoted",
                target, outcome.rollout.previous_image, outcome.stable_tag
            );
            Ok(exit::ROLLOUT_FAILED)
        }
    }
}

pub async fn promote(cli: &Cli, repo: &str, tag: Option<&str>) -> anyhow::Result<u8> {
    let pipeline = build_pipeline(cli)?;

    let source = match tag {
        Some(raw) => ImageTag::parse_tag(repo, raw).map_err(PipelineError::Tag)?,
        None => pipeline.resolve_latest(repo).await?,
    };

    let record = pipeline.promote(&source).await?;
    println!(
        "{:?}: {} -> {} ({})",
        record.outcome, record.source_tag, record.stable_tag, record.digest
    );
    Ok(exit::SUCCESS)
}
