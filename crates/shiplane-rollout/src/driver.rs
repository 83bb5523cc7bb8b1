//! Rollout driver — patch the image, poll to convergence, revert on failure.

use std::fmt;
use std::time::Instant;

use tracing::{debug, info, warn};

use shiplane_core::config::RolloutSettings;
use shiplane_core::{DeploymentRef, RolloutState};

use crate::error::{RolloutError, RolloutResult};
use crate::orchestrator::Orchestrator;

/// Why a rollout was reverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloutFailure {
    /// Replicas never converged within the timeout.
    Timeout { waited_secs: u64 },
    /// Restarts since the patch crossed the crash-loop threshold.
    CrashLoop { restarts: u32 },
}

impl fmt::Display for RolloutFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { waited_secs } => write!(f, "not ready after {waited_secs}s"),
            Self::CrashLoop { restarts } => write!(f, "crash loop ({restarts} restarts)"),
        }
    }
}

/// Outcome of one rollout run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutReport {
    /// Terminal state: `Healthy` or `RolledBack`. `Failed` never
    /// surfaces in a report: a failed rollout either reverts (moving
    /// to `RolledBack`) or escalates as [`RolloutError::RollbackFailed`].
    pub state: RolloutState,
    /// Image the deployment ran before the patch (the rollback target).
    pub previous_image: String,
    /// Status polls performed after the patch.
    pub polls: u32,
    /// Present when `state` is `RolledBack`.
    pub failure: Option<RolloutFailure>,
}

impl RolloutReport {
    pub fn is_healthy(&self) -> bool {
        self.state == RolloutState::Healthy
    }
}

/// Drives a deployment target onto a new image.
pub struct RolloutDriver<'a> {
    orchestrator: &'a dyn Orchestrator,
    settings: RolloutSettings,
}

impl<'a> RolloutDriver<'a> {
    pub fn new(orchestrator: &'a dyn Orchestrator, settings: RolloutSettings) -> Self {
        Self {
            orchestrator,
            settings,
        }
    }

    /// Patch `target` to `image` and poll until every replica is ready.
    ///
    /// On timeout or crash loop the previous image is restored — one
    /// attempt only. A failed restore escalates as
    /// [`RolloutError::RollbackFailed`]; it is never retried.
    pub async fn run(&self, target: &DeploymentRef, image: &str) -> RolloutResult<RolloutReport> {
        let before = self.orchestrator.status(target).await?;
        let previous_image = before.image.clone();
        // Pods carry lifetime restart counts; only restarts beyond this
        // snapshot are attributable to the new image.
        let baseline_restarts = before.restarts;

        info!(
            deployment = %target,
            from = previous_image.as_str(),
            to = image,
            replicas = before.total_replicas,
            "starting rollout"
        );

        debug!(deployment = %target, state = %RolloutState::Pending, "patching image");
        self.orchestrator.set_image(target, image).await?;
        debug!(deployment = %target, state = %RolloutState::InProgress, "patch applied");

        let started = Instant::now();
        let deadline = started + self.settings.timeout();
        let mut polls = 0u32;

        let failure = loop {
            tokio::time::sleep(self.settings.poll_interval()).await;
            polls += 1;

            let status = self.orchestrator.status(target).await?;
            let new_restarts = status.restarts.saturating_sub(baseline_restarts);
            debug!(
                deployment = %target,
                poll = polls,
                ready = status.ready_replicas,
                total = status.total_replicas,
                restarts = new_restarts,
                "rollout status"
            );

            if new_restarts >= self.settings.crash_loop_threshold {
                break RolloutFailure::CrashLoop {
                    restarts: new_restarts,
                };
            }

            if status.image == image && status.all_ready() {
                info!(deployment = %target, image, polls, "rollout healthy");
                return Ok(RolloutReport {
                    state: RolloutState::Healthy,
                    previous_image,
                    polls,
                    failure: None,
                });
            }

            if Instant::now() >= deadline {
                break RolloutFailure::Timeout {
                    waited_secs: started.elapsed().as_secs(),
                };
            }
        };

        // Revert once, then either RolledBack or escalate.
        warn!(deployment = %target, image, state = %RolloutState::Failed, %failure, "rollout failed, reverting image");

        match self.orchestrator.set_image(target, &previous_image).await {
            Ok(()) => {
                warn!(deployment = %target, image = previous_image.as_str(), "rollback applied");
                Ok(RolloutReport {
                    state: RolloutState::RolledBack,
                    previous_image,
                    polls,
                    failure: Some(failure),
                })
            }
            Err(e) => Err(RolloutError::RollbackFailed {
                target: target.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
