//! In-memory orchestrator with a scripted readiness schedule, for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use shiplane_core::DeploymentRef;

use crate::error::{RolloutError, RolloutResult};
use crate::orchestrator::{DeploymentStatus, Orchestrator};

struct Inner {
    image: String,
    total_replicas: u32,
    /// Polls after a patch before the deployment reports ready.
    /// `None` means it never converges.
    ready_after: Option<u32>,
    /// Lifetime restarts the pods already carry before any patch.
    baseline_restarts: u32,
    /// Additional restarts reported once a patch has been applied.
    restarts_after_patch: u32,
    /// Patches beyond this count fail (for rollback-failure tests).
    max_patches: Option<u32>,
    patched: bool,
    polls_since_patch: u32,
    patch_count: u32,
}

/// Scriptable orchestrator backed by a mutex.
#[derive(Clone)]
pub struct MemoryOrchestrator {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryOrchestrator {
    /// A steady deployment running `image` with `total_replicas` ready
    /// replicas, which converges on the first poll after a patch.
    pub fn new(image: &str, total_replicas: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                image: image.to_string(),
                total_replicas,
                ready_after: Some(1),
                baseline_restarts: 0,
                restarts_after_patch: 0,
                max_patches: None,
                patched: false,
                polls_since_patch: 0,
                patch_count: 0,
            })),
        }
    }

    /// Report ready only after `polls` status calls following a patch.
    pub fn ready_after(self, polls: u32) -> Self {
        self.inner.lock().unwrap().ready_after = Some(polls);
        self
    }

    /// Never converge after a patch.
    pub fn never_ready(self) -> Self {
        self.inner.lock().unwrap().ready_after = None;
        self
    }

    /// Report this many restarts on top of the baseline once patched.
    pub fn crash_looping(self, restarts: u32) -> Self {
        self.inner.lock().unwrap().restarts_after_patch = restarts;
        self
    }

    /// Pods start out carrying this many lifetime restarts.
    pub fn with_historical_restarts(self, restarts: u32) -> Self {
        self.inner.lock().unwrap().baseline_restarts = restarts;
        self
    }

    /// Fail any patch beyond the first `n`.
    pub fn fail_patches_after(self, n: u32) -> Self {
        self.inner.lock().unwrap().max_patches = Some(n);
        self
    }

    /// Image currently configured on the deployment.
    pub fn current_image(&self) -> String {
        self.inner.lock().unwrap().image.clone()
    }

    /// Number of patches applied so far.
    pub fn patch_count(&self) -> u32 {
        self.inner.lock().unwrap().patch_count
    }
}

#[async_trait]
impl Orchestrator for MemoryOrchestrator {
    async fn status(&self, _target: &DeploymentRef) -> RolloutResult<DeploymentStatus> {
        let mut inner = self.inner.lock().unwrap();

        let (ready, restarts) = if inner.patched {
            inner.polls_since_patch += 1;
            let converged = inner
                .ready_after
                .is_some_and(|n| inner.polls_since_patch >= n);
            let ready = if converged {
                inner.total_replicas
            } else {
                inner.total_replicas.saturating_sub(1)
            };
            (
                ready,
                inner.baseline_restarts + inner.restarts_after_patch,
            )
        } else {
            (inner.total_replicas, inner.baseline_restarts)
        };

        Ok(DeploymentStatus {
            image: inner.image.clone(),
            ready_replicas: ready,
            total_replicas: inner.total_replicas,
            restarts,
        })
    }

    async fn set_image(&self, target: &DeploymentRef, image: &str) -> RolloutResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(max) = inner.max_patches {
            if inner.patch_count >= max {
                return Err(RolloutError::Unavailable(format!(
                    "patch of {target} refused by test harness"
                )));
            }
        }
        inner.image = image.to_string();
        inner.patched = true;
        inner.polls_since_patch = 0;
        inner.patch_count += 1;
        Ok(())
    }
}
