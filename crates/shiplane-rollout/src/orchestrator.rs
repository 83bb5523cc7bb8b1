//! The `Orchestrator` trait — what shiplane needs from a deployment API.

use async_trait::async_trait;

use shiplane_core::DeploymentRef;

use crate::error::RolloutResult;

/// Point-in-time status of a deployment target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentStatus {
    /// Image reference currently configured on the deployment.
    pub image: String,
    /// Replicas reporting ready.
    pub ready_replicas: u32,
    /// Desired replica count.
    pub total_replicas: u32,
    /// Lifetime container restarts summed across the deployment's pods.
    /// Callers interested in restarts caused by an image change must
    /// diff this against a snapshot taken before the change.
    pub restarts: u32,
}

impl DeploymentStatus {
    pub fn all_ready(&self) -> bool {
        self.total_replicas > 0 && self.ready_replicas == self.total_replicas
    }
}

/// Operations shiplane needs from a container orchestrator.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Fetch the deployment's current image and readiness.
    async fn status(&self, target: &DeploymentRef) -> RolloutResult<DeploymentStatus>;

    /// Patch the deployment's image reference.
    async fn set_image(&self, target: &DeploymentRef, image: &str) -> RolloutResult<()>;
}
