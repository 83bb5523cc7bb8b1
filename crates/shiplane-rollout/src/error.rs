//! Error types for rollout operations.

use thiserror::Error;

/// Result type alias for rollout operations.
pub type RolloutResult<T> = Result<T, RolloutError>;

/// Errors that can occur driving a rollout.
#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("orchestrator unavailable: {0}")]
    Unavailable(String),

    #[error("deployment not found: {0}")]
    NotFound(String),

    #[error("orchestrator authentication failed: {0}")]
    Auth(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    /// The rollout failed and the revert to the previous image also
    /// failed. The deployment is in an unknown state; escalate.
    #[error("rollback of {target} failed: {reason}")]
    RollbackFailed { target: String, reason: String },
}

impl From<reqwest::Error> for RolloutError {
    fn from(e: reqwest::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}
