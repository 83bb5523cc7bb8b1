//! Error types for registry operations.

use shiplane_core::Digest;
use thiserror::Error;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur talking to a container registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Transport failure or 5xx. Retryable with backoff.
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    /// The requested tag, manifest, or dev channel has no artifact.
    #[error("not found: {0}")]
    NotFound(String),

    /// The tag already holds a different digest. Requires manual intervention.
    #[error("tag {tag} already holds {existing}, refusing to push {attempted}")]
    Conflict {
        tag: String,
        existing: Digest,
        attempted: Digest,
    },

    #[error("registry authentication failed: {0}")]
    Auth(String),

    /// The registry answered with something the client cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RegistryError {
    /// Whether a retry with backoff can plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(e: reqwest::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}
