//! Retry with exponential backoff for transient registry errors.
//!
//! Only errors whose [`RegistryError::is_transient`] returns true are
//! retried. Data-integrity and conflict errors propagate immediately.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use shiplane_core::config::RegistryConfig;

use crate::error::{RegistryError, RegistryResult};

/// Attempt and backoff bounds for transient errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, first try included.
    pub max_attempts: u32,
    /// Initial backoff; doubles per failed attempt.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RegistryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

/// Run `op` until it succeeds, fails non-transiently, or exhausts the
/// policy's attempts.
pub async fn with_retry<T, F, Fut>(name: &str, policy: RetryPolicy, mut op: F) -> RegistryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RegistryResult<T>>,
{
    let mut backoff = policy.base_backoff;
    let mut attempt = 1u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                warn!(
                    op = name,
                    attempt,
                    max = policy.max_attempts,
                    error = %e,
                    "transient registry error, backing off"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
