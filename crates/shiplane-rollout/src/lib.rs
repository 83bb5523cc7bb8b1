//! shiplane-rollout — rollout driver for deployment targets.
//!
//! Patches a deployment's image reference, polls the orchestrator until
//! every replica reports ready, and reverts to the previous image on
//! timeout or crash loop. Rollback is attempted exactly once; if the
//! revert itself fails, the error escalates instead of looping.
//!
//! # State machine
//!
//! ```text
//! Pending ──patch──▶ InProgress ──all ready──▶ Healthy
//!                        │
//!                        ├─timeout / crash loop─▶ Failed
//!                        │                          │
//!                        │                   revert succeeds ─▶ RolledBack
//!                        │                   revert fails ───▶ error (escalate)
//! ```

pub mod driver;
pub mod error;
pub mod http;
pub mod memory;
pub mod orchestrator;

pub use driver::{RolloutDriver, RolloutFailure, RolloutReport};
pub use error::{RolloutError, RolloutResult};
pub use http::HttpOrchestrator;
pub use memory::MemoryOrchestrator;
pub use orchestrator::{DeploymentStatus, Orchestrator};
