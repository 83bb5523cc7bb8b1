//! shiplane-pipeline — the promote-then-deploy operation.
//!
//! Sequences the registry, promoter, and rollout driver into a single
//! run: resolve the latest dev tag, derive its stable counterpart,
//! promote by digest, roll the deployment target onto the promoted
//! image. Promotion failure means rollout is never attempted; rollout
//! failure leaves the stable tag promoted (re-deploying the prior image
//! is a rollback, not a de-promotion).
//!
//! Concurrent runs against the same deployment target are not serialized
//! here; callers that need that must hold an external lock keyed by the
//! target.

pub mod error;
pub mod pipeline;
pub mod promote;

pub use error::PipelineError;
pub use pipeline::{Pipeline, RunOutcome};
pub use promote::Promoter;
