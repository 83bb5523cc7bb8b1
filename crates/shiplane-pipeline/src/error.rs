//! Pipeline error type — a thin union over the stage errors.
//!
//! Data-integrity and conflict conditions propagate unmodified; the CLI
//! maps each variant to its exit code.

use thiserror::Error;

use shiplane_core::TagError;
use shiplane_ledger::LedgerError;
use shiplane_registry::RegistryError;
use shiplane_rollout::RolloutError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Tag(#[from] TagError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Rollout(#[from] RolloutError),
}
