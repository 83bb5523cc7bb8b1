//! Exit-code mapping — the machine-readable outcome of a run.

use shiplane_pipeline::PipelineError;
use shiplane_registry::RegistryError;
use shiplane_rollout::RolloutError;

pub const SUCCESS: u8 = 0;
pub const OTHER: u8 = 1;
pub const NOT_FOUND: u8 = 2;
pub const MALFORMED: u8 = 3;
pub const CONFLICT: u8 = 4;
pub const ROLLOUT_FAILED: u8 = 5;
pub const ROLLBACK_FAILED: u8 = 6;
pub const UNAVAILABLE: u8 = 7;

/// Map an error to the process exit code.
pub fn code_for(err: &anyhow::Error) -> u8 {
    let Some(pipeline_err) = err.downcast_ref::<PipelineError>() else {
        return OTHER;
    };

    match pipeline_err {
        PipelineError::Tag(_) => MALFORMED,
        PipelineError::Registry(e) => match e {
            RegistryError::NotFound(_) => NOT_FOUND,
            RegistryError::Conflict { .. } => CONFLICT,
            RegistryError::Unavailable(_) => UNAVAILABLE,
            _ => OTHER,
        },
        PipelineError::Ledger(_) => OTHER,
        PipelineError::Rollout(e) => match e {
            RolloutError::RollbackFailed { .. } => ROLLBACK_FAILED,
            RolloutError::NotFound(_) => NOT_FOUND,
            RolloutError::Unavailable(_) => UNAVAILABLE,
            _ => OTHER,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiplane_core::{Digest, TagError};

    fn wrap(e: PipelineError) -> anyhow::Error {
        anyhow::Error::new(e)
    }

    #[test]
    fn maps_distinct_codes() {
        assert_eq!(
            code_for(&wrap(PipelineError::Tag(TagError::Malformed("x".into())))),
            MALFORMED
        );
        assert_eq!(
            code_for(&wrap(PipelineError::Registry(RegistryError::NotFound(
                "no dev tag".into()
            )))),
            NOT_FOUND
        );
        assert_eq!(
            code_for(&wrap(PipelineError::Registry(RegistryError::Conflict {
                tag: "app:1.2.0".into(),
                existing: Digest::of(b"a"),
                attempted: Digest::of(b"b"),
            }))),
            CONFLICT
        );
        assert_eq!(
            code_for(&wrap(PipelineError::Rollout(
                RolloutError::RollbackFailed {
                    target: "prod/app".into(),
                    reason: "api down".into(),
                }
            ))),
            ROLLBACK_FAILED
        );
        assert_eq!(
            code_for(&wrap(PipelineError::Registry(RegistryError::Unavailable(
                "timeout".into()
            )))),
            UNAVAILABLE
        );
    }

    #[test]
    fn unknown_errors_fall_back_to_one() {
        assert_eq!(code_for(&anyhow::anyhow!("config missing")), OTHER);
    }
}
