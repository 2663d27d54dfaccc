use thiserror::Error;

use sfbt_core::{ConfigError, ConstraintError, DataError, PartitionError, RenderError};

use crate::report::ReportError;

/// Errors that stop a whole run. Per-task submission failures are not here;
/// they are recorded in the `SubmissionReport`.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Constraint(#[from] ConstraintError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Partition(#[from] PartitionError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to fingerprint config: {0}")]
    Fingerprint(#[from] serde_json::Error),
    #[error("failed to build submission pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Report(#[from] ReportError),
}
