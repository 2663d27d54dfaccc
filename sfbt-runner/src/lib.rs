//! sf-backtester runner — plan a run, preview it, or submit it.
//!
//! - `plan`: config → constraint resolution → per-year tasks → rendered scripts
//! - `controller`: dry-run previews and bounded, best-effort submission
//! - `scheduler`: the `Scheduler` trait and the `sbatch` implementation
//! - `report`: per-task outcomes and the JSON/CSV artifacts

pub mod controller;
pub mod error;
pub mod plan;
pub mod report;
pub mod scheduler;

pub use controller::{ScriptPreview, SubmissionController};
pub use error::RunError;
pub use plan::{plan, plan_from_data, PlannedTask, RunPlan};
pub use report::{ReportError, SubmissionReport, TaskOutcome, TaskReport};
pub use scheduler::{parse_job_id, JobId, SbatchScheduler, Scheduler, SubmitError};
