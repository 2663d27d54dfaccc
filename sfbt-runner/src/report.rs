//! Per-task submission outcomes and the artifacts written after a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use sfbt_core::{ConfigHash, Task};

pub const SCHEMA_VERSION: u32 = 1;
pub const REPORT_JSON: &str = "submission_report.json";
pub const REPORT_CSV: &str = "submissions.csv";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// What happened to one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Submitted { job_id: String },
    SubmissionFailed { error: String },
    /// Never dispatched because the run was cancelled.
    Cancelled,
}

impl TaskOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, TaskOutcome::Submitted { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskOutcome::Submitted { .. } => "submitted",
            TaskOutcome::SubmissionFailed { .. } => "submission_failed",
            TaskOutcome::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    pub year: i32,
    pub job_name: String,
    pub script_path: PathBuf,
    pub output_path: PathBuf,
    pub log_path: PathBuf,
    pub outcome: TaskOutcome,
}

impl TaskReport {
    pub fn new(task: &Task, outcome: TaskOutcome) -> Self {
        Self {
            year: task.year,
            job_name: task.job_name.clone(),
            script_path: task.script_path.clone(),
            output_path: task.output_path.clone(),
            log_path: task.log_path.clone(),
            outcome,
        }
    }
}

/// Aggregate result of a submit-mode run, one entry per task in year order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config_hash: ConfigHash,
    pub signal_name: String,
    pub gamma: f64,
    pub created_at: DateTime<Utc>,
    pub tasks: Vec<TaskReport>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// One CSV row per task.
#[derive(Serialize)]
struct CsvRow<'a> {
    year: i32,
    job_name: &'a str,
    outcome: &'static str,
    job_id: Option<&'a str>,
    error: Option<&'a str>,
}

impl SubmissionReport {
    /// True only if every task was submitted. Drives the CLI exit status.
    pub fn all_submitted(&self) -> bool {
        self.tasks.iter().all(|t| t.outcome.is_submitted())
    }

    pub fn submitted_count(&self) -> usize {
        self.count(|o| o.is_submitted())
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::SubmissionFailed { .. }))
    }

    pub fn cancelled_count(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Cancelled))
    }

    fn count(&self, pred: impl Fn(&TaskOutcome) -> bool) -> usize {
        self.tasks.iter().filter(|t| pred(&t.outcome)).count()
    }

    pub fn outcome_for(&self, year: i32) -> Option<&TaskOutcome> {
        self.tasks.iter().find(|t| t.year == year).map(|t| &t.outcome)
    }

    /// Write `submission_report.json` and `submissions.csv` into `dir`.
    pub fn save_artifacts(&self, dir: &Path) -> Result<(PathBuf, PathBuf), ReportError> {
        fs::create_dir_all(dir).map_err(|source| ReportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let json_path = dir.join(REPORT_JSON);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&json_path, json).map_err(|source| ReportError::Io {
            path: json_path.clone(),
            source,
        })?;

        let csv_path = dir.join(REPORT_CSV);
        let mut writer = csv::Writer::from_path(&csv_path)?;
        for t in &self.tasks {
            let (job_id, error) = match &t.outcome {
                TaskOutcome::Submitted { job_id } => (Some(job_id.as_str()), None),
                TaskOutcome::SubmissionFailed { error } => (None, Some(error.as_str())),
                TaskOutcome::Cancelled => (None, None),
            };
            writer.serialize(CsvRow {
                year: t.year,
                job_name: &t.job_name,
                outcome: t.outcome.label(),
                job_id,
                error,
            })?;
        }
        writer.flush().map_err(|source| ReportError::Io {
            path: csv_path.clone(),
            source,
        })?;

        tracing::debug!(json = %json_path.display(), csv = %csv_path.display(), "wrote submission report");
        Ok((json_path, csv_path))
    }

    pub fn load_json(path: &Path) -> Result<Self, ReportError> {
        let data = fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&data)?)
    }
}
