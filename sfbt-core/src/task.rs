//! Per-year tasks: one scheduler job per calendar year in the dataset.

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigModel;

#[derive(Debug, Error, PartialEq)]
pub enum PartitionError {
    #[error("no tasks generated: no years found in '{data_path}'")]
    NoTasksGenerated { data_path: PathBuf },
}

/// One year of work and the paths it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub year: i32,
    /// `{signal_name}_{gamma}_{year}`; unique within a run.
    pub job_name: String,
    /// `{output_dir}/{year}.parquet`
    pub output_path: PathBuf,
    /// `{logs_dir}/{year}.log`, receives both stdout and stderr.
    pub log_path: PathBuf,
    /// `{project_root}/temp/{job_name}.sbatch`
    pub script_path: PathBuf,
}

impl Task {
    pub fn new(config: &ConfigModel, year: i32) -> Self {
        let job_name = job_name(config, year);
        Self {
            year,
            output_path: config.output_dir().join(format!("{year}.parquet")),
            log_path: config.logs_dir().join(format!("{year}.log")),
            script_path: config.script_dir().join(format!("{job_name}.sbatch")),
            job_name,
        }
    }
}

pub fn job_name(config: &ConfigModel, year: i32) -> String {
    format!("{}_{}_{year}", config.signal_name(), config.gamma_label())
}

/// One task per distinct year, ascending. Input order and duplicates don't matter.
///
/// No filesystem access: directories are created by the submitter.
pub fn partition(
    config: &ConfigModel,
    years: impl IntoIterator<Item = i32>,
) -> Result<Vec<Task>, PartitionError> {
    let years: BTreeSet<i32> = years.into_iter().collect();
    if years.is_empty() {
        return Err(PartitionError::NoTasksGenerated {
            data_path: config.data_path().to_path_buf(),
        });
    }
    Ok(years.into_iter().map(|y| Task::new(config, y)).collect())
}
