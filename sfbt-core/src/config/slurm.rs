//! Scheduler resource parameters (`slurm:` section).

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use super::ConfigError;

pub const DEFAULT_N_CPUS: u32 = 8;
pub const DEFAULT_MEM: &str = "32G";
pub const DEFAULT_TIME: &str = "06:00:00";
pub const DEFAULT_MAIL_TYPE: &str = "BEGIN,END,FAIL";
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 31;

/// Event names accepted by `--mail-type`.
pub const SLURM_MAIL_EVENTS: &[&str] = &[
    "NONE",
    "BEGIN",
    "END",
    "FAIL",
    "REQUEUE",
    "ALL",
    "INVALID_DEPEND",
    "STAGE_OUT",
    "TIME_LIMIT",
    "TIME_LIMIT_90",
    "TIME_LIMIT_80",
    "TIME_LIMIT_50",
    "ARRAY_TASKS",
];

static MEM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]*[KMGT]?$").expect("valid mem pattern"));
static TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2}:[0-5][0-9]:[0-5][0-9]$").expect("valid time pattern"));

/// Unvalidated `slurm:` fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlurmInput {
    pub n_cpus: Option<i64>,
    pub mem: Option<String>,
    pub time: Option<String>,
    pub mail_type: Option<String>,
    pub max_concurrent_jobs: Option<i64>,
}

/// Validated scheduler resources for every task of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlurmConfig {
    n_cpus: u32,
    mem: String,
    time: String,
    mail_type: String,
    max_concurrent_jobs: usize,
}

impl Default for SlurmConfig {
    fn default() -> Self {
        Self {
            n_cpus: DEFAULT_N_CPUS,
            mem: DEFAULT_MEM.to_string(),
            time: DEFAULT_TIME.to_string(),
            mail_type: DEFAULT_MAIL_TYPE.to_string(),
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
        }
    }
}

impl SlurmConfig {
    pub fn new(input: SlurmInput) -> Result<Self, ConfigError> {
        let n_cpus = match input.n_cpus {
            None => DEFAULT_N_CPUS,
            Some(n) => u32::try_from(n)
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| ConfigError::invalid("slurm.n_cpus", n, "a positive integer"))?,
        };

        let max_concurrent_jobs = match input.max_concurrent_jobs {
            None => DEFAULT_MAX_CONCURRENT_JOBS,
            Some(n) => usize::try_from(n).ok().filter(|n| *n >= 1).ok_or_else(|| {
                ConfigError::invalid("slurm.max_concurrent_jobs", n, "a positive integer")
            })?,
        };

        let mem = input.mem.unwrap_or_else(|| DEFAULT_MEM.to_string());
        if !MEM_PATTERN.is_match(&mem) {
            return Err(ConfigError::invalid(
                "slurm.mem",
                format!("{mem:?}"),
                "a memory size such as 32G, 512M or 16000",
            ));
        }

        let time = input.time.unwrap_or_else(|| DEFAULT_TIME.to_string());
        if !TIME_PATTERN.is_match(&time) {
            return Err(ConfigError::invalid(
                "slurm.time",
                format!("{time:?}"),
                "HH:MM:SS",
            ));
        }

        let mail_type = input
            .mail_type
            .unwrap_or_else(|| DEFAULT_MAIL_TYPE.to_string());
        validate_mail_type(&mail_type)?;

        Ok(Self {
            n_cpus,
            mem,
            time,
            mail_type,
            max_concurrent_jobs,
        })
    }

    pub(crate) fn to_input(&self) -> SlurmInput {
        SlurmInput {
            n_cpus: Some(i64::from(self.n_cpus)),
            mem: Some(self.mem.clone()),
            time: Some(self.time.clone()),
            mail_type: Some(self.mail_type.clone()),
            max_concurrent_jobs: Some(self.max_concurrent_jobs as i64),
        }
    }

    pub fn n_cpus(&self) -> u32 {
        self.n_cpus
    }

    pub fn mem(&self) -> &str {
        &self.mem
    }

    pub fn time(&self) -> &str {
        &self.time
    }

    pub fn mail_type(&self) -> &str {
        &self.mail_type
    }

    /// Ceiling on submission calls awaiting scheduler acknowledgment.
    pub fn max_concurrent_jobs(&self) -> usize {
        self.max_concurrent_jobs
    }
}

fn validate_mail_type(mail_type: &str) -> Result<(), ConfigError> {
    let valid = !mail_type.is_empty()
        && mail_type
            .split(',')
            .all(|event| SLURM_MAIL_EVENTS.contains(&event));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            "slurm.mail_type",
            format!("{mail_type:?}"),
            "a comma-separated list of SLURM mail events (e.g. BEGIN,END,FAIL)",
        ))
    }
}
