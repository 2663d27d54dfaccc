//! Shared fixtures: a config rooted in a temp dir and a mock scheduler.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use sfbt_core::{ConfigInput, ConfigModel, SlurmInput};
use sfbt_runner::{JobId, Scheduler, SubmitError};

pub fn config_in(root: &Path, max_concurrent_jobs: i64) -> ConfigModel {
    ConfigModel::new(ConfigInput {
        signal_name: Some("momentum".into()),
        gamma: Some(0.5),
        data_path: Some(root.join("signals.parquet")),
        project_root: Some(root.to_path_buf()),
        email: Some("quant@example.edu".into()),
        constraints: Some(vec!["ZeroInvestment".into()]),
        slurm: SlurmInput {
            max_concurrent_jobs: Some(max_concurrent_jobs),
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap()
}

type Hook = Box<dyn Fn(usize) + Send + Sync>;

/// Holds each call for `delay`, counts how many calls overlap, and fails
/// scripts whose job name ends with one of `fail_years`.
#[derive(Default)]
pub struct MockScheduler {
    delay: Duration,
    fail_years: HashSet<i32>,
    on_call: Option<Hook>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<PathBuf>>,
}

impl MockScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self, year: i32) -> Self {
        self.fail_years.insert(year);
        self
    }

    /// Called with the 1-based call number while the call is in flight.
    pub fn on_call(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_call = Some(Box::new(hook));
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl Scheduler for MockScheduler {
    fn submit(&self, script_path: &Path) -> Result<JobId, SubmitError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(script_path.to_path_buf());
            calls.len()
        };
        if let Some(hook) = &self.on_call {
            hook(call);
        }
        thread::sleep(self.delay);

        let stem = script_path.file_stem().unwrap().to_string_lossy().into_owned();
        let result = if self.fail_years.iter().any(|y| stem.ends_with(&format!("_{y}"))) {
            Err(SubmitError::Rejected(format!("mock rejected {stem}")))
        } else {
            Ok(JobId(format!("{}", 1000 + call)))
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
