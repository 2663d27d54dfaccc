//! SubmissionController — dry-run previews and bounded submission.
//!
//! Submit mode dispatches tasks in ascending year order from the calling
//! thread. Each submission runs on a rayon pool sized to
//! `max_concurrent_jobs`, and a gate blocks the dispatcher while that many
//! calls are unacknowledged. A failed task is recorded and the loop goes on;
//! nothing is retried.

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Condvar, Mutex, PoisonError};

use crate::error::RunError;
use crate::plan::{PlannedTask, RunPlan};
use crate::report::{SubmissionReport, TaskOutcome, TaskReport, SCHEMA_VERSION};
use crate::scheduler::{JobId, Scheduler, SubmitError};

/// A script as it would be submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptPreview {
    pub year: i32,
    pub job_name: String,
    pub script_path: PathBuf,
    pub script: String,
}

#[derive(Debug, Clone, Copy)]
pub struct SubmissionController {
    max_in_flight: usize,
}

impl SubmissionController {
    /// At most `max_in_flight` scheduler calls outstanding at once (minimum 1).
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Bound taken from the plan's `slurm.max_concurrent_jobs`.
    pub fn for_plan(plan: &RunPlan) -> Self {
        Self::new(plan.config().slurm().max_concurrent_jobs())
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Every task's script, exactly as submit mode would write it.
    /// Touches neither the filesystem nor the scheduler.
    pub fn dry_run(&self, plan: &RunPlan) -> Vec<ScriptPreview> {
        tracing::info!(tasks = plan.tasks().len(), "dry run: no jobs will be submitted");
        plan.tasks()
            .iter()
            .map(|p| ScriptPreview {
                year: p.task.year,
                job_name: p.task.job_name.clone(),
                script_path: p.task.script_path.clone(),
                script: p.script.clone(),
            })
            .collect()
    }

    /// Write and submit every task's script.
    ///
    /// Returns `Err` only if the submission pool cannot be built. Per-task
    /// failures and cancellations are in the report.
    pub fn submit(
        &self,
        plan: &RunPlan,
        scheduler: &dyn Scheduler,
        cancel: Option<&AtomicBool>,
    ) -> Result<SubmissionReport, RunError> {
        let tasks = plan.tasks();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_in_flight.min(tasks.len()).max(1))
            .thread_name(|i| format!("sfbt-submit-{i}"))
            .build()?;

        tracing::info!(
            tasks = tasks.len(),
            max_in_flight = self.max_in_flight,
            config_hash = plan.config_hash().short(),
            "submitting"
        );

        let gate = Gate::new(self.max_in_flight);
        let (tx, rx) = mpsc::channel::<(usize, TaskOutcome)>();
        let mut outcomes: Vec<Option<TaskOutcome>> = vec![None; tasks.len()];

        pool.in_place_scope(|scope| {
            for (index, planned) in tasks.iter().enumerate() {
                let permit = gate.acquire();
                if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
                    tracing::warn!(
                        remaining = tasks.len() - index,
                        "cancelled; remaining tasks not submitted"
                    );
                    break;
                }
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let outcome = submit_one(planned, scheduler);
                    drop(permit);
                    // The receiver outlives the scope.
                    let _ = tx.send((index, outcome));
                });
            }
        });
        drop(tx);

        for (index, outcome) in rx {
            outcomes[index] = Some(outcome);
        }

        let report = SubmissionReport {
            schema_version: SCHEMA_VERSION,
            config_hash: plan.config_hash().clone(),
            signal_name: plan.config().signal_name().to_string(),
            gamma: plan.config().gamma(),
            created_at: Utc::now(),
            tasks: tasks
                .iter()
                .zip(outcomes)
                .map(|(p, o)| TaskReport::new(&p.task, o.unwrap_or(TaskOutcome::Cancelled)))
                .collect(),
        };

        tracing::info!(
            submitted = report.submitted_count(),
            failed = report.failed_count(),
            cancelled = report.cancelled_count(),
            "submission finished"
        );
        Ok(report)
    }
}

fn submit_one(planned: &PlannedTask, scheduler: &dyn Scheduler) -> TaskOutcome {
    let task = &planned.task;
    tracing::debug!(year = task.year, job = %task.job_name, "dispatching");

    match prepare(planned).and_then(|()| scheduler.submit(&task.script_path)) {
        Ok(JobId(job_id)) => {
            tracing::info!(year = task.year, job = %task.job_name, job_id = %job_id, "submitted");
            TaskOutcome::Submitted { job_id }
        }
        Err(e) => {
            tracing::warn!(year = task.year, job = %task.job_name, error = %e, "submission failed");
            TaskOutcome::SubmissionFailed {
                error: e.to_string(),
            }
        }
    }
}

/// Output, log and script directories, then the script file itself.
fn prepare(planned: &PlannedTask) -> Result<(), SubmitError> {
    let task = &planned.task;
    for path in [&task.output_path, &task.log_path, &task.script_path] {
        if let Some(dir) = path.parent() {
            create_dir(dir)?;
        }
    }
    fs::write(&task.script_path, &planned.script).map_err(|source| SubmitError::Prepare {
        path: task.script_path.clone(),
        source,
    })
}

fn create_dir(dir: &Path) -> Result<(), SubmitError> {
    fs::create_dir_all(dir).map_err(|source| SubmitError::Prepare {
        path: dir.to_path_buf(),
        source,
    })
}

/// Counting gate: `acquire` blocks while `limit` permits are out.
struct Gate {
    in_flight: Mutex<usize>,
    freed: Condvar,
    limit: usize,
}

struct Permit<'a> {
    gate: &'a Gate,
}

impl Gate {
    fn new(limit: usize) -> Self {
        Self {
            in_flight: Mutex::new(0),
            freed: Condvar::new(),
            limit,
        }
    }

    fn acquire(&self) -> Permit<'_> {
        let mut n = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        while *n >= self.limit {
            n = self.freed.wait(n).unwrap_or_else(PoisonError::into_inner);
        }
        *n += 1;
        Permit { gate: self }
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let mut n = self
            .gate
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *n -= 1;
        self.gate.freed.notify_one();
    }
}
