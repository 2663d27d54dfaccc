//! The batch-scheduler boundary.
//!
//! A `Scheduler` takes a script that is already on disk and returns the job id
//! the cluster assigned to it. It does not wait for the job to run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

pub const DEFAULT_SCHEDULER_COMMAND: &str = "sbatch";

/// Scheduler-assigned job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why one task's submission failed.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("failed to prepare '{path}': {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("'{command}' exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("no job id in scheduler output: {stdout:?}")]
    UnparseableOutput { stdout: String },
    /// For `Scheduler` implementations that get a refusal back without a
    /// process exit status (API clients, wrappers, mocks).
    #[error("scheduler rejected the job: {0}")]
    Rejected(String),
}

/// Submits one script per call. Implementations must be callable from
/// several threads at once.
pub trait Scheduler: Send + Sync {
    fn submit(&self, script_path: &Path) -> Result<JobId, SubmitError>;
}

/// Runs `sbatch <script>` (or a configured wrapper) and parses the job id from stdout.
#[derive(Debug, Clone)]
pub struct SbatchScheduler {
    program: String,
    args: Vec<String>,
}

impl SbatchScheduler {
    /// `command` is split on whitespace; the script path is appended as the last argument.
    /// A blank command falls back to `sbatch`.
    pub fn new(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(str::to_string);
        match parts.next() {
            Some(program) => Self {
                program,
                args: parts.collect(),
            },
            None => Self::default(),
        }
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for SbatchScheduler {
    fn default() -> Self {
        Self {
            program: DEFAULT_SCHEDULER_COMMAND.to_string(),
            args: Vec::new(),
        }
    }
}

impl Scheduler for SbatchScheduler {
    fn submit(&self, script_path: &Path) -> Result<JobId, SubmitError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(script_path)
            .output()
            .map_err(|source| SubmitError::Spawn {
                command: self.command_line(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(SubmitError::CommandFailed {
                command: self.command_line(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        parse_job_id(&stdout).ok_or_else(|| SubmitError::UnparseableOutput {
            stdout: stdout.trim().to_string(),
        })
    }
}

/// Last all-digit token of `stdout`, e.g. `Submitted batch job 12345` → `12345`.
/// `sbatch --parsable` output (`12345;cluster`) is also accepted.
pub fn parse_job_id(stdout: &str) -> Option<JobId> {
    stdout
        .split(|c: char| c.is_whitespace() || c == ';')
        .filter(|tok| !tok.is_empty() && tok.bytes().all(|b| b.is_ascii_digit()))
        .last()
        .map(|tok| JobId(tok.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sbatch_banner() {
        assert_eq!(
            parse_job_id("Submitted batch job 12345\n"),
            Some(JobId("12345".into()))
        );
    }

    #[test]
    fn parses_parsable_output() {
        assert_eq!(parse_job_id("987;cluster\n"), Some(JobId("987".into())));
    }

    #[test]
    fn takes_last_numeric_token() {
        assert_eq!(
            parse_job_id("queue 3 busy\nSubmitted batch job 44"),
            Some(JobId("44".into()))
        );
    }

    #[test]
    fn no_digits_no_job_id() {
        assert_eq!(parse_job_id("sbatch: error: Batch job submission failed"), None);
        assert_eq!(parse_job_id(""), None);
    }

    #[test]
    fn rejection_message_carries_the_reason() {
        let err = SubmitError::Rejected("QOSMaxSubmitJobPerUserLimit".into());
        assert_eq!(
            err.to_string(),
            "scheduler rejected the job: QOSMaxSubmitJobPerUserLimit"
        );
    }

    #[test]
    fn command_is_split_on_whitespace() {
        let s = SbatchScheduler::new("ssh login1  sbatch");
        assert_eq!(s.program, "ssh");
        assert_eq!(s.args, vec!["login1".to_string(), "sbatch".to_string()]);
        assert_eq!(s.command_line(), "ssh login1 sbatch");
    }

    #[test]
    fn blank_command_is_sbatch() {
        assert_eq!(SbatchScheduler::new("  ").command_line(), "sbatch");
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let s = SbatchScheduler::new("/nonexistent/sfbt-sbatch");
        let err = s.submit(Path::new("/tmp/job.sbatch")).unwrap_err();
        assert!(matches!(err, SubmitError::Spawn { .. }));
    }

    #[cfg(unix)]
    mod fake_sbatch {
        use super::*;
        use std::fs;

        /// Run through `sh` so the test never execs a freshly written file.
        fn fake(dir: &Path, body: &str) -> String {
            let path = dir.join("fake-sbatch");
            fs::write(&path, format!("{body}\n")).unwrap();
            format!("sh {}", path.display())
        }

        #[test]
        fn accepted_script_returns_job_id() {
            let dir = tempfile::tempdir().unwrap();
            let bin = fake(dir.path(), "echo \"Submitted batch job 777\"");
            let s = SbatchScheduler::new(&bin);
            assert_eq!(
                s.submit(Path::new("/tmp/job.sbatch")).unwrap(),
                JobId("777".into())
            );
        }

        #[test]
        fn nonzero_exit_carries_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let bin = fake(dir.path(), "echo 'invalid partition' >&2\nexit 1");
            let s = SbatchScheduler::new(&bin);
            match s.submit(Path::new("/tmp/job.sbatch")).unwrap_err() {
                SubmitError::CommandFailed { stderr, .. } => {
                    assert_eq!(stderr, "invalid partition")
                }
                other => panic!("expected CommandFailed, got {other:?}"),
            }
        }

        #[test]
        fn silent_success_is_unparseable() {
            let dir = tempfile::tempdir().unwrap();
            let bin = fake(dir.path(), "echo queued");
            let s = SbatchScheduler::new(&bin);
            assert!(matches!(
                s.submit(Path::new("/tmp/job.sbatch")).unwrap_err(),
                SubmitError::UnparseableOutput { .. }
            ));
        }

        #[test]
        fn script_path_is_the_last_argument() {
            let dir = tempfile::tempdir().unwrap();
            let bin = fake(dir.path(), "echo \"$1\" \"$2\" >&2; exit 3");
            let s = SbatchScheduler::new(&format!("{bin} --hold"));
            match s.submit(Path::new("/tmp/job.sbatch")).unwrap_err() {
                SubmitError::CommandFailed { stderr, .. } => {
                    assert_eq!(stderr, "--hold /tmp/job.sbatch")
                }
                other => panic!("expected CommandFailed, got {other:?}"),
            }
        }
    }
}
