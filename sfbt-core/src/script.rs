//! sbatch script rendering.
//!
//! `render_script` is the only producer of script text. Dry-run previews and
//! real submissions both call it with the same inputs, so the preview is the
//! submitted script byte for byte. No clock, randomness or environment is read.

use std::path::Path;
use thiserror::Error;

use crate::config::ConfigModel;
use crate::constraints::ResolvedConstraint;
use crate::task::Task;

#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("cannot render script: `{field}` {reason}")]
    ScriptRender { field: String, reason: String },
}

impl RenderError {
    fn field(field: &str, reason: &str) -> Self {
        RenderError::ScriptRender {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Environment variable carrying `NAME=import.path` pairs for every resolved constraint.
pub const CONSTRAINTS_ENV: &str = "SF_BACKTESTER_CONSTRAINTS";

/// Render the submission script for one task.
///
/// The worker is called with the flags the MVO worker parses: `--data_path`,
/// `--gamma`, `--year`, `--constraints NAME...`, `--output_dir`, `--n_cpus`.
/// It writes `{output_dir}/{year}.parquet` itself. Resolved import paths are
/// exported in `SF_BACKTESTER_CONSTRAINTS` for workers that load user constraints.
pub fn render_script(
    config: &ConfigModel,
    constraints: &[ResolvedConstraint],
    task: &Task,
) -> Result<String, RenderError> {
    let job_name = directive_value("signal_name", &task.job_name)?;
    let log_path = directive_value("logs_dir", path_str("logs_dir", &task.log_path)?)?;
    let email = directive_value("email", config.email())?;
    let data_path = shell_arg("data_path", path_str("data_path", config.data_path())?)?;
    let output_dir = shell_arg("output_dir", path_str("output_dir", config.output_dir())?)?;
    let venv = config.project_root().join(".venv").join("bin").join("activate");
    let activate = shell_arg("project_root", path_str("project_root", &venv)?)?;
    let worker = single_line("worker", config.worker())?;
    let slurm = config.slurm();

    let names: Vec<&str> = constraints.iter().map(|c| c.name.as_str()).collect();
    let impls: Vec<String> = constraints.iter().map(ToString::to_string).collect();

    Ok(format!(
        "#!/bin/bash\n\
         #SBATCH --job-name={job_name}\n\
         #SBATCH --output={log_path}\n\
         #SBATCH --error={log_path}\n\
         #SBATCH --cpus-per-task={n_cpus}\n\
         #SBATCH --mem={mem}\n\
         #SBATCH --time={time}\n\
         #SBATCH --mail-user={email}\n\
         #SBATCH --mail-type={mail_type}\n\
         \n\
         export RAY_ACCEL_ENV_VAR_OVERRIDE_ON_ZERO=0\n\
         export {CONSTRAINTS_ENV}='{impls}'\n\
         \n\
         source {activate}\n\
         echo \"Running year={year}\"\n\
         srun {worker} --data_path {data_path} --gamma {gamma} --year {year} --constraints {names} --output_dir {output_dir} --n_cpus {n_cpus}\n",
        n_cpus = slurm.n_cpus(),
        mem = slurm.mem(),
        time = slurm.time(),
        mail_type = slurm.mail_type(),
        year = task.year,
        gamma = config.gamma_label(),
        names = names.join(" "),
        impls = impls.join(" "),
    ))
}

fn path_str<'a>(field: &str, path: &'a Path) -> Result<&'a str, RenderError> {
    path.to_str()
        .ok_or_else(|| RenderError::field(field, "is not valid UTF-8"))
}

fn single_line<'a>(field: &str, value: &'a str) -> Result<&'a str, RenderError> {
    if value.chars().any(|c| c.is_control()) {
        return Err(RenderError::field(
            field,
            "contains a newline or control character",
        ));
    }
    Ok(value)
}

/// `#SBATCH --flag=value` values end at the first whitespace.
fn directive_value<'a>(field: &str, value: &'a str) -> Result<&'a str, RenderError> {
    single_line(field, value)?;
    if value.chars().any(char::is_whitespace) {
        return Err(RenderError::field(
            field,
            "contains whitespace, which #SBATCH directives cannot carry",
        ));
    }
    Ok(value)
}

/// Single-quote for bash.
fn shell_arg(field: &str, value: &str) -> Result<String, RenderError> {
    single_line(field, value)?;
    Ok(format!("'{}'", value.replace('\'', r"'\''")))
}
