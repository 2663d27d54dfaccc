//! Starter config written by `init`.

use std::fs;
use std::path::Path;

use super::ConfigError;

pub const CONFIG_TEMPLATE: &str = r#"# sf-backtester configuration
#
# One SLURM job is submitted per calendar year found in the `date` column
# of `data_path`. Weights land in `{output_dir}/{year}.parquet`.

# Name of the signal; used in output paths and job names.
signal_name: momentum

# Risk aversion passed to the optimizer.
gamma: 50.0

# Parquet file with columns: date, barrid, alpha, predicted_beta.
data_path: /path/to/signal_data.parquet

# Project checkout on the cluster (its .venv is activated by each job).
project_root: /path/to/project

# Address for SLURM notifications.
email: your_email@example.edu

# Constraint names resolved against the built-in registry
# (ZeroBeta, ZeroInvestment) plus `constraint_registry`.
constraints:
  - ZeroInvestment

# Extra or replacement constraint implementations (name -> import path).
# constraint_registry:
#   LongOnly: my_package.constraints.LongOnly

# Defaults: {project_root}/weights/{signal_name}/{gamma}
#           {project_root}/logs/{signal_name}/{gamma}
# output_dir: /path/to/weights
# logs_dir: /path/to/logs

slurm:
  n_cpus: 8
  mem: 32G
  time: "06:00:00"
  mail_type: BEGIN,END,FAIL
  max_concurrent_jobs: 31
"#;

/// Write `CONFIG_TEMPLATE` to `path`. Refuses to replace an existing file unless `force`.
pub fn write_template(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "file exists (use --force to overwrite)",
            ),
        });
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, CONFIG_TEMPLATE).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
