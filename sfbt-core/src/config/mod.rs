//! Backtest configuration: one validated, immutable `ConfigModel` per run.
//!
//! Two ways in, one gate:
//! - `ConfigModel::new(ConfigInput)` for direct construction.
//! - `ConfigModel::from_document()` / `from_yaml_str()` / `from_file()` for
//!   structured documents. These only translate the document into a
//!   `ConfigInput` and then call `new()`, so both paths share every check.
//!
//! Derived paths (`output_dir`, `logs_dir`) default to
//! `{project_root}/weights|logs/{signal_name}/{gamma}`.

mod document;
mod slurm;
mod template;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use slurm::{SlurmConfig, SlurmInput, DEFAULT_MAX_CONCURRENT_JOBS, SLURM_MAIL_EVENTS};
pub use template::{write_template, CONFIG_TEMPLATE};

/// Constraint applied when the document does not list any.
pub const DEFAULT_CONSTRAINT: &str = "ZeroInvestment";

/// Worker entry point invoked on the compute node.
pub const DEFAULT_WORKER: &str = "python -m sf_backtester.scripts.mvo_worker";

/// Errors from building or loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required field `{field}`")]
    MissingField { field: String },

    #[error("invalid value for `{field}`: {value} (expected {expected})")]
    InvalidField {
        field: String,
        value: String,
        expected: String,
    },

    #[error("failed to parse {format} config: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn missing(field: &str) -> Self {
        ConfigError::MissingField {
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid(field: &str, value: impl ToString, expected: &str) -> Self {
        ConfigError::InvalidField {
            field: field.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }
}

/// Unvalidated configuration fields. Anything left `None` is either required
/// (and rejected by `ConfigModel::new`) or receives its documented default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigInput {
    pub signal_name: Option<String>,
    pub gamma: Option<f64>,
    pub data_path: Option<PathBuf>,
    pub project_root: Option<PathBuf>,
    pub email: Option<String>,
    pub constraints: Option<Vec<String>>,
    pub output_dir: Option<PathBuf>,
    pub logs_dir: Option<PathBuf>,
    pub constraint_registry: Option<BTreeMap<String, String>>,
    pub worker: Option<String>,
    pub slurm: SlurmInput,
}

/// Values that replace fields of an already validated config (CLI flags).
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_path: Option<PathBuf>,
    pub gamma: Option<f64>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.data_path.is_none() && self.gamma.is_none()
    }
}

/// Validated backtest request. Fields are read-only; a changed request is a new model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigModel {
    signal_name: String,
    data_path: PathBuf,
    gamma: f64,
    project_root: PathBuf,
    email: String,
    constraints: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    constraint_registry: BTreeMap<String, String>,
    worker: String,
    slurm: SlurmConfig,
    output_dir: PathBuf,
    logs_dir: PathBuf,
}

impl ConfigModel {
    /// Validate `input` and fill in defaults.
    pub fn new(input: ConfigInput) -> Result<Self, ConfigError> {
        let signal_name = input
            .signal_name
            .ok_or_else(|| ConfigError::missing("signal_name"))?;
        let gamma = input.gamma.ok_or_else(|| ConfigError::missing("gamma"))?;
        let data_path = input
            .data_path
            .ok_or_else(|| ConfigError::missing("data_path"))?;
        let project_root = input
            .project_root
            .ok_or_else(|| ConfigError::missing("project_root"))?;
        let email = input.email.ok_or_else(|| ConfigError::missing("email"))?;

        validate_signal_name(&signal_name)?;
        if !gamma.is_finite() {
            return Err(ConfigError::invalid("gamma", gamma, "a finite number"));
        }
        require_non_empty_path("data_path", &data_path)?;
        require_non_empty_path("project_root", &project_root)?;
        if email.trim().is_empty() {
            return Err(ConfigError::invalid(
                "email",
                format!("{email:?}"),
                "a non-empty address",
            ));
        }

        let constraints = input
            .constraints
            .unwrap_or_else(|| vec![DEFAULT_CONSTRAINT.to_string()]);
        if constraints.is_empty() {
            return Err(ConfigError::invalid(
                "constraints",
                "[]",
                "at least one constraint name",
            ));
        }

        let worker = input.worker.unwrap_or_else(|| DEFAULT_WORKER.to_string());
        if worker.trim().is_empty() {
            return Err(ConfigError::invalid(
                "worker",
                format!("{worker:?}"),
                "a non-empty command",
            ));
        }

        let slurm = SlurmConfig::new(input.slurm)?;

        let output_dir = input
            .output_dir
            .unwrap_or_else(|| default_output_dir(&project_root, &signal_name, gamma));
        let logs_dir = input
            .logs_dir
            .unwrap_or_else(|| default_logs_dir(&project_root, &signal_name, gamma));
        require_non_empty_path("output_dir", &output_dir)?;
        require_non_empty_path("logs_dir", &logs_dir)?;

        Ok(Self {
            signal_name,
            data_path,
            gamma,
            project_root,
            email,
            constraints,
            constraint_registry: input.constraint_registry.unwrap_or_default(),
            worker,
            slurm,
            output_dir,
            logs_dir,
        })
    }

    /// Build from a plain nested mapping (the parsed YAML/TOML tree).
    pub fn from_document(doc: &serde_json::Value) -> Result<Self, ConfigError> {
        Self::new(document::input_from_document(doc)?)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(s).map_err(|e| ConfigError::Parse {
            format: "YAML",
            message: e.to_string(),
        })?;
        Self::from_document(&document::from_yaml(&yaml, "")?)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let table: toml::Value = toml::from_str(s).map_err(|e| ConfigError::Parse {
            format: "TOML",
            message: e.to_string(),
        })?;
        Self::from_document(&document::from_toml(&table, "")?)
    }

    /// Load a config file. `.toml` files are read as TOML, everything else as YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Return a new model with `overrides` applied.
    ///
    /// `output_dir`/`logs_dir` that were left at their defaults follow the new
    /// gamma; explicitly configured directories are kept.
    pub fn with_overrides(&self, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut input = self.to_input();
        if self.output_dir == default_output_dir(&self.project_root, &self.signal_name, self.gamma)
        {
            input.output_dir = None;
        }
        if self.logs_dir == default_logs_dir(&self.project_root, &self.signal_name, self.gamma) {
            input.logs_dir = None;
        }
        if let Some(data_path) = &overrides.data_path {
            input.data_path = Some(data_path.clone());
        }
        if let Some(gamma) = overrides.gamma {
            input.gamma = Some(gamma);
        }
        Self::new(input)
    }

    /// Every field as an explicit input, so `new(model.to_input())` reproduces the model.
    pub fn to_input(&self) -> ConfigInput {
        ConfigInput {
            signal_name: Some(self.signal_name.clone()),
            gamma: Some(self.gamma),
            data_path: Some(self.data_path.clone()),
            project_root: Some(self.project_root.clone()),
            email: Some(self.email.clone()),
            constraints: Some(self.constraints.clone()),
            output_dir: Some(self.output_dir.clone()),
            logs_dir: Some(self.logs_dir.clone()),
            constraint_registry: Some(self.constraint_registry.clone()),
            worker: Some(self.worker.clone()),
            slurm: self.slurm.to_input(),
        }
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse {
            format: "YAML",
            message: e.to_string(),
        })
    }

    pub fn save_yaml(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, self.to_yaml()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn signal_name(&self) -> &str {
        &self.signal_name
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Gamma as it appears in paths, job names and worker arguments.
    pub fn gamma_label(&self) -> String {
        format_gamma(self.gamma)
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn constraints(&self) -> &[String] {
        &self.constraints
    }

    /// User-supplied registry entries (merged over built-ins by the resolver).
    pub fn constraint_registry(&self) -> &BTreeMap<String, String> {
        &self.constraint_registry
    }

    pub fn worker(&self) -> &str {
        &self.worker
    }

    pub fn slurm(&self) -> &SlurmConfig {
        &self.slurm
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// Where submission scripts are written: `{project_root}/temp`.
    pub fn script_dir(&self) -> PathBuf {
        self.project_root.join("temp")
    }
}

/// `{project_root}/weights/{signal_name}/{gamma}`
pub fn default_output_dir(project_root: &Path, signal_name: &str, gamma: f64) -> PathBuf {
    project_root
        .join("weights")
        .join(signal_name)
        .join(format_gamma(gamma))
}

/// `{project_root}/logs/{signal_name}/{gamma}`
pub fn default_logs_dir(project_root: &Path, signal_name: &str, gamma: f64) -> PathBuf {
    project_root
        .join("logs")
        .join(signal_name)
        .join(format_gamma(gamma))
}

/// Render gamma the way it is written in config documents: integral values
/// keep one decimal place (`1.0`, `-2.0`), everything else uses the shortest
/// representation (`0.5`, `0.125`).
pub fn format_gamma(gamma: f64) -> String {
    if gamma.is_finite() && gamma.fract() == 0.0 && gamma.abs() < 1e15 {
        format!("{gamma:.1}")
    } else {
        format!("{gamma}")
    }
}

fn validate_signal_name(name: &str) -> Result<(), ConfigError> {
    const EXPECTED: &str = "a non-empty name without path separators";
    if name.trim().is_empty() || name == "." || name == ".." {
        return Err(ConfigError::invalid("signal_name", format!("{name:?}"), EXPECTED));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(ConfigError::invalid("signal_name", format!("{name:?}"), EXPECTED));
    }
    Ok(())
}

fn require_non_empty_path(field: &str, path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::invalid(field, "\"\"", "a non-empty path"));
    }
    Ok(())
}
