//! sf-backtester core — turn a backtest request into per-year scheduler jobs.
//!
//! This crate holds the pure parts of the pipeline:
//! - `config`: validated, defaulted `ConfigModel` + `SlurmConfig`
//! - `constraints`: constraint name → import path registry
//! - `task`: one `Task` per calendar year, with its output/log/script paths
//! - `script`: deterministic sbatch script rendering
//! - `data`: year discovery from the signal parquet file
//! - `fingerprint`: config hashing

pub mod config;
pub mod constraints;
pub mod data;
pub mod fingerprint;
pub mod script;
pub mod task;

pub use config::{ConfigError, ConfigInput, ConfigModel, ConfigOverrides, SlurmConfig, SlurmInput};
pub use constraints::{resolve_constraints, ConstraintError, ConstraintRegistry, ResolvedConstraint};
pub use data::{discover_years, DataError};
pub use fingerprint::ConfigHash;
pub use script::{render_script, RenderError};
pub use task::{partition, PartitionError, Task};
