//! Run planning: config → constraints → tasks → rendered scripts.
//!
//! Everything fatal happens here, before the controller touches the
//! filesystem or the scheduler. A `RunPlan` is read-only afterwards.

use std::collections::BTreeSet;

use sfbt_core::{
    discover_years, partition, render_script, ConfigHash, ConfigModel, ConstraintRegistry,
    ResolvedConstraint, Task,
};

use crate::error::RunError;

/// A task with its script, rendered once.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTask {
    pub task: Task,
    pub script: String,
}

#[derive(Debug, Clone)]
pub struct RunPlan {
    config: ConfigModel,
    registry: ConstraintRegistry,
    constraints: Vec<ResolvedConstraint>,
    tasks: Vec<PlannedTask>,
    config_hash: ConfigHash,
}

impl RunPlan {
    pub fn config(&self) -> &ConfigModel {
        &self.config
    }

    /// Built-ins merged with the config's `constraint_registry`.
    pub fn registry(&self) -> &ConstraintRegistry {
        &self.registry
    }

    pub fn constraints(&self) -> &[ResolvedConstraint] {
        &self.constraints
    }

    /// Ascending by year.
    pub fn tasks(&self) -> &[PlannedTask] {
        &self.tasks
    }

    pub fn config_hash(&self) -> &ConfigHash {
        &self.config_hash
    }

    pub fn years(&self) -> Vec<i32> {
        self.tasks.iter().map(|t| t.task.year).collect()
    }
}

/// Plan a run over an explicit set of years.
///
/// Constraints are resolved before any task exists, so an unknown constraint
/// never produces a partial plan.
pub fn plan(
    config: &ConfigModel,
    years: impl IntoIterator<Item = i32>,
) -> Result<RunPlan, RunError> {
    let registry = ConstraintRegistry::for_config(config)?;
    let constraints = registry.resolve(config.constraints())?;

    let tasks = partition(config, years)?
        .into_iter()
        .map(|task| {
            let script = render_script(config, &constraints, &task)?;
            Ok(PlannedTask { task, script })
        })
        .collect::<Result<Vec<_>, RunError>>()?;

    let config_hash = ConfigHash::of(config)?;
    tracing::info!(
        signal = config.signal_name(),
        gamma = %config.gamma_label(),
        tasks = tasks.len(),
        constraints = constraints.len(),
        config_hash = config_hash.short(),
        "planned run"
    );

    Ok(RunPlan {
        config: config.clone(),
        registry,
        constraints,
        tasks,
        config_hash,
    })
}

/// Plan a run over the years found in `config.data_path()`.
pub fn plan_from_data(config: &ConfigModel) -> Result<RunPlan, RunError> {
    // Resolve first: a bad constraint name should not cost a parquet scan.
    ConstraintRegistry::for_config(config)?.resolve(config.constraints())?;
    let years: BTreeSet<i32> = discover_years(config.data_path())?;
    plan(config, years)
}
