//! sf-backtester CLI — turn a backtest config into per-year scheduler jobs.
//!
//! Commands:
//! - `init` — write a commented config template
//! - `validate` — load and validate a config, resolve its constraints
//! - `run` — plan one job per year and submit it (or `--dry-run` to print the scripts)

mod interrupt;
mod logging;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use sfbt_core::config::write_template;
use sfbt_core::{resolve_constraints, ConfigModel, ConfigOverrides};
use sfbt_runner::scheduler::DEFAULT_SCHEDULER_COMMAND;
use sfbt_runner::{
    plan, plan_from_data, RunPlan, SbatchScheduler, SubmissionController, TaskOutcome,
};

#[derive(Parser)]
#[command(
    name = "sf-backtester",
    version,
    about = "Split a signal backtest into one SLURM job per year"
)]
struct Cli {
    /// Log filter (e.g. `debug`, `sfbt_runner=debug`). Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config template.
    Init {
        /// Where to write the template (.yaml).
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Validate a config file and resolve its constraints.
    Validate {
        /// Config file (.yaml, .yml or .toml).
        path: PathBuf,
    },
    /// Submit one job per year in the dataset.
    Run {
        /// Config file (.yaml, .yml or .toml).
        path: PathBuf,

        /// Print the scripts instead of submitting them.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Replace the config's data_path.
        #[arg(long)]
        data_path: Option<PathBuf>,

        /// Replace the config's gamma.
        #[arg(long)]
        gamma: Option<f64>,

        /// Comma-separated years; skips reading the dataset.
        #[arg(long, value_delimiter = ',')]
        years: Vec<i32>,

        /// Submission command; the script path is appended.
        #[arg(long, default_value = DEFAULT_SCHEDULER_COMMAND)]
        scheduler_command: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level.as_deref());

    match cli.command {
        Commands::Init { path, force } => run_init(&path, force),
        Commands::Validate { path } => run_validate(&path),
        Commands::Run {
            path,
            dry_run,
            data_path,
            gamma,
            years,
            scheduler_command,
        } => {
            let overrides = ConfigOverrides { data_path, gamma };
            let all_submitted = run_cmd(&path, &overrides, &years, dry_run, &scheduler_command)?;
            if !all_submitted {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn run_init(path: &Path, force: bool) -> Result<()> {
    write_template(path, force)?;
    println!("Wrote config template to {}", path.display());
    Ok(())
}

fn run_validate(path: &Path) -> Result<()> {
    let config = ConfigModel::from_file(path)?;
    let constraints = resolve_constraints(&config)?;

    if !config.data_path().exists() {
        tracing::warn!(
            data_path = %config.data_path().display(),
            "data_path does not exist on this machine"
        );
    }

    println!("{} is valid", path.display());
    println!("  signal:      {}", config.signal_name());
    println!("  gamma:       {}", config.gamma_label());
    println!("  data_path:   {}", config.data_path().display());
    println!("  output_dir:  {}", config.output_dir().display());
    println!("  logs_dir:    {}", config.logs_dir().display());
    for c in &constraints {
        println!("  constraint:  {} -> {}", c.name, c.import_path);
    }
    Ok(())
}

/// Returns whether every task was submitted. Dry runs always return true.
fn run_cmd(
    path: &Path,
    overrides: &ConfigOverrides,
    years: &[i32],
    dry_run: bool,
    scheduler_command: &str,
) -> Result<bool> {
    let config = ConfigModel::from_file(path)?
        .with_overrides(overrides)
        .context("applying command-line overrides")?;

    let plan: RunPlan = if years.is_empty() {
        plan_from_data(&config)?
    } else {
        plan(&config, years.iter().copied())?
    };
    let controller = SubmissionController::for_plan(&plan);

    if dry_run {
        for preview in controller.dry_run(&plan) {
            println!("# ===== {} -> {} =====", preview.job_name, preview.script_path.display());
            print!("{}", preview.script);
            println!();
        }
        return Ok(true);
    }

    if scheduler_command.trim().is_empty() {
        bail!("--scheduler-command must not be empty");
    }
    let scheduler = SbatchScheduler::new(scheduler_command);
    let cancel = interrupt::cancel_on_interrupt().context("installing interrupt handler")?;
    let report = controller.submit(&plan, &scheduler, Some(cancel.as_ref()))?;

    for t in &report.tasks {
        match &t.outcome {
            TaskOutcome::Submitted { job_id } => {
                println!("{:>6}  {:<32}  submitted  {job_id}", t.year, t.job_name)
            }
            TaskOutcome::SubmissionFailed { error } => {
                println!("{:>6}  {:<32}  FAILED     {error}", t.year, t.job_name)
            }
            TaskOutcome::Cancelled => {
                println!("{:>6}  {:<32}  cancelled", t.year, t.job_name)
            }
        }
    }
    println!(
        "{} submitted, {} failed, {} cancelled.",
        report.submitted_count(),
        report.failed_count(),
        report.cancelled_count(),
    );

    // Accepted job ids are on stdout before anything else can fail.
    let (json_path, _) = report
        .save_artifacts(config.logs_dir())
        .context("writing submission report")?;
    println!("Report: {}", json_path.display());

    Ok(report.all_submitted())
}
