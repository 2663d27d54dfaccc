//! Submission controller scenarios against a mock scheduler.

mod common;

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{config_in, MockScheduler};
use sfbt_runner::{plan, SubmissionController, TaskOutcome};

#[test]
fn bdd_in_flight_calls_never_exceed_the_bound() {
    // GIVEN 8 tasks and max_concurrent_jobs = 2
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), 2);
    let plan = plan(&config, 2015..2023).unwrap();

    // AND a scheduler that holds every call for a while
    let scheduler = MockScheduler::new().with_delay(Duration::from_millis(25));

    // WHEN all tasks are submitted
    let report = SubmissionController::for_plan(&plan)
        .submit(&plan, &scheduler, None)
        .unwrap();

    // THEN no more than 2 calls were ever outstanding
    assert!(scheduler.max_in_flight() <= 2, "saw {}", scheduler.max_in_flight());
    assert!(scheduler.max_in_flight() >= 1);

    // AND every task was submitted exactly once
    assert_eq!(scheduler.calls().len(), 8);
    assert!(report.all_submitted());
}

#[test]
fn bdd_bound_of_one_submits_in_year_order() {
    // GIVEN max_concurrent_jobs = 1
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), 1);
    let plan = plan(&config, [2022, 2020, 2021]).unwrap();
    let scheduler = MockScheduler::new().with_delay(Duration::from_millis(5));

    // WHEN submitting
    SubmissionController::for_plan(&plan)
        .submit(&plan, &scheduler, None)
        .unwrap();

    // THEN calls happen one at a time, ascending by year
    assert_eq!(scheduler.max_in_flight(), 1);
    let names: Vec<String> = scheduler
        .calls()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "momentum_0.5_2020.sbatch",
            "momentum_0.5_2021.sbatch",
            "momentum_0.5_2022.sbatch",
        ]
    );
}

#[test]
fn bdd_one_failure_does_not_stop_the_others() {
    // GIVEN five tasks, where the scheduler rejects 2021
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), 3);
    let plan = plan(&config, 2019..2024).unwrap();
    let scheduler = MockScheduler::new().failing(2021);

    // WHEN submitting
    let report = SubmissionController::for_plan(&plan)
        .submit(&plan, &scheduler, None)
        .unwrap();

    // THEN 2021 is SubmissionFailed and the other four are Submitted
    assert_eq!(report.tasks.len(), 5);
    for t in &report.tasks {
        if t.year == 2021 {
            assert!(matches!(
                &t.outcome,
                TaskOutcome::SubmissionFailed { error } if error.contains("mock rejected")
            ));
        } else {
            assert!(t.outcome.is_submitted(), "{} was {:?}", t.year, t.outcome);
        }
    }

    // AND the run as a whole is a failure
    assert!(!report.all_submitted());
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.submitted_count(), 4);
}

#[test]
fn bdd_dry_run_matches_submitted_script_bytes() {
    // GIVEN a plan over two years
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), 4);
    let plan = plan(&config, [2019, 2020]).unwrap();
    let controller = SubmissionController::for_plan(&plan);

    // WHEN previewing first
    let previews = controller.dry_run(&plan);

    // THEN nothing was written
    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert!(entries.is_empty(), "dry run created {entries:?}");

    // WHEN submitting the same plan
    let scheduler = MockScheduler::new();
    controller.submit(&plan, &scheduler, None).unwrap();

    // THEN each written script equals its preview byte for byte
    for preview in &previews {
        let written = fs::read(&preview.script_path).unwrap();
        assert_eq!(written, preview.script.as_bytes());
    }
}

#[test]
fn bdd_dry_run_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), 4);
    let plan = plan(&config, [2019, 2020]).unwrap();
    let controller = SubmissionController::for_plan(&plan);
    assert_eq!(controller.dry_run(&plan), controller.dry_run(&plan));
}

#[test]
fn bdd_submit_creates_output_and_log_directories() {
    // GIVEN a fresh project root
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), 2);
    let plan = plan(&config, [2020]).unwrap();

    // WHEN submitting
    SubmissionController::for_plan(&plan)
        .submit(&plan, &MockScheduler::new(), None)
        .unwrap();

    // THEN output, log and script directories exist
    assert!(config.output_dir().is_dir());
    assert!(config.logs_dir().is_dir());
    assert!(dir.path().join("temp/momentum_0.5_2020.sbatch").is_file());
}

#[test]
fn bdd_cancel_before_start_submits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), 2);
    let plan = plan(&config, [2019, 2020, 2021]).unwrap();
    let scheduler = MockScheduler::new();
    let cancel = AtomicBool::new(true);

    let report = SubmissionController::for_plan(&plan)
        .submit(&plan, &scheduler, Some(&cancel))
        .unwrap();

    assert!(scheduler.calls().is_empty());
    assert_eq!(report.cancelled_count(), 3);
    assert!(!report.all_submitted());
}

#[test]
fn bdd_cancel_mid_run_keeps_accepted_jobs() {
    // GIVEN one call at a time, and an operator who cancels during the second call
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), 1);
    let plan = plan(&config, 2019..2024).unwrap();
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let scheduler = MockScheduler::new().on_call(move |n| {
        if n == 2 {
            flag.store(true, Ordering::SeqCst);
        }
    });

    // WHEN submitting
    let report = SubmissionController::for_plan(&plan)
        .submit(&plan, &scheduler, Some(&cancel))
        .unwrap();

    // THEN the two dispatched tasks were submitted and the rest cancelled
    assert_eq!(scheduler.calls().len(), 2);
    assert!(report.outcome_for(2019).unwrap().is_submitted());
    assert!(report.outcome_for(2020).unwrap().is_submitted());
    for year in 2021..2024 {
        assert_eq!(report.outcome_for(year), Some(&TaskOutcome::Cancelled));
    }
}

#[test]
fn bdd_report_artifacts_land_in_logs_dir() {
    // GIVEN a submitted run
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), 2);
    let plan = plan(&config, [2019, 2020]).unwrap();
    let report = SubmissionController::for_plan(&plan)
        .submit(&plan, &MockScheduler::new(), None)
        .unwrap();

    // WHEN saving artifacts
    let (json, csv) = report.save_artifacts(config.logs_dir()).unwrap();

    // THEN both files exist next to the job logs and carry the config hash
    assert_eq!(json, config.logs_dir().join("submission_report.json"));
    assert_eq!(csv, config.logs_dir().join("submissions.csv"));
    let text = fs::read_to_string(json).unwrap();
    assert!(text.contains(&plan.config_hash().0));
    assert_eq!(fs::read_to_string(csv).unwrap().lines().count(), 3);
}
