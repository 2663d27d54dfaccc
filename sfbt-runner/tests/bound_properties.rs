mod common;

use std::time::Duration;

use proptest::prelude::*;

use common::{config_in, MockScheduler};
use sfbt_runner::{plan, SubmissionController};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn in_flight_never_exceeds_bound(bound in 1i64..5, tasks in 1i32..10, fail in 0i32..10) {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), bound);
        let plan = plan(&config, 2000..2000 + tasks).unwrap();
        let scheduler = MockScheduler::new()
            .with_delay(Duration::from_millis(2))
            .failing(2000 + fail);

        let report = SubmissionController::for_plan(&plan)
            .submit(&plan, &scheduler, None)
            .unwrap();

        prop_assert!(scheduler.max_in_flight() <= bound as usize);
        prop_assert_eq!(scheduler.calls().len(), tasks as usize);
        prop_assert_eq!(report.tasks.len(), tasks as usize);
        prop_assert_eq!(report.failed_count(), usize::from(fail < tasks));
    }
}
