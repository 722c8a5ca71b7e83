//! Test: Retry Behavior - failed attempts are retried with exponential backoff

use crate::helpers::*;
use medallion::core::{Step, StepStatus};
use medallion::execution::backoff_delay;
use std::time::{Duration, Instant};

/// A step that fails twice then succeeds uses three attempts and reports success
#[test]
fn test_retry_until_success() {
    let task = ScriptedTask::new(vec![false, false, true]);
    let attempts = task.attempts();
    let rollbacks = task.rollbacks();
    let mut pipeline = pipeline_with("Test: Retry", vec![scripted_step("flaky", task).with_retries(3)]);

    let summary = pipeline.execute(&mut sample_context());

    assert_pipeline_completed(&summary);
    assert_eq!(attempts.get(), 3);
    assert_eq!(rollbacks.get(), 0);
    assert_eq!(summary.results[0].message, "attempt 3 succeeded");
}

/// The first success ends the attempt loop
#[test]
fn test_no_attempts_after_success() {
    let task = ScriptedTask::new(vec![true, false, false]);
    let attempts = task.attempts();

    let result = scripted_step("steady", task).with_retries(5).run(&mut sample_context());

    assert_eq!(result.status, StepStatus::Success);
    assert_eq!(attempts.get(), 1);
}

/// Waits double each attempt and never follow the last attempt
#[test]
fn test_backoff_waits_between_attempts() {
    let unit = Duration::from_millis(20);
    assert_eq!(backoff_delay(unit, 0), Duration::from_millis(20));
    assert_eq!(backoff_delay(unit, 1), Duration::from_millis(40));
    assert_eq!(backoff_delay(unit, 2), Duration::from_millis(80));

    // two retries: waits of 20ms and 40ms, none after the third failure
    let task = ScriptedTask::always_failing();
    let attempts = task.attempts();
    let step = Step::task("slow", task).with_retries(2).with_backoff_unit(unit);

    let started = Instant::now();
    let result = step.run(&mut sample_context());
    let elapsed = started.elapsed();

    assert!(result.is_failed());
    assert_eq!(attempts.get(), 3);
    assert!(elapsed >= Duration::from_millis(60), "waited only {:?}", elapsed);
    assert!(result.duration >= Duration::from_millis(60));
}
