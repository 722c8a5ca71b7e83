//! Test: Max Retries - exhausting attempts, rollback and required/optional steps

use crate::helpers::*;
use medallion::core::StepStatus;

/// retry_count = n gives exactly n + 1 attempts and one rollback for a required step
#[test]
fn test_required_step_exhausts_retries() {
    for retries in [0, 1, 3] {
        let task = ScriptedTask::always_failing();
        let attempts = task.attempts();
        let rollbacks = task.rollbacks();

        let result = scripted_step("task", task).with_retries(retries).run(&mut sample_context());

        assert_eq!(result.status, StepStatus::Failed);
        assert_eq!(attempts.get(), retries + 1);
        assert_eq!(rollbacks.get(), 1);
        assert_eq!(result.message, format!("attempt {} failed", retries + 1));
        assert!(result.error.is_some());
    }
}

/// An optional step that runs out of attempts fails without rollback
#[test]
fn test_optional_step_skips_rollback() {
    let task = ScriptedTask::always_failing();
    let attempts = task.attempts();
    let rollbacks = task.rollbacks();

    let result = scripted_step("task", task)
        .with_retries(2)
        .required(false)
        .run(&mut sample_context());

    assert_eq!(result.status, StepStatus::Failed);
    assert_eq!(attempts.get(), 3);
    assert_eq!(rollbacks.get(), 0);
}

/// A rollback hook on the step takes precedence and its own failure does not mask the error
#[test]
fn test_failing_rollback_hook_is_swallowed() {
    let task = ScriptedTask::always_failing();
    let task_rollbacks = task.rollbacks();

    let result = scripted_step("task", task)
        .with_rollback(|ctx, err| {
            ctx.add_warning(format!("rolling back after: {}", err));
            anyhow::bail!("rollback broke too")
        })
        .run(&mut sample_context());

    assert!(result.is_failed());
    assert_eq!(result.message, "attempt 1 failed");
    assert_eq!(task_rollbacks.get(), 0);
}
