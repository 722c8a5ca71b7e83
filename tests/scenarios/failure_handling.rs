//! Test: Failure Handling - stop_on_error, sequential groups and validation

use crate::helpers::*;
use medallion::core::{PipelineBuilder, Step, StepStatus, TaskType};
use medallion::execution::{ExecutionError, ExecutionInput, PipelineExecutor};
use std::cell::Cell;
use std::rc::Rc;

/// stop_on_error halts at the first failed step; later steps never run
#[test]
fn test_stop_on_error() {
    let log = new_log();
    let mut pipeline = pipeline_with(
        "Test: Stop On Error",
        vec![
            recording_step("s1", &log),
            failing_step("s2", &log),
            recording_step("s3", &log),
        ],
    );
    let mut context = sample_context();

    let summary = pipeline.execute(&mut context);

    assert_pipeline_failed(&summary);
    assert_eq!(summary.executed_steps, 2);
    assert_eq!(summary.failed_steps, 1);
    assert_step_failed(&summary, "s2", "Function execution failed: s2 broke");
    assert_eq!(execution_order(&context), vec!["s1", "s2"]);
    assert!(step_status(&summary, "s3").is_none());
}

/// Without stop_on_error every step runs and the run still reports failure
#[test]
fn test_continue_after_failure() {
    let log = new_log();
    let mut pipeline = PipelineBuilder::new("Test: Keep Going", TaskType::Transform)
        .with_stop_on_error(false)
        .add_step(recording_step("s1", &log))
        .add_step(failing_step("s2", &log))
        .add_step(recording_step("s3", &log))
        .build();

    let summary = pipeline.execute(&mut sample_context());

    assert_pipeline_failed(&summary);
    assert_eq!(summary.executed_steps, 3);
    assert_eq!(step_status(&summary, "s3"), Some(StepStatus::Success));
}

/// A sequential group with stop_on_failure reports where it stopped
#[test]
fn test_sequential_stop_on_failure() {
    let log = new_log();
    let group = Step::sequential(
        "group",
        vec![
            recording_step("a", &log),
            failing_step("b", &log),
            recording_step("c", &log),
        ],
        true,
    );

    let result = group.run(&mut sample_context());

    assert_eq!(result.status, StepStatus::Failed);
    assert_eq!(result.metadata["failed_at"], "b");
    assert_eq!(result.metadata["completed"], serde_json::json!(["a", "b"]));
    assert_eq!(*log.borrow(), vec!["a", "b"]);
}

/// Without stop_on_failure the group runs everything and lists the failures
#[test]
fn test_sequential_collects_failures() {
    let log = new_log();
    let group = Step::sequential(
        "group",
        vec![
            failing_step("a", &log),
            recording_step("b", &log),
            failing_step("c", &log),
        ],
        false,
    );

    let result = group.run(&mut sample_context());

    assert!(result.is_failed());
    assert_eq!(result.message, "Some steps failed: a, c");
    assert_eq!(result.metadata["failed"], serde_json::json!(["a", "c"]));
    assert_eq!(result.metadata["total"], 3);
    assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
}

/// An optional step whose validation fails runs nothing at all
#[test]
fn test_optional_validation_failure_skips_everything() {
    let calls = Rc::new(Cell::new(0));
    let (pre, post) = (Rc::clone(&calls), Rc::clone(&calls));
    let task = ScriptedTask::new(vec![true]);
    let attempts = task.attempts();

    let step = scripted_step("guarded", task)
        .required(false)
        .with_validator(|ctx| ctx.has_variable("ready"))
        .add_prerequisite(move |_| {
            pre.set(pre.get() + 1);
            Ok(())
        })
        .add_post_action(move |_| {
            post.set(post.get() + 1);
            Ok(())
        });

    let result = step.run(&mut sample_context());

    assert_eq!(result.status, StepStatus::Skipped);
    assert_eq!(result.message, "Input validation failed");
    assert_eq!(attempts.get(), 0);
    assert_eq!(calls.get(), 0);
}

/// A required step whose validation fails is a failure, not a skip
#[test]
fn test_required_validation_failure_fails() {
    let step = scripted_step("guarded", ScriptedTask::new(vec![true])).with_validator(|_| false);

    let result = step.run(&mut sample_context());

    assert!(result.is_failed());
    assert!(result.message.contains("Input validation failed"));
}

/// A failing prerequisite fails the step without running its body
#[test]
fn test_prerequisite_failure() {
    let task = ScriptedTask::new(vec![true]);
    let attempts = task.attempts();
    let step = scripted_step("prepared", task).add_prerequisite(|_| anyhow::bail!("not ready"));

    let result = step.run(&mut sample_context());

    assert!(result.is_failed());
    assert_eq!(result.message, "not ready");
    assert_eq!(attempts.get(), 0);
}

/// A panicking step fails like any other step and the run stops there
#[test]
fn test_panic_becomes_failed_step() {
    let log = new_log();
    let mut pipeline = pipeline_with(
        "Test: Panic",
        vec![
            recording_step("before", &log),
            Step::function("explode", |_| panic!("boom")),
            recording_step("after", &log),
        ],
    );
    let mut context = sample_context();

    let summary = pipeline.execute(&mut context);

    assert_pipeline_failed(&summary);
    assert!(summary.error.is_none());
    assert_step_failed(&summary, "explode", "Step panicked: boom");
    assert_eq!(*log.borrow(), vec!["before"]);
    assert_eq!(execution_order(&context), vec!["before", "explode"]);
}

/// Without stop_on_error the steps after a panicking step still run
#[test]
fn test_continue_after_panic() {
    let log = new_log();
    let mut pipeline = PipelineBuilder::new("Test: Panic Keep Going", TaskType::Transform)
        .with_stop_on_error(false)
        .add_step(recording_step("a", &log))
        .add_step(Step::function("explode", |_| panic!("boom")))
        .add_step(recording_step("c", &log))
        .build();
    let mut context = sample_context();

    let summary = pipeline.execute(&mut context);

    assert_pipeline_failed(&summary);
    assert_eq!(summary.executed_steps, 3);
    assert_eq!(step_status(&summary, "explode"), Some(StepStatus::Failed));
    assert_eq!(step_status(&summary, "c"), Some(StepStatus::Success));
    assert_eq!(*log.borrow(), vec!["a", "c"]);
    assert_eq!(execution_order(&context), vec!["a", "explode", "c"]);
}

/// Unknown pipeline names are reported by the registry
#[test]
fn test_executor_unknown_pipeline() {
    let mut executor = PipelineExecutor::new();
    let err = executor
        .execute_pipeline("missing", ExecutionInput::new())
        .unwrap_err();
    assert!(matches!(err, ExecutionError::PipelineNotFound(ref name) if name == "missing"));
    assert_eq!(err.to_string(), "Pipeline missing not found");
}
