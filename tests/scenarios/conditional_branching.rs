//! Test: Conditional Branching - steps chosen from context state

use crate::helpers::*;
use medallion::core::{Condition, Step, StepStatus};
use medallion::execution::{ExecutionInput, PipelineExecutor};
use polars::prelude::*;

fn branching(log: &std::rc::Rc<std::cell::RefCell<Vec<String>>>, with_else: bool) -> Step {
    let false_step = with_else.then(|| recording_step("manual_review", log));
    Step::conditional(
        "route",
        Condition::variable_equals("bank", "cub"),
        recording_step("cub_rules", log),
        false_step,
    )
}

/// Variables seeded through the registry pick the branch
#[test]
fn test_branch_on_variable() {
    let log = new_log();
    let mut executor = PipelineExecutor::new();
    executor.register_pipeline(pipeline_with("router", vec![branching(&log, true)]));

    let run = executor
        .execute_pipeline("router", ExecutionInput::new().with_variable("bank", "cub"))
        .unwrap();
    assert_pipeline_completed(&run.summary);

    let run = executor
        .execute_pipeline("router", ExecutionInput::new().with_variable("bank", "esun"))
        .unwrap();
    assert_pipeline_completed(&run.summary);

    assert_eq!(*log.borrow(), vec!["cub_rules", "manual_review"]);
    assert_eq!(executor.get_pipeline("router").unwrap().execution_count(), 2);
}

/// No else branch means the step is skipped, which does not fail the run
#[test]
fn test_unmet_condition_without_else_skips() {
    let log = new_log();
    let mut pipeline = pipeline_with("router", vec![branching(&log, false)]);

    let summary = pipeline.execute(&mut sample_context());

    assert_pipeline_completed(&summary);
    assert_eq!(summary.skipped_steps, 1);
    assert_eq!(step_status(&summary, "route"), Some(StepStatus::Skipped));
    assert!(log.borrow().is_empty());
}

/// A predicate error fails the conditional step
#[test]
fn test_predicate_error_fails() {
    let log = new_log();
    let step = Step::conditional(
        "route",
        Condition::new("amount is positive", |ctx| {
            let column = ctx.data().column("missing")?;
            Ok(column.len() > 0)
        }),
        recording_step("never", &log),
        None,
    );

    let result = step.run(&mut sample_context());

    assert!(result.is_failed());
    assert!(result.message.starts_with("Conditional step failed"));
    assert!(log.borrow().is_empty());
}

/// Auxiliary tables passed to the registry are visible to conditions
#[test]
fn test_branch_on_auxiliary_table() {
    let log = new_log();
    let mut executor = PipelineExecutor::new();
    executor.register_pipeline(pipeline_with(
        "matcher",
        vec![Step::conditional(
            "match",
            Condition::has_auxiliary("ledger"),
            recording_step("reconcile", &log),
            None,
        )],
    ));

    let ledger = df!("amount" => &[10i64]).unwrap();
    let run = executor
        .execute_pipeline("matcher", ExecutionInput::new().with_auxiliary("ledger", ledger))
        .unwrap();

    assert_pipeline_completed(&run.summary);
    assert_eq!(*log.borrow(), vec!["reconcile"]);
    assert_eq!(run.context.list_auxiliary_data(), vec!["ledger"]);
}
