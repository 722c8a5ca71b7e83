//! Test: Success Chain - steps run in order against one shared context

use crate::helpers::*;
use medallion::core::{PipelineConfig, Step, StepStatus};
use polars::prelude::*;

/// Every step runs, in order, and the summary counts them all
#[test]
fn test_success_chain() {
    let log = new_log();
    let mut pipeline = pipeline_with(
        "Test: Success Chain",
        vec![
            recording_step("extract", &log),
            recording_step("transform", &log),
            recording_step("report", &log),
        ],
    );
    let mut context = sample_context();

    let summary = pipeline.execute(&mut context);

    assert_pipeline_completed(&summary);
    assert_eq!(summary.total_steps, 3);
    assert_eq!(summary.executed_steps, 3);
    assert_eq!(summary.successful_steps, 3);
    assert_eq!(*log.borrow(), vec!["extract", "transform", "report"]);
    assert_eq!(execution_order(&context), vec!["extract", "transform", "report"]);
    assert!(context.history().iter().all(|h| h.status == StepStatus::Success));
}

/// A transform's returned table replaces the context's primary table for later steps
#[test]
fn test_transforms_see_previous_output() {
    let mut pipeline = pipeline_with(
        "Test: Data Flow",
        vec![
            Step::function("double", |ctx| {
                let doubled = ctx.data().column("amount")?.as_materialized_series() * 2;
                let mut df = ctx.data_copy();
                df.with_column(doubled)?;
                Ok(Some(df))
            }),
            Step::function("total", |ctx| {
                let total: i64 = ctx.data().column("amount")?.as_materialized_series().i64()?.sum().unwrap_or(0);
                ctx.set_variable("total", total);
                Ok(None)
            }),
        ],
    );
    let mut context = sample_context();

    let summary = pipeline.execute(&mut context);

    assert_pipeline_completed(&summary);
    assert_eq!(context.variable("total"), Some(&serde_json::json!(12)));
}

/// Pipelines can be described in YAML and still carry code steps
#[test]
fn test_pipeline_from_yaml_config() {
    let yaml = r#"
name: "Test: From YAML"
description: "Configured pipeline"
task_type: report
stop_on_error: false
"#;
    let config = PipelineConfig::from_yaml(yaml).unwrap();
    let log = new_log();
    let mut pipeline = medallion::core::PipelineBuilder::from_config(config)
        .add_step(failing_step("first", &log))
        .add_step(recording_step("second", &log))
        .build();

    let summary = pipeline.execute(&mut sample_context());

    assert_pipeline_failed(&summary);
    assert_eq!(summary.executed_steps, 2);
    assert_eq!(*log.borrow(), vec!["first", "second"]);
    assert_eq!(pipeline.statistics().total_executions, 1);
}
