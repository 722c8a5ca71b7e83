//! Test: CSV Ingestion - load, check, clean and export a messy file end to end

use crate::helpers::*;
use medallion::core::{PipelineBuilder, Step, StepStatus, TaskType};
use medallion::execution::{ExecutionInput, PipelineExecutor};
use medallion::ingest::{ExtractOptions, SchemaConfig};
use medallion::steps::{CleanStep, ExportStep, LoadSourceStep, SchemaCheckStep, CAST_FAILURES_VARIABLE};
use polars::prelude::*;
use std::fs;
use std::path::Path;

const STATEMENT: &str = "\
Cathay United Bank statement
交易日期,摘要,金額 (NT$),備註
2024/01/05,Deposit,\"1,200\",rent
2024/01/06,Fee,NT$30,
,,,
2024/01/08,Transfer,N/A,salary
2024/01/09,Refund,$45,
";

const SCHEMA: &str = r#"
banks:
  cub:
    circuit_breaker_threshold: 0.5
    columns:
      - source: "交易日期|.*date"
        target: txn_date
        dtype: DATE
        required: true
      - source: ".*金額.*"
        target: amount
        dtype: BIGINT
        required: true
      - source: "摘要"
        target: description
        dtype: VARCHAR
"#;

fn write_statement(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("cub_statement.csv");
    fs::write(&path, STATEMENT).unwrap();
    path
}

fn schema() -> SchemaConfig {
    SchemaConfig::from_yaml_str(SCHEMA, Some("banks.cub")).unwrap()
}

fn ingest_pipeline(source: &Path, output: &Path) -> medallion::core::Pipeline {
    PipelineBuilder::new("cub_ingest", TaskType::Transform)
        .add_step(Step::task(
            "load",
            LoadSourceStep::new(source).with_options(ExtractOptions::new().with_header_row(1).with_batch_id("batch-7")),
        ))
        .add_step(Step::task("check", SchemaCheckStep::new(schema())).required(false))
        .add_step(Step::task("clean", CleanStep::new(schema())))
        .add_step(Step::task("export", ExportStep::new(output)))
        .build()
}

#[test]
fn test_csv_ingestion_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_statement(dir.path());
    let output = dir.path().join("out/cub_clean.csv");

    let mut executor = PipelineExecutor::new();
    executor.register_pipeline(ingest_pipeline(&source, &output));
    let run = executor.execute_pipeline("cub_ingest", ExecutionInput::new()).unwrap();

    assert_pipeline_completed(&run.summary);
    assert_eq!(run.summary.executed_steps, 4);

    let df = run.context.data();
    // the blank line is dropped
    assert_eq!(df.height(), 4);
    assert_eq!(
        df.get_column_names().iter().map(|c| c.as_str()).take(4).collect::<Vec<_>>(),
        vec!["txn_date", "amount", "description", "_source_file"]
    );
    assert_eq!(df.column("txn_date").unwrap().dtype(), &DataType::Date);

    let amounts: Vec<Option<i64>> = df
        .column("amount")
        .unwrap()
        .as_materialized_series()
        .i64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(amounts, vec![Some(1200), Some(30), None, Some(45)]);

    let batch = df.column("_batch_id").unwrap().as_materialized_series().str().unwrap().get(0).map(str::to_string);
    assert_eq!(batch.as_deref(), Some("batch-7"));
    assert_eq!(run.context.variable(CAST_FAILURES_VARIABLE), Some(&serde_json::json!(3)));
    assert!(run.context.validation("schema").is_some());

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("txn_date,amount,description,_source_file"));
    assert_eq!(written.lines().count(), 5);
}

#[test]
fn test_missing_required_column_stops_before_export() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("other.csv");
    fs::write(&source, "title\nDate,Memo\n2024-01-01,x\n").unwrap();
    let output = dir.path().join("never.csv");

    let mut pipeline = ingest_pipeline(&source, &output);
    let mut context = medallion::core::ProcessingContext::empty("cub_ingest", TaskType::Transform);
    let summary = pipeline.execute(&mut context);

    assert_pipeline_failed(&summary);
    assert_step_failed(&summary, "clean", "Missing required columns");
    assert_eq!(step_status(&summary, "check"), Some(StepStatus::Success));
    assert!(step_status(&summary, "export").is_none());
    assert!(!output.exists());
    assert!(!context.is_valid());
}

#[test]
fn test_missing_source_file_fails_load() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("never.csv");
    let mut pipeline = ingest_pipeline(&dir.path().join("absent.csv"), &output);

    let summary = pipeline.execute(&mut sample_context());

    assert_pipeline_failed(&summary);
    assert_step_failed(&summary, "load", "Input validation failed");
    assert_eq!(summary.executed_steps, 1);
}
