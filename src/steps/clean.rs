//! Silver cleaning of the primary table

use crate::core::{ProcessingContext, StepResult, StepTask};
use crate::ingest::{CircuitBreaker, SchemaConfig, SilverProcessor};
use serde_json::json;
use tracing::info;

/// Variable holding the total cast failures of the last clean
pub const CAST_FAILURES_VARIABLE: &str = "cast_failures";

#[derive(Debug, Clone)]
pub struct CleanStep {
    schema: SchemaConfig,
    validate: bool,
    breaker: Option<CircuitBreaker>,
}

impl CleanStep {
    pub fn new(schema: SchemaConfig) -> Self {
        Self {
            schema,
            validate: true,
            breaker: None,
        }
    }

    /// Skip the circuit breaker
    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    pub fn with_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn schema(&self) -> &SchemaConfig {
        &self.schema
    }
}

impl StepTask for CleanStep {
    fn execute(&self, step_name: &str, context: &mut ProcessingContext) -> anyhow::Result<StepResult> {
        let mut silver = match self.breaker {
            Some(breaker) => SilverProcessor::new().with_breaker(breaker),
            None => SilverProcessor::new(),
        };

        let rows_in = context.data().height();
        let cleaned = silver.process(context.data(), &self.schema, self.validate)?;
        let rows_out = cleaned.height();
        let summary = silver.cast_summary();

        context.update_data(cleaned.clone());
        context.set_variable(CAST_FAILURES_VARIABLE, summary.total_failures);
        if summary.total_failures > 0 {
            context.add_warning(format!(
                "{} value(s) could not be cast and were set to null",
                summary.total_failures
            ));
        }

        let message = format!("Cleaned {} rows into {}", rows_in, rows_out);
        info!("{}: {}", step_name, message);
        Ok(StepResult::success(step_name, message)
            .with_data(cleaned)
            .with_metadata("rows_in", rows_in)
            .with_metadata("rows_out", rows_out)
            .with_metadata("cast_failures", json!(summary.failures_by_column)))
    }

    fn validate_input(&self, context: &ProcessingContext) -> bool {
        context.data().width() > 0
    }
}
