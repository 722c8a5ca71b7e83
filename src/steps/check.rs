//! Dry-run schema check recorded as a named validation

use crate::core::{ProcessingContext, StepResult, StepTask, ValidationResult};
use crate::ingest::{SchemaConfig, SilverProcessor};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct SchemaCheckStep {
    schema: SchemaConfig,
    validation_name: String,
    fail_on_invalid: bool,
}

impl SchemaCheckStep {
    pub fn new(schema: SchemaConfig) -> Self {
        Self {
            schema,
            validation_name: "schema".to_string(),
            fail_on_invalid: false,
        }
    }

    /// Name the result is stored under in the context
    pub fn with_validation_name(mut self, name: impl Into<String>) -> Self {
        self.validation_name = name.into();
        self
    }

    pub fn fail_on_invalid(mut self, fail: bool) -> Self {
        self.fail_on_invalid = fail;
        self
    }
}

impl StepTask for SchemaCheckStep {
    fn execute(&self, step_name: &str, context: &mut ProcessingContext) -> anyhow::Result<StepResult> {
        let report = SilverProcessor::new().validate_only(context.data(), &self.schema);

        let mut validation = ValidationResult::new();
        if !report.missing_required_columns.is_empty() {
            validation.add_error(format!(
                "Missing required columns: {}",
                report.missing_required_columns.join(", ")
            ));
        }
        match &report.circuit_breaker {
            Some(breaker) if breaker.is_tripped() => validation.add_error(breaker.message.clone()),
            Some(_) => {}
            None => validation.add_warning("Quality check could not be computed"),
        }
        if !report.valid && validation.is_valid {
            validation.add_error("Schema check failed");
        }
        context.add_validation(self.validation_name.clone(), validation);

        if self.fail_on_invalid && !report.valid {
            anyhow::bail!("Schema check '{}' failed", self.validation_name);
        }
        if !report.valid {
            warn!("{}: schema check '{}' found problems", step_name, self.validation_name);
        }

        let message = if report.valid {
            "Schema check passed".to_string()
        } else {
            "Schema check found problems".to_string()
        };
        Ok(StepResult::success(step_name, message)
            .with_metadata("valid", report.valid)
            .with_metadata("report", serde_json::to_value(&report)?))
    }
}
