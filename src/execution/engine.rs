//! Pipeline execution - runs steps in order against one context

use crate::core::{
    context::ProcessingContext,
    pipeline::{Pipeline, RunSummary},
    state::StepStatus,
    step::{Step, StepResult},
};
use crate::execution::runner::panic_message;
use chrono::Utc;
use serde_json::{json, Map};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{error, info, info_span};

impl Pipeline {
    /// Run every step against `context` and summarize the run
    ///
    /// Step failures never abort the call. A panicking step becomes a failed
    /// result; a panic outside any step ends the run early and is reported
    /// through `RunSummary::error`.
    pub fn execute(&mut self, context: &mut ProcessingContext) -> RunSummary {
        let span = info_span!(
            "pipeline",
            name = %self.config.name,
            log_level = %self.config.log_level
        );
        let _guard = span.enter();

        let start_time = Utc::now();
        let started = Instant::now();
        info!(
            "Starting pipeline {} execution #{} ({} steps)",
            self.config.name,
            self.execution_count + 1,
            self.steps.len()
        );

        let mut results = Vec::with_capacity(self.steps.len());
        let stop_on_error = self.config.stop_on_error;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            run_steps(&self.steps, stop_on_error, context, &mut results)
        }));
        let error = outcome.err().map(|payload| {
            let message = panic_message(payload.as_ref());
            error!("Pipeline {} execution aborted: {}", self.config.name, message);
            message
        });

        let count = |status: StepStatus| results.iter().filter(|r| r.status == status).count();
        let successful_steps = count(StepStatus::Success);
        let failed_steps = count(StepStatus::Failed);
        let skipped_steps = count(StepStatus::Skipped);
        let success = error.is_none() && failed_steps == 0;

        if success {
            info!("Pipeline {} completed successfully", self.config.name);
        } else if failed_steps > 0 {
            error!("Pipeline {} failed with {} failed step(s)", self.config.name, failed_steps);
        }

        let summary = RunSummary {
            pipeline: self.config.name.clone(),
            success,
            start_time,
            end_time: Utc::now(),
            duration_secs: started.elapsed().as_secs_f64(),
            total_steps: self.steps.len(),
            executed_steps: results.len(),
            successful_steps,
            failed_steps,
            skipped_steps,
            results: results.iter().map(StepResult::snapshot).collect(),
            context: context.summary(),
            errors: context.errors().to_vec(),
            warnings: context.warnings().to_vec(),
            error,
        };

        self.record_run(&summary);
        summary
    }
}

fn run_steps(
    steps: &[Step],
    stop_on_error: bool,
    context: &mut ProcessingContext,
    results: &mut Vec<StepResult>,
) {
    let total = steps.len();
    for (index, step) in steps.iter().enumerate() {
        info!("Executing step {}/{}: {}", index + 1, total, step.name);
        let result = step.run(context);

        let mut extra = Map::new();
        extra.insert("message".to_string(), json!(result.message));
        extra.insert("duration_secs".to_string(), json!(result.duration.as_secs_f64()));
        context.add_history(&step.name, result.status, extra);

        let stop = result.is_failed() && stop_on_error;
        results.push(result);
        if stop {
            error!("Stopping pipeline due to failed step: {}", step.name);
            break;
        }
    }
}
