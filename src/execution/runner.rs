//! Step call contract - validation, retry with backoff, rollback

use crate::core::{
    step::{ConditionalStep, SequentialStep, Step, StepKind, StepResult, Transform},
    context::ProcessingContext,
    state::StepStatus,
};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Wait before the attempt following `attempt` (0-based): `unit * 2^attempt`
pub fn backoff_delay(unit: Duration, attempt: usize) -> Duration {
    let factor = u32::try_from(attempt)
        .ok()
        .and_then(|shift| 1u32.checked_shl(shift))
        .unwrap_or(u32::MAX);
    unit.saturating_mul(factor)
}

/// Text carried by a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "step panicked".to_string()
    }
}

impl Step {
    /// Run the step; never fails, every outcome is a [`StepResult`]
    ///
    /// A panic in the step body becomes a failed result.
    pub fn run(&self, context: &mut ProcessingContext) -> StepResult {
        let started = Instant::now();
        debug!("Running {} step {}", self.kind.label(), self.name);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_guarded(context)));
        let mut result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                error!("Step {} failed: {:#}", self.name, err);
                StepResult::failed(&self.name, err)
            }
            Err(payload) => {
                let err = anyhow::anyhow!("Step panicked: {}", panic_message(payload.as_ref()));
                error!("Step {} failed: {:#}", self.name, err);
                if self.required {
                    self.run_rollback(context, &err);
                }
                StepResult::failed(&self.name, err)
            }
        };
        result.duration = started.elapsed();
        result
    }

    fn run_guarded(&self, context: &mut ProcessingContext) -> anyhow::Result<StepResult> {
        if !self.validate_input(context) {
            if self.required {
                anyhow::bail!("Input validation failed for step {}", self.name);
            }
            warn!("Input validation failed for optional step {}, skipping", self.name);
            return Ok(StepResult::skipped(&self.name, "Input validation failed"));
        }

        for hook in &self.prerequisites {
            hook(context)?;
        }

        let result = match self.execute_with_retry(context) {
            Ok(result) => result,
            Err(err) if self.required => {
                self.run_rollback(context, &err);
                return Err(err);
            }
            Err(err) => {
                warn!("Optional step {} failed: {:#}", self.name, err);
                StepResult::failed(&self.name, err)
            }
        };

        for hook in &self.post_actions {
            hook(context)?;
        }

        Ok(result)
    }

    fn execute_with_retry(&self, context: &mut ProcessingContext) -> anyhow::Result<StepResult> {
        let attempts = self.retry_count + 1;
        let mut attempt = 0;
        loop {
            match self.execute(context) {
                Ok(result) => return Ok(result),
                Err(err) if attempt < self.retry_count => {
                    let delay = backoff_delay(self.backoff_unit, attempt);
                    warn!(
                        "Step {} attempt {}/{} failed: {:#}; retrying in {:?}",
                        self.name,
                        attempt + 1,
                        attempts,
                        err,
                        delay
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => {
                    error!("Step {} failed after {} attempt(s)", self.name, attempts);
                    return Err(err);
                }
            }
        }
    }

    /// Single attempt of the step body
    fn execute(&self, context: &mut ProcessingContext) -> anyhow::Result<StepResult> {
        match &self.kind {
            StepKind::Function(transform) => Ok(self.execute_function(transform, context)),
            StepKind::Conditional(branch) => Ok(self.execute_conditional(branch, context)),
            StepKind::Sequential(group) => Ok(self.execute_sequential(group, context)),
            StepKind::Task(task) => task.execute(&self.name, context),
        }
    }

    fn run_rollback(&self, context: &mut ProcessingContext, err: &anyhow::Error) {
        let outcome = match (&self.rollback, &self.kind) {
            (Some(hook), _) => Some(hook(context, err)),
            (None, StepKind::Task(task)) => task.rollback(context, err),
            _ => None,
        };
        match outcome {
            None => warn!("Rollback not implemented for step {}", self.name),
            Some(Ok(())) => info!("Rolled back step {}", self.name),
            Some(Err(rollback_err)) => {
                error!("Rollback of step {} failed: {:#}", self.name, rollback_err)
            }
        }
    }

    fn execute_function(&self, transform: &Transform, context: &mut ProcessingContext) -> StepResult {
        match transform(context) {
            Ok(Some(data)) => {
                context.update_data(data.clone());
                StepResult::success(&self.name, "Function executed successfully").with_data(data)
            }
            Ok(None) => StepResult::success(&self.name, "Function executed successfully"),
            Err(err) => StepResult::new(
                &self.name,
                StepStatus::Failed,
                format!("Function execution failed: {:#}", err),
            )
            .with_error(err),
        }
    }

    fn execute_conditional(&self, branch: &ConditionalStep, context: &mut ProcessingContext) -> StepResult {
        match branch.condition.evaluate(context) {
            Err(err) => StepResult::new(
                &self.name,
                StepStatus::Failed,
                format!("Conditional step failed: {:#}", err),
            )
            .with_error(err),
            Ok(true) => {
                debug!("Condition '{}' met, running {}", branch.condition.description, branch.true_step.name);
                branch.true_step.run(context)
            }
            Ok(false) => match &branch.false_step {
                Some(step) => {
                    debug!("Condition '{}' not met, running {}", branch.condition.description, step.name);
                    step.run(context)
                }
                None => StepResult::skipped(&self.name, "Condition not met, no false step defined"),
            },
        }
    }

    fn execute_sequential(&self, group: &SequentialStep, context: &mut ProcessingContext) -> StepResult {
        let mut completed: Vec<String> = Vec::new();
        let mut failed: Vec<String> = Vec::new();

        for step in &group.steps {
            let result = step.run(context);
            completed.push(step.name.clone());

            if result.is_failed() {
                if group.stop_on_failure {
                    let mut stopped = StepResult::new(
                        &self.name,
                        StepStatus::Failed,
                        format!("Step {} failed", step.name),
                    )
                    .with_metadata("failed_at", step.name.clone())
                    .with_metadata("completed", completed);
                    stopped.error = result.error;
                    return stopped;
                }
                failed.push(step.name.clone());
            }
        }

        if failed.is_empty() {
            StepResult::success(
                &self.name,
                format!("All {} steps completed successfully", group.steps.len()),
            )
            .with_metadata("completed_steps", completed)
        } else {
            StepResult::new(
                &self.name,
                StepStatus::Failed,
                format!("Some steps failed: {}", failed.join(", ")),
            )
            .with_metadata("total", group.steps.len())
            .with_metadata("failed", failed)
        }
    }
}
