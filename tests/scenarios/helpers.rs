//! Test utility functions for medallion scenarios

use medallion::core::{Pipeline, PipelineBuilder, ProcessingContext, RunSummary, Step, StepResult, StepStatus, StepTask, TaskType};
use polars::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

/// Task that replays scripted outcomes, one per attempt
///
/// `true` succeeds, `false` fails. Attempts beyond the script fail.
pub struct ScriptedTask {
    outcomes: Vec<bool>,
    attempts: Rc<Cell<usize>>,
    rollbacks: Rc<Cell<usize>>,
}

impl ScriptedTask {
    pub fn new(outcomes: Vec<bool>) -> Self {
        Self {
            outcomes,
            attempts: Rc::new(Cell::new(0)),
            rollbacks: Rc::new(Cell::new(0)),
        }
    }

    pub fn always_failing() -> Self {
        Self::new(Vec::new())
    }

    pub fn attempts(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.attempts)
    }

    pub fn rollbacks(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.rollbacks)
    }
}

impl StepTask for ScriptedTask {
    fn execute(&self, step_name: &str, _context: &mut ProcessingContext) -> anyhow::Result<StepResult> {
        let attempt = self.attempts.get();
        self.attempts.set(attempt + 1);

        match self.outcomes.get(attempt) {
            Some(true) => Ok(StepResult::success(step_name, format!("attempt {} succeeded", attempt + 1))),
            _ => anyhow::bail!("attempt {} failed", attempt + 1),
        }
    }

    fn rollback(&self, _context: &mut ProcessingContext, _error: &anyhow::Error) -> Option<anyhow::Result<()>> {
        self.rollbacks.set(self.rollbacks.get() + 1);
        Some(Ok(()))
    }
}

/// Step around a [`ScriptedTask`] with no backoff wait
pub fn scripted_step(name: &str, task: ScriptedTask) -> Step {
    Step::task(name, task).with_backoff_unit(Duration::ZERO)
}

/// Function step that records its name in `log` and succeeds
pub fn recording_step(name: &str, log: &Rc<RefCell<Vec<String>>>) -> Step {
    let log = Rc::clone(log);
    let label = name.to_string();
    Step::function(name, move |_ctx| {
        log.borrow_mut().push(label.clone());
        Ok(None)
    })
}

/// Function step that records its name in `log` and fails
pub fn failing_step(name: &str, log: &Rc<RefCell<Vec<String>>>) -> Step {
    let log = Rc::clone(log);
    let label = name.to_string();
    Step::function(name, move |_ctx| {
        log.borrow_mut().push(label.clone());
        anyhow::bail!("{} broke", label)
    })
}

pub fn new_log() -> Rc<RefCell<Vec<String>>> {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn pipeline_with(name: &str, steps: Vec<Step>) -> Pipeline {
    PipelineBuilder::new(name, TaskType::Transform).add_steps(steps).build()
}

pub fn sample_context() -> ProcessingContext {
    let data = df!("amount" => &[1i64, 2, 3]).unwrap();
    ProcessingContext::new(data, "scenario", TaskType::Transform)
}

pub fn step_status(summary: &RunSummary, step: &str) -> Option<StepStatus> {
    summary
        .results
        .iter()
        .find(|r| r.step_name == step)
        .map(|r| r.status)
}

pub fn assert_pipeline_completed(summary: &RunSummary) {
    assert!(
        summary.success,
        "Pipeline {} should succeed, failed steps: {:?}",
        summary.pipeline,
        summary
            .results
            .iter()
            .filter(|r| r.status == StepStatus::Failed)
            .map(|r| format!("{}: {}", r.step_name, r.message))
            .collect::<Vec<_>>()
    );
}

pub fn assert_pipeline_failed(summary: &RunSummary) {
    assert!(!summary.success, "Pipeline {} should have failed", summary.pipeline);
}

pub fn assert_step_failed(summary: &RunSummary, step: &str, message_contains: &str) {
    let result = summary
        .results
        .iter()
        .find(|r| r.step_name == step)
        .unwrap_or_else(|| panic!("Step {} was not executed", step));
    assert_eq!(result.status, StepStatus::Failed, "Step {} should have failed", step);
    assert!(
        result.message.contains(message_contains),
        "Step {} message {:?} should contain {:?}",
        step,
        result.message,
        message_contains
    );
}

/// Step names in history order
pub fn execution_order(context: &ProcessingContext) -> Vec<String> {
    context.history().iter().map(|h| h.step.clone()).collect()
}
