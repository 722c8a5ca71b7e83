//! Step domain model

use crate::core::{condition::Condition, context::ProcessingContext, state::StepStatus};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Hook run before (prerequisite) or after (post-action) a step body
pub type StepHook = Box<dyn Fn(&mut ProcessingContext) -> anyhow::Result<()>>;

/// Custom input validation for a step
pub type InputValidator = Box<dyn Fn(&ProcessingContext) -> bool>;

/// Compensation run when a required step exhausts its attempts
pub type RollbackHook = Box<dyn Fn(&mut ProcessingContext, &anyhow::Error) -> anyhow::Result<()>>;

/// Body of a function step; `Some` replaces the context's primary table
pub type Transform = Box<dyn Fn(&mut ProcessingContext) -> anyhow::Result<Option<DataFrame>>>;

/// Outcome of running a step
#[derive(Debug)]
pub struct StepResult {
    pub step_name: String,
    pub status: StepStatus,

    /// Table produced by the step, if any
    pub data: Option<DataFrame>,

    /// Error that made the step fail
    pub error: Option<anyhow::Error>,

    pub message: String,

    /// Wall-clock time of the whole call
    pub duration: Duration,

    pub metadata: HashMap<String, Value>,
}

impl StepResult {
    pub fn new(step_name: impl Into<String>, status: StepStatus, message: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            status,
            data: None,
            error: None,
            message: message.into(),
            duration: Duration::ZERO,
            metadata: HashMap::new(),
        }
    }

    pub fn success(step_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(step_name, StepStatus::Success, message)
    }

    pub fn skipped(step_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(step_name, StepStatus::Skipped, message)
    }

    /// Failed result whose message is the error text
    pub fn failed(step_name: impl Into<String>, error: anyhow::Error) -> Self {
        let message = format!("{:#}", error);
        Self::new(step_name, StepStatus::Failed, message).with_error(error)
    }

    pub fn with_data(mut self, data: DataFrame) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_error(mut self, error: anyhow::Error) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }

    pub fn is_failed(&self) -> bool {
        self.status == StepStatus::Failed
    }

    pub fn is_skipped(&self) -> bool {
        self.status == StepStatus::Skipped
    }

    /// Serializable view of the result (the table is left out)
    pub fn snapshot(&self) -> StepSnapshot {
        StepSnapshot {
            step_name: self.step_name.clone(),
            status: self.status,
            message: self.message.clone(),
            duration_secs: self.duration.as_secs_f64(),
            metadata: self.metadata.clone(),
            error: self.error.as_ref().map(|e| format!("{:#}", e)),
        }
    }
}

/// Plain-data copy of a [`StepResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub step_name: String,
    pub status: StepStatus,
    pub message: String,
    pub duration_secs: f64,
    pub metadata: HashMap<String, Value>,
    pub error: Option<String>,
}

/// Domain work plugged into a step
///
/// Errors returned from `execute` are retried by the step and, for required
/// steps, trigger `rollback` once attempts run out.
pub trait StepTask {
    /// Run the task once
    fn execute(&self, step_name: &str, context: &mut ProcessingContext) -> anyhow::Result<StepResult>;

    /// Whether the context is fit for this task
    fn validate_input(&self, _context: &ProcessingContext) -> bool {
        true
    }

    /// Undo partial effects after a failed required run; `None` when not supported
    fn rollback(&self, _context: &mut ProcessingContext, _error: &anyhow::Error) -> Option<anyhow::Result<()>> {
        None
    }
}

/// Branching step: one of two steps depending on a predicate
pub struct ConditionalStep {
    pub condition: Condition,
    pub true_step: Box<Step>,
    pub false_step: Option<Box<Step>>,
}

/// Ordered group of steps run against the same context
pub struct SequentialStep {
    pub steps: Vec<Step>,
    pub stop_on_failure: bool,
}

/// The closed set of step behaviors
pub enum StepKind {
    Function(Transform),
    Conditional(ConditionalStep),
    Sequential(SequentialStep),
    Task(Box<dyn StepTask>),
}

impl StepKind {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            StepKind::Function(_) => "function",
            StepKind::Conditional(_) => "conditional",
            StepKind::Sequential(_) => "sequential",
            StepKind::Task(_) => "task",
        }
    }
}

/// A named unit of work with validation, retry and rollback policy
pub struct Step {
    /// Step name (unique within a pipeline)
    pub name: String,

    pub description: String,

    /// Required steps roll back and fail hard; optional ones degrade to a failed result
    pub required: bool,

    /// Additional attempts after the first
    pub retry_count: usize,

    /// Informational only; never enforced
    pub timeout: Option<Duration>,

    /// Base unit of the exponential backoff between attempts
    pub backoff_unit: Duration,

    pub kind: StepKind,

    pub(crate) prerequisites: Vec<StepHook>,
    pub(crate) post_actions: Vec<StepHook>,
    pub(crate) validator: Option<InputValidator>,
    pub(crate) rollback: Option<RollbackHook>,
}

impl Step {
    pub fn new(name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            required: true,
            retry_count: 0,
            timeout: None,
            backoff_unit: Duration::from_secs(1),
            kind,
            prerequisites: Vec::new(),
            post_actions: Vec::new(),
            validator: None,
            rollback: None,
        }
    }

    /// Step wrapping a table transform
    pub fn function<F>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&mut ProcessingContext) -> anyhow::Result<Option<DataFrame>> + 'static,
    {
        Self::new(name, StepKind::Function(Box::new(transform)))
    }

    /// Step choosing between two steps at run time
    pub fn conditional(
        name: impl Into<String>,
        condition: Condition,
        true_step: Step,
        false_step: Option<Step>,
    ) -> Self {
        Self::new(
            name,
            StepKind::Conditional(ConditionalStep {
                condition,
                true_step: Box::new(true_step),
                false_step: false_step.map(Box::new),
            }),
        )
    }

    /// Step running children in order
    pub fn sequential(name: impl Into<String>, steps: Vec<Step>, stop_on_failure: bool) -> Self {
        Self::new(
            name,
            StepKind::Sequential(SequentialStep {
                steps,
                stop_on_failure,
            }),
        )
    }

    /// Step delegating to a domain task
    pub fn task(name: impl Into<String>, task: impl StepTask + 'static) -> Self {
        Self::new(name, StepKind::Task(Box::new(task)))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_retries(mut self, retry_count: usize) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&ProcessingContext) -> bool + 'static,
    {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn with_rollback<F>(mut self, rollback: F) -> Self
    where
        F: Fn(&mut ProcessingContext, &anyhow::Error) -> anyhow::Result<()> + 'static,
    {
        self.rollback = Some(Box::new(rollback));
        self
    }

    pub fn add_prerequisite<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ProcessingContext) -> anyhow::Result<()> + 'static,
    {
        self.prerequisites.push(Box::new(hook));
        self
    }

    pub fn add_post_action<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ProcessingContext) -> anyhow::Result<()> + 'static,
    {
        self.post_actions.push(Box::new(hook));
        self
    }

    /// Check whether the context satisfies this step's input requirements
    pub fn validate_input(&self, context: &ProcessingContext) -> bool {
        if let Some(validator) = &self.validator {
            return validator(context);
        }
        match &self.kind {
            StepKind::Sequential(group) => !group.steps.is_empty(),
            StepKind::Task(task) => task.validate_input(context),
            StepKind::Function(_) | StepKind::Conditional(_) => true,
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("kind", &self.kind.label())
            .field("required", &self.required)
            .field("retry_count", &self.retry_count)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
