//! Pipeline domain model

use crate::core::{
    config::PipelineConfig,
    context::ContextSummary,
    state::TaskType,
    step::{Step, StepSnapshot},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of past runs a pipeline remembers
pub const MAX_RUN_HISTORY: usize = 100;

/// Summary produced by every pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub pipeline: String,
    pub success: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_secs: f64,
    pub total_steps: usize,
    pub executed_steps: usize,
    pub successful_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
    pub results: Vec<StepSnapshot>,
    pub context: ContextSummary,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,

    /// Set when the run itself aborted (a step panicked)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Compact record kept in a pipeline's run history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub success: bool,
    pub executed_steps: usize,
    pub failed_steps: usize,
}

impl From<&RunSummary> for RunRecord {
    fn from(summary: &RunSummary) -> Self {
        Self {
            started_at: summary.start_time,
            duration_secs: summary.duration_secs,
            success: summary.success,
            executed_steps: summary.executed_steps,
            failed_steps: summary.failed_steps,
        }
    }
}

/// Aggregate statistics over a pipeline's runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStatistics {
    pub name: String,
    pub total_executions: usize,
    pub step_names: Vec<String>,
    pub successful_runs: usize,
    pub recent_runs: Vec<RunRecord>,
    pub last_run: Option<RunSummary>,
}

/// Registry-facing description of a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineInfo {
    pub name: String,
    pub description: String,
    pub task_type: TaskType,
    pub stop_on_error: bool,
    pub steps: Vec<String>,
    pub execution_count: usize,
}

/// Ordered list of steps plus run bookkeeping
#[derive(Debug)]
pub struct Pipeline {
    pub config: PipelineConfig,
    pub(crate) steps: Vec<Step>,
    pub(crate) execution_count: usize,
    pub(crate) run_history: VecDeque<RunRecord>,
    pub(crate) last_summary: Option<RunSummary>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            steps: Vec::new(),
            execution_count: 0,
            run_history: VecDeque::new(),
            last_summary: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn add_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn add_steps(&mut self, steps: impl IntoIterator<Item = Step>) {
        self.steps.extend(steps);
    }

    /// Remove the first step with this name; false when absent
    pub fn remove_step(&mut self, name: &str) -> bool {
        match self.steps.iter().position(|s| s.name == name) {
            Some(index) => {
                self.steps.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn get_step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn clear_steps(&mut self) {
        self.steps.clear();
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name.clone()).collect()
    }

    pub fn execution_count(&self) -> usize {
        self.execution_count
    }

    pub fn last_summary(&self) -> Option<&RunSummary> {
        self.last_summary.as_ref()
    }

    pub(crate) fn record_run(&mut self, summary: &RunSummary) {
        self.execution_count += 1;
        if self.run_history.len() == MAX_RUN_HISTORY {
            self.run_history.pop_front();
        }
        self.run_history.push_back(RunRecord::from(summary));
        self.last_summary = Some(summary.clone());
    }

    pub fn statistics(&self) -> PipelineStatistics {
        PipelineStatistics {
            name: self.config.name.clone(),
            total_executions: self.execution_count,
            step_names: self.step_names(),
            successful_runs: self.run_history.iter().filter(|r| r.success).count(),
            recent_runs: self.run_history.iter().cloned().collect(),
            last_run: self.last_summary.clone(),
        }
    }

    pub fn info(&self) -> PipelineInfo {
        PipelineInfo {
            name: self.config.name.clone(),
            description: self.config.description.clone(),
            task_type: self.config.task_type,
            stop_on_error: self.config.stop_on_error,
            steps: self.step_names(),
            execution_count: self.execution_count,
        }
    }
}

/// Fluent construction of a [`Pipeline`]
pub struct PipelineBuilder {
    config: PipelineConfig,
    steps: Vec<Step>,
}

impl PipelineBuilder {
    pub fn new(name: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            config: PipelineConfig::new(name, task_type),
            steps: Vec::new(),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            config,
            steps: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.config.description = description.into();
        self
    }

    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.config.stop_on_error = stop_on_error;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    pub fn add_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn add_steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    pub fn build(self) -> Pipeline {
        let mut pipeline = Pipeline::new(self.config);
        pipeline.add_steps(self.steps);
        pipeline
    }
}
