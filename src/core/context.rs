//! Processing context - the table, side tables and diagnostics shared by steps

use crate::core::state::{StepStatus, TaskType};
use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{error, warn};

/// Outcome of a named validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Record an error; the result becomes invalid
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.is_valid = false;
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Descriptive metadata about the task a context belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMetadata {
    pub task_name: String,
    pub task_type: TaskType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One entry of the step history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Name of the step
    pub step: String,

    /// Status the step finished with
    pub status: StepStatus,

    /// When the record was appended
    pub timestamp: DateTime<Utc>,

    /// Free-form details (message, duration, ...)
    #[serde(default)]
    pub extra: Map<String, Value>,
}

/// Serializable digest of a context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSummary {
    pub task_name: String,
    pub task_type: TaskType,
    pub rows: usize,
    pub columns: Vec<String>,
    pub auxiliary_data: Vec<String>,
    pub variables: Vec<String>,
    pub error_count: usize,
    pub warning_count: usize,
    pub validations: Vec<String>,
    pub is_valid: bool,
    pub steps_executed: usize,
    pub last_step: Option<String>,
}

/// Mutable state threaded through every step of a run
///
/// A context belongs to exactly one run; steps borrow it mutably one at a time.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    data: DataFrame,

    /// Task metadata (timestamps are refreshed on every data update)
    pub metadata: ContextMetadata,

    auxiliary: HashMap<String, DataFrame>,
    variables: HashMap<String, Value>,
    errors: Vec<String>,
    warnings: Vec<String>,
    validations: HashMap<String, ValidationResult>,
    history: Vec<HistoryRecord>,
}

impl ProcessingContext {
    /// Create a context around a primary table
    pub fn new(data: DataFrame, task_name: impl Into<String>, task_type: TaskType) -> Self {
        let now = Utc::now();
        Self {
            data,
            metadata: ContextMetadata {
                task_name: task_name.into(),
                task_type,
                created_at: now,
                updated_at: now,
            },
            auxiliary: HashMap::new(),
            variables: HashMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            validations: HashMap::new(),
            history: Vec::new(),
        }
    }

    /// Create a context with an empty primary table
    pub fn empty(task_name: impl Into<String>, task_type: TaskType) -> Self {
        Self::new(DataFrame::empty(), task_name, task_type)
    }

    /// The primary table
    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    /// Replace the primary table
    pub fn update_data(&mut self, data: DataFrame) {
        self.data = data;
        self.metadata.updated_at = Utc::now();
    }

    /// Independent copy of the primary table
    pub fn data_copy(&self) -> DataFrame {
        self.data.clone()
    }

    pub fn add_auxiliary_data(&mut self, name: impl Into<String>, data: DataFrame) {
        self.auxiliary.insert(name.into(), data);
    }

    pub fn auxiliary_data(&self, name: &str) -> Option<&DataFrame> {
        self.auxiliary.get(name)
    }

    pub fn has_auxiliary_data(&self, name: &str) -> bool {
        self.auxiliary.contains_key(name)
    }

    /// Names of all auxiliary tables, sorted
    pub fn list_auxiliary_data(&self) -> Vec<String> {
        let mut names: Vec<String> = self.auxiliary.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn set_variable(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(key.into(), value.into());
    }

    pub fn variable(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    /// Variable value, or `default` when unset
    pub fn variable_or(&self, key: &str, default: Value) -> Value {
        self.variables.get(key).cloned().unwrap_or(default)
    }

    pub fn has_variable(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    /// Record an error message (also logged)
    pub fn add_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.errors.push(message);
    }

    /// Record a warning message (also logged)
    pub fn add_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn clear_warnings(&mut self) {
        self.warnings.clear();
    }

    /// Store a named validation and mirror its messages, prefixed with the name
    pub fn add_validation(&mut self, name: impl Into<String>, result: ValidationResult) {
        let name = name.into();
        for message in &result.errors {
            self.add_error(format!("[{}] {}", name, message));
        }
        for message in &result.warnings {
            self.add_warning(format!("[{}] {}", name, message));
        }
        self.validations.insert(name, result);
    }

    pub fn validation(&self, name: &str) -> Option<&ValidationResult> {
        self.validations.get(name)
    }

    /// True when every stored validation is valid
    pub fn is_valid(&self) -> bool {
        self.validations.values().all(|v| v.is_valid)
    }

    /// Append a history record
    pub fn add_history(&mut self, step: impl Into<String>, status: StepStatus, extra: Map<String, Value>) {
        self.history.push(HistoryRecord {
            step: step.into(),
            status,
            timestamp: Utc::now(),
            extra,
        });
    }

    pub fn history(&self) -> &[HistoryRecord] {
        &self.history
    }

    /// Name of the most recently recorded step
    pub fn last_step(&self) -> Option<&str> {
        self.history.last().map(|record| record.step.as_str())
    }

    pub fn summary(&self) -> ContextSummary {
        let mut variables: Vec<String> = self.variables.keys().cloned().collect();
        variables.sort();
        let mut validations: Vec<String> = self.validations.keys().cloned().collect();
        validations.sort();

        ContextSummary {
            task_name: self.metadata.task_name.clone(),
            task_type: self.metadata.task_type,
            rows: self.data.height(),
            columns: self
                .data
                .get_column_names()
                .into_iter()
                .map(|name| name.to_string())
                .collect(),
            auxiliary_data: self.list_auxiliary_data(),
            variables,
            error_count: self.errors.len(),
            warning_count: self.warnings.len(),
            validations,
            is_valid: self.is_valid(),
            steps_executed: self.history.len(),
            last_step: self.last_step().map(str::to_string),
        }
    }
}
