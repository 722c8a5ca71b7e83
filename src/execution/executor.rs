//! Pipeline registry - runs named pipelines on fresh contexts

use crate::core::{
    context::ProcessingContext,
    pipeline::{Pipeline, PipelineInfo, RunSummary},
};
use polars::prelude::DataFrame;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from the pipeline registry
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Pipeline {0} not found")]
    PipelineNotFound(String),
}

/// Inputs for one registry-driven run
#[derive(Debug, Default)]
pub struct ExecutionInput {
    /// Primary table (empty when absent)
    pub data: Option<DataFrame>,
    pub auxiliary: HashMap<String, DataFrame>,
    pub variables: HashMap<String, Value>,
}

impl ExecutionInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, data: DataFrame) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_auxiliary(mut self, name: impl Into<String>, data: DataFrame) -> Self {
        self.auxiliary.insert(name.into(), data);
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }
}

/// Outcome of a registry-driven run: the summary and the final context
#[derive(Debug)]
pub struct PipelineRun {
    pub summary: RunSummary,
    pub context: ProcessingContext,
}

/// Named collection of pipelines
#[derive(Debug, Default)]
pub struct PipelineExecutor {
    pipelines: HashMap<String, Pipeline>,
}

impl PipelineExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pipeline under its configured name, replacing any previous one
    pub fn register_pipeline(&mut self, pipeline: Pipeline) {
        let name = pipeline.name().to_string();
        if self.pipelines.insert(name.clone(), pipeline).is_some() {
            warn!("Replaced registered pipeline {}", name);
        } else {
            info!("Registered pipeline {}", name);
        }
    }

    /// Remove a pipeline; false when it was not registered
    pub fn unregister_pipeline(&mut self, name: &str) -> bool {
        self.pipelines.remove(name).is_some()
    }

    pub fn get_pipeline(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.get(name)
    }

    /// Registered names, sorted
    pub fn list_pipelines(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pipelines.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn pipeline_info(&self, name: &str) -> Option<PipelineInfo> {
        self.pipelines.get(name).map(Pipeline::info)
    }

    /// Run a registered pipeline on a context built from `input`
    pub fn execute_pipeline(&mut self, name: &str, input: ExecutionInput) -> Result<PipelineRun, ExecutionError> {
        let pipeline = self
            .pipelines
            .get_mut(name)
            .ok_or_else(|| ExecutionError::PipelineNotFound(name.to_string()))?;

        let data = input.data.unwrap_or_else(DataFrame::empty);
        let mut context = ProcessingContext::new(data, &pipeline.config.name, pipeline.config.task_type);
        for (aux_name, aux_data) in input.auxiliary {
            context.add_auxiliary_data(aux_name, aux_data);
        }
        for (key, value) in input.variables {
            context.set_variable(key, value);
        }

        let summary = pipeline.execute(&mut context);
        Ok(PipelineRun { summary, context })
    }
}
