//! Step that extracts a source file into the context

use crate::core::{ProcessingContext, StepResult, StepTask};
use crate::ingest::{ExtractOptions, MetadataBuilder};
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where the loaded table goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadTarget {
    Main,
    Auxiliary(String),
}

/// Bronze extract of one file
#[derive(Debug, Clone)]
pub struct LoadSourceStep {
    path: PathBuf,
    builder: MetadataBuilder,
    options: ExtractOptions,
    target: LoadTarget,
}

impl LoadSourceStep {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            builder: MetadataBuilder::default(),
            options: ExtractOptions::default(),
            target: LoadTarget::Main,
        }
    }

    pub fn with_builder(mut self, builder: MetadataBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Store the table under `name` instead of replacing the primary table
    pub fn into_auxiliary(mut self, name: impl Into<String>) -> Self {
        self.target = LoadTarget::Auxiliary(name.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StepTask for LoadSourceStep {
    fn execute(&self, step_name: &str, context: &mut ProcessingContext) -> anyhow::Result<StepResult> {
        let df = self
            .builder
            .extract(&self.path, &self.options)
            .with_context(|| format!("Failed to load {}", self.path.display()))?;
        let (rows, columns) = df.shape();

        let message = match &self.target {
            LoadTarget::Main => {
                context.update_data(df.clone());
                format!("Loaded {} rows x {} columns", rows, columns)
            }
            LoadTarget::Auxiliary(name) => {
                context.add_auxiliary_data(name.clone(), df.clone());
                format!("Loaded {} rows x {} columns into '{}'", rows, columns, name)
            }
        };
        info!("{}: {}", step_name, message);

        Ok(StepResult::success(step_name, message)
            .with_data(df)
            .with_metadata("rows", rows)
            .with_metadata("columns", columns)
            .with_metadata("source_file", self.path.display().to_string()))
    }

    fn validate_input(&self, _context: &ProcessingContext) -> bool {
        self.path.is_file()
    }
}
