//! Write the primary table to disk

use crate::core::{ProcessingContext, StepResult, StepTask};
use anyhow::Context;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Output format chosen from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Parquet,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "parquet" | "pq" => ExportFormat::Parquet,
            _ => ExportFormat::Csv,
        }
    }
}

/// Save `df` as CSV or Parquet depending on the extension
pub fn save_frame(df: &mut DataFrame, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    match ExportFormat::from_path(path) {
        ExportFormat::Parquet => {
            ParquetWriter::new(file)
                .finish(df)
                .context("Failed to write Parquet file")?;
        }
        ExportFormat::Csv => {
            CsvWriter::new(file)
                .include_header(true)
                .finish(df)
                .context("Failed to write CSV file")?;
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ExportStep {
    path: PathBuf,
}

impl ExportStep {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StepTask for ExportStep {
    fn execute(&self, step_name: &str, context: &mut ProcessingContext) -> anyhow::Result<StepResult> {
        let mut df = context.data_copy();
        save_frame(&mut df, &self.path)?;

        info!("{}: wrote {} rows to {}", step_name, df.height(), self.path.display());
        Ok(StepResult::success(step_name, format!("Wrote {} rows", df.height()))
            .with_metadata("output", self.path.display().to_string())
            .with_metadata("rows", df.height()))
    }

    /// Remove a partially written file
    fn rollback(&self, _context: &mut ProcessingContext, error: &anyhow::Error) -> Option<anyhow::Result<()>> {
        if !self.path.exists() {
            return Some(Ok(()));
        }
        warn!("Removing {} after failed export: {:#}", self.path.display(), error);
        Some(
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display())),
        )
    }
}
