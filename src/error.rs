//! Ingestion error types

use polars::prelude::PolarsError;
use std::collections::BTreeMap;
use thiserror::Error;

/// Result alias for the ingestion layer
pub type Result<T, E = IngestError> = std::result::Result<T, E>;

/// Errors raised by readers, mappers, casters and the circuit breaker
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Cannot read source file {path}: {message}")]
    SourceFile { path: String, message: String },

    #[error("Sheet '{sheet}' not found in {path}")]
    SheetNotFound { path: String, sheet: String },

    #[error("Missing required columns: {}", .missing.join(", "))]
    SchemaValidation { missing: Vec<String> },

    #[error(
        "Circuit breaker tripped (threshold {:.1}%): {}",
        .threshold * 100.0,
        describe_ratios(.tripped, .null_ratios)
    )]
    CircuitBreakerTripped {
        tripped: Vec<String>,
        null_ratios: BTreeMap<String, f64>,
        threshold: f64,
    },

    /// Reserved for a strict casting mode
    #[error("Failed to cast {failed_count} values of column '{column}' to {target_type}")]
    TypeCasting {
        column: String,
        target_type: String,
        failed_count: usize,
    },

    /// Reserved for a strict mapping mode
    #[error("No column matches '{pattern}' (available: {})", preview_columns(.available))]
    ColumnMapping {
        pattern: String,
        available: Vec<String>,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table operation failed: {0}")]
    Polars(#[from] PolarsError),
}

impl IngestError {
    /// Shorthand for a source-file error
    pub fn source_file(path: impl ToString, message: impl ToString) -> Self {
        IngestError::SourceFile {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    /// True for unreadable sources, including missing sheets
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            IngestError::SourceFile { .. } | IngestError::SheetNotFound { .. }
        )
    }
}

fn describe_ratios(tripped: &[String], ratios: &BTreeMap<String, f64>) -> String {
    tripped
        .iter()
        .map(|column| {
            let ratio = ratios.get(column).copied().unwrap_or_default();
            format!("{}={:.1}%", column, ratio * 100.0)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn preview_columns(available: &[String]) -> String {
    let shown = available.iter().take(10).cloned().collect::<Vec<_>>().join(", ");
    if available.len() > 10 {
        format!("{}, ... ({} total)", shown, available.len())
    } else {
        shown
    }
}
