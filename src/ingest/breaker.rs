//! Null-ratio circuit breaker

use crate::error::{IngestError, Result};
use crate::ingest::config::{is_metadata_column, validate_threshold, ColumnSpec};
use crate::ingest::frame;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Whether the breaker tripped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BreakerStatus {
    Ok,
    Tripped,
}

/// Outcome of a breaker check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerResult {
    pub status: BreakerStatus,
    pub null_ratios: BTreeMap<String, f64>,
    pub tripped_columns: Vec<String>,
    pub threshold: f64,
    pub message: String,
}

impl CircuitBreakerResult {
    pub fn is_tripped(&self) -> bool {
        self.status == BreakerStatus::Tripped
    }

    pub fn is_ok(&self) -> bool {
        self.status == BreakerStatus::Ok
    }
}

/// Null statistics of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullSummary {
    pub column: String,
    pub null_count: usize,
    pub null_ratio: f64,
    pub exceeds_threshold: bool,
}

/// Which columns a check covers
#[derive(Debug, Clone, Copy)]
pub enum CheckScope<'a> {
    /// Spec targets present in the table
    Specs(&'a [ColumnSpec]),
    /// Named columns present in the table
    Columns(&'a [String]),
    /// Every non-metadata column
    AllData,
}

/// Blocks tables whose columns are mostly empty
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitBreaker {
    threshold: f64,
}

impl CircuitBreaker {
    /// Threshold must lie in `0..=1`
    pub fn new(threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compute null ratios and trip when any exceeds the threshold
    ///
    /// An empty specs or columns list falls through to the next scope.
    pub fn check(&self, df: &DataFrame, scope: CheckScope<'_>) -> CircuitBreakerResult {
        let present = frame::column_names(df);
        let columns: Vec<String> = match scope {
            CheckScope::Specs(specs) if !specs.is_empty() => specs
                .iter()
                .map(|s| s.target.clone())
                .filter(|t| present.contains(t))
                .collect(),
            CheckScope::Columns(names) if !names.is_empty() => {
                names.iter().filter(|n| present.contains(*n)).cloned().collect()
            }
            _ => present.iter().filter(|c| !is_metadata_column(c)).cloned().collect(),
        };

        if columns.is_empty() {
            return CircuitBreakerResult {
                status: BreakerStatus::Ok,
                null_ratios: BTreeMap::new(),
                tripped_columns: Vec::new(),
                threshold: self.threshold,
                message: "No columns to check".to_string(),
            };
        }

        let mut null_ratios = BTreeMap::new();
        let mut tripped_columns = Vec::new();
        for column in &columns {
            let ratio = self.null_ratio(df, column);
            if ratio > self.threshold {
                warn!(
                    "Column '{}' null ratio {:.1}% exceeds {:.1}%",
                    column,
                    ratio * 100.0,
                    self.threshold * 100.0
                );
                tripped_columns.push(column.clone());
            }
            null_ratios.insert(column.clone(), ratio);
        }

        if tripped_columns.is_empty() {
            info!("Circuit breaker OK ({} columns checked)", columns.len());
            CircuitBreakerResult {
                status: BreakerStatus::Ok,
                null_ratios,
                tripped_columns,
                threshold: self.threshold,
                message: format!("All {} columns within threshold", columns.len()),
            }
        } else {
            let details = tripped_columns
                .iter()
                .map(|c| format!("{} ({:.1}%)", c, null_ratios[c] * 100.0))
                .collect::<Vec<_>>()
                .join(", ");
            CircuitBreakerResult {
                status: BreakerStatus::Tripped,
                message: format!(
                    "Circuit breaker tripped: null ratio above {:.1}% in {}",
                    self.threshold * 100.0,
                    details
                ),
                null_ratios,
                tripped_columns,
                threshold: self.threshold,
            }
        }
    }

    /// Like [`check`](Self::check) but a trip becomes an error
    pub fn check_and_raise(&self, df: &DataFrame, scope: CheckScope<'_>) -> Result<CircuitBreakerResult> {
        let result = self.check(df, scope);
        if result.is_tripped() {
            return Err(IngestError::CircuitBreakerTripped {
                tripped: result.tripped_columns,
                null_ratios: result.null_ratios,
                threshold: result.threshold,
            });
        }
        Ok(result)
    }

    /// Null statistics for every column, metadata included
    pub fn null_summary(&self, df: &DataFrame) -> Vec<NullSummary> {
        df.get_columns()
            .iter()
            .map(|column| {
                let null_count = column.null_count();
                let null_ratio = ratio(null_count, df.height());
                NullSummary {
                    column: column.name().to_string(),
                    null_count,
                    null_ratio,
                    exceeds_threshold: null_ratio > self.threshold,
                }
            })
            .collect()
    }

    fn null_ratio(&self, df: &DataFrame, column: &str) -> f64 {
        df.column(column)
            .map(|c| ratio(c.null_count(), df.height()))
            .unwrap_or(0.0)
    }
}

fn ratio(nulls: usize, rows: usize) -> f64 {
    if rows == 0 {
        0.0
    } else {
        nulls as f64 / rows as f64
    }
}
