//! Silver layer: schema conformance and the quality gate

use crate::error::Result;
use crate::ingest::breaker::{CheckScope, CircuitBreaker, CircuitBreakerResult};
use crate::ingest::caster::{CastSummary, SafeTypeCaster};
use crate::ingest::config::{is_metadata_column, SchemaConfig};
use crate::ingest::frame;
use crate::ingest::mapper::ColumnMapper;
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Dry-run quality report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub missing_required_columns: Vec<String>,
    /// `None` when the dry run itself could not be computed
    pub circuit_breaker: Option<CircuitBreakerResult>,
}

/// Mapping, defaults, casting, empty-row filtering and the circuit breaker in one pass
#[derive(Debug, Clone, Default)]
pub struct SilverProcessor {
    mapper: ColumnMapper,
    caster: SafeTypeCaster,
    breaker: Option<CircuitBreaker>,
}

impl SilverProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this breaker instead of one built from each schema's threshold
    pub fn with_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn process(&mut self, df: &DataFrame, schema: &SchemaConfig, validate: bool) -> Result<DataFrame> {
        let input_rows = df.height();

        let mapped = self
            .mapper
            .map_columns(df, &schema.columns, schema.preserve_unmapped)?;
        let with_defaults = self.mapper.apply_defaults(&mapped, &schema.columns)?;
        let mut out = self.caster.cast_columns(&with_defaults, &schema.columns)?;

        let summary = self.caster.cast_summary();
        if summary.total_failures > 0 {
            warn!(
                "Type casting left {} null value(s): {:?}",
                summary.total_failures, summary.failures_by_column
            );
        }

        if schema.filter_empty_rows {
            out = filter_empty_rows(&out, &schema.target_columns())?;
        }

        if validate {
            let breaker = match self.breaker {
                Some(breaker) => breaker,
                None => CircuitBreaker::new(schema.circuit_breaker_threshold)?,
            };
            breaker.check_and_raise(&out, CheckScope::Specs(&schema.columns))?;
        }

        info!(
            "Silver produced {} rows x {} columns from {} input rows",
            out.height(),
            out.width(),
            input_rows
        );
        Ok(out)
    }

    /// Cast failures from the last `process` call
    pub fn cast_summary(&self) -> CastSummary {
        self.caster.cast_summary()
    }

    /// Report schema problems without producing output or touching this processor's state
    ///
    /// A breaker check that cannot be computed leaves `circuit_breaker` empty
    /// and does not by itself make the report invalid.
    pub fn validate_only(&self, df: &DataFrame, schema: &SchemaConfig) -> ValidationReport {
        let missing = self.mapper.validate_required_columns(df, &schema.columns);
        let circuit_breaker = match self.dry_run(df, schema) {
            Ok(result) => Some(result),
            Err(err) => {
                debug!("Dry run could not be computed: {}", err);
                None
            }
        };

        let valid = missing.is_empty() && circuit_breaker.as_ref().map_or(true, |r| r.is_ok());
        ValidationReport {
            valid,
            missing_required_columns: missing,
            circuit_breaker,
        }
    }

    fn dry_run(&self, df: &DataFrame, schema: &SchemaConfig) -> Result<CircuitBreakerResult> {
        let mapped = self.mapper.map_columns(df, &schema.columns, true)?;
        let cast = SafeTypeCaster::new().cast_columns(&mapped, &schema.columns)?;
        let breaker = match self.breaker {
            Some(breaker) => breaker,
            None => CircuitBreaker::new(schema.circuit_breaker_threshold)?,
        };
        Ok(breaker.check(&cast, CheckScope::Specs(&schema.columns)))
    }
}

/// Drop rows whose target columns are all null or blank
///
/// Only non-metadata targets present in the table are considered; with none
/// present the table is returned unchanged.
pub fn filter_empty_rows(df: &DataFrame, targets: &[String]) -> Result<DataFrame> {
    let present = frame::column_names(df);
    let columns: Vec<&String> = targets
        .iter()
        .filter(|t| !is_metadata_column(t) && present.contains(*t))
        .collect();
    if columns.is_empty() {
        return Ok(df.clone());
    }

    let mut keep = vec![false; df.height()];
    for name in columns {
        let values = frame::column_text(df.column(name)?)?;
        for (row, value) in values.iter().enumerate() {
            if !frame::is_blank(value.as_deref()) {
                keep[row] = true;
            }
        }
    }

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let filtered = df.filter(&mask)?;
    let removed = df.height() - filtered.height();
    if removed > 0 {
        info!("Removed {} empty row(s)", removed);
    }
    Ok(filtered)
}
