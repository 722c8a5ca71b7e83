//! Column mapping: locate source columns by name or pattern and rename them

use crate::error::{IngestError, Result};
use crate::ingest::config::{is_metadata_column, ColumnSpec};
use crate::ingest::frame;
use polars::prelude::*;
use regex::RegexBuilder;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Resolves column specs against a table's headers
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnMapper;

impl ColumnMapper {
    pub fn new() -> Self {
        Self
    }

    /// Find the column a spec's source refers to
    ///
    /// Exact match first, then case-insensitive equality, then (for
    /// pattern-shaped sources) a case-insensitive regex search in column
    /// order. An invalid pattern logs a warning and matches nothing.
    pub fn find_matching_column(&self, columns: &[String], spec: &ColumnSpec) -> Option<String> {
        let source = spec.source.as_str();

        if let Some(found) = columns.iter().find(|c| c.as_str() == source) {
            return Some(found.clone());
        }

        let lowered = source.to_lowercase();
        if let Some(found) = columns.iter().find(|c| c.to_lowercase() == lowered) {
            return Some(found.clone());
        }

        if spec.is_regex() {
            match RegexBuilder::new(source).case_insensitive(true).build() {
                Ok(pattern) => return columns.iter().find(|c| pattern.is_match(c)).cloned(),
                Err(err) => warn!("Invalid column pattern '{}': {}", source, err),
            }
        }

        None
    }

    /// Rename matched columns to their targets
    ///
    /// Fails with every missing required spec at once. A source column
    /// claimed by an earlier spec is not renamed again, and an unmapped
    /// column already named like a target is dropped. Without
    /// `preserve_unmapped` the result holds the resolved targets in spec
    /// order followed by metadata columns.
    pub fn map_columns(&self, df: &DataFrame, specs: &[ColumnSpec], preserve_unmapped: bool) -> Result<DataFrame> {
        let columns = frame::column_names(df);
        let mut renames: HashMap<String, String> = HashMap::new();
        let mut targets: Vec<String> = Vec::new();
        let mut missing: Vec<String> = Vec::new();

        for spec in specs {
            match self.find_matching_column(&columns, spec) {
                Some(source) if renames.contains_key(&source) => {
                    warn!(
                        "Column '{}' already mapped to '{}', skipping '{}'",
                        source, renames[&source], spec.target
                    );
                }
                Some(source) => {
                    debug!("Mapped column '{}' -> '{}'", source, spec.target);
                    renames.insert(source, spec.target.clone());
                    targets.push(spec.target.clone());
                }
                None if spec.required => missing.push(spec.source.clone()),
                None => debug!("Optional column '{}' not found", spec.source),
            }
        }

        if !missing.is_empty() {
            return Err(IngestError::SchemaValidation { missing });
        }

        let mut mapped = df.clone();
        let clashing: Vec<String> = columns
            .iter()
            .filter(|c| !renames.contains_key(*c) && targets.contains(*c))
            .cloned()
            .collect();
        for column in &clashing {
            warn!("Dropping unmapped column '{}' that clashes with a mapped target", column);
            mapped = mapped.drop(column)?;
        }

        let new_names: Vec<String> = frame::column_names(&mapped)
            .into_iter()
            .map(|name| renames.get(&name).cloned().unwrap_or(name))
            .collect();
        mapped.set_column_names(new_names.iter().map(String::as_str))?;

        if !preserve_unmapped {
            let mut keep: Vec<String> = Vec::new();
            for target in &targets {
                if !keep.contains(target) && new_names.contains(target) {
                    keep.push(target.clone());
                }
            }
            let metadata: Vec<String> = new_names
                .iter()
                .filter(|c| is_metadata_column(c) && !keep.contains(*c))
                .cloned()
                .collect();
            keep.extend(metadata);
            mapped = mapped.select(keep)?;
        }

        info!("Mapped {} of {} columns", targets.len(), specs.len());
        Ok(mapped)
    }

    /// Add a constant column for every spec whose target is absent and has a default
    pub fn apply_defaults(&self, df: &DataFrame, specs: &[ColumnSpec]) -> Result<DataFrame> {
        let mut out = df.clone();
        let height = out.height();

        for spec in specs {
            let Some(default) = &spec.default else {
                continue;
            };
            if out.column(&spec.target).is_ok() {
                continue;
            }
            match frame::constant_series(&spec.target, default, height) {
                Some(series) => {
                    debug!("Filled column '{}' with default {}", spec.target, default);
                    out.with_column(series)?;
                }
                None => warn!("Default for '{}' is not a scalar, skipped", spec.target),
            }
        }

        Ok(out)
    }

    /// Required sources with no matching column
    pub fn validate_required_columns(&self, df: &DataFrame, specs: &[ColumnSpec]) -> Vec<String> {
        let columns = frame::column_names(df);
        specs
            .iter()
            .filter(|s| s.required && self.find_matching_column(&columns, s).is_none())
            .map(|s| s.source.clone())
            .collect()
    }
}
