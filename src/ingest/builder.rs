//! One-stop Bronze + Silver facade over a source file

use crate::error::Result;
use crate::ingest::bronze::{BronzeProcessor, Provenance};
use crate::ingest::caster::CastSummary;
use crate::ingest::config::{FileType, SchemaConfig, SheetRef, SourceSpec};
use crate::ingest::reader::SourceReader;
use crate::ingest::silver::{SilverProcessor, ValidationReport};
use crate::ingest::frame;
use polars::prelude::*;
use std::path::Path;
use tracing::info;

/// Per-call overrides for [`MetadataBuilder::extract`]
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub sheet: Option<SheetRef>,
    pub header_row: Option<usize>,
    pub batch_id: Option<String>,
    pub add_metadata: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            sheet: None,
            header_row: None,
            batch_id: None,
            add_metadata: true,
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, sheet: impl Into<SheetRef>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    pub fn with_header_row(mut self, row: usize) -> Self {
        self.header_row = Some(row);
        self
    }

    pub fn with_batch_id(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }

    pub fn without_metadata(mut self) -> Self {
        self.add_metadata = false;
        self
    }
}

/// Structure of a freshly extracted table
#[derive(Debug, Clone)]
pub struct Preview {
    pub columns: Vec<String>,
    pub dtypes: Vec<String>,
    pub rows: DataFrame,
    /// (rows, columns) of the whole table
    pub shape: (usize, usize),
}

/// Reads, captures and cleans source files
#[derive(Debug, Clone, Default)]
pub struct MetadataBuilder {
    source: SourceSpec,
    bronze: BronzeProcessor,
    silver: SilverProcessor,
}

impl MetadataBuilder {
    pub fn new(source: SourceSpec) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    pub fn with_bronze(mut self, bronze: BronzeProcessor) -> Self {
        self.bronze = bronze;
        self
    }

    pub fn with_silver(mut self, silver: SilverProcessor) -> Self {
        self.silver = silver;
        self
    }

    pub fn source_spec(&self) -> &SourceSpec {
        &self.source
    }

    /// Bronze: read everything as text, normalize headers, tag provenance
    pub fn extract(&self, path: &Path, options: &ExtractOptions) -> Result<DataFrame> {
        let spec = SourceSpec {
            read_as_string: true,
            sheet: options.sheet.clone().unwrap_or_else(|| self.source.sheet.clone()),
            header_row: options.header_row.unwrap_or(self.source.header_row),
            ..self.source.clone()
        };
        let reader = SourceReader::new(spec);
        info!("Bronze: reading {}", path.display());
        let raw = reader.read(path)?;

        let mut provenance = Provenance::new().with_source_file(path);
        if reader.detect_file_type(path) == FileType::Excel {
            provenance = provenance.with_sheet(reader.spec().sheet.to_string());
        }
        if let Some(batch_id) = &options.batch_id {
            provenance = provenance.with_batch_id(batch_id.clone());
        }

        self.bronze.process(&raw, &provenance, options.add_metadata)
    }

    /// Silver pass over an extracted table
    pub fn transform(&mut self, df: &DataFrame, schema: &SchemaConfig, validate: bool) -> Result<DataFrame> {
        info!("Silver: transforming {} rows", df.height());
        self.silver.process(df, schema, validate)
    }

    /// `extract` then `transform`
    pub fn build(
        &mut self,
        path: &Path,
        schema: &SchemaConfig,
        options: &ExtractOptions,
        validate: bool,
    ) -> Result<DataFrame> {
        let raw = self.extract(path, options)?;
        self.transform(&raw, schema, validate)
    }

    /// Extract without metadata columns and report the table's shape and first rows
    pub fn preview(&self, path: &Path, options: &ExtractOptions, n_rows: usize) -> Result<Preview> {
        let options = ExtractOptions {
            add_metadata: false,
            ..options.clone()
        };
        let df = self.extract(path, &options)?;
        Ok(Preview {
            columns: frame::column_names(&df),
            dtypes: df.dtypes().iter().map(|d| d.to_string()).collect(),
            rows: df.head(Some(n_rows)),
            shape: df.shape(),
        })
    }

    /// Dry-run report for an extracted table
    pub fn validate(&self, df: &DataFrame, schema: &SchemaConfig) -> ValidationReport {
        self.silver.validate_only(df, schema)
    }

    pub fn cast_summary(&self) -> CastSummary {
        self.silver.cast_summary()
    }

    pub fn sheet_names(&self, path: &Path) -> Result<Vec<String>> {
        SourceReader::sheet_names(path)
    }
}
