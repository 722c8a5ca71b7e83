//! Source and schema configuration

use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// Prefix marking provenance columns that survive mapping
pub const METADATA_PREFIX: &str = "_";

/// Returns true when the column is a provenance column
pub fn is_metadata_column(name: &str) -> bool {
    name.starts_with(METADATA_PREFIX)
}

/// Supported source formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    #[default]
    Excel,
    Csv,
    Parquet,
    Json,
}

/// Worksheet selector: position or name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetRef {
    Index(usize),
    Name(String),
}

impl Default for SheetRef {
    fn default() -> Self {
        SheetRef::Index(0)
    }
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetRef::Index(index) => write!(f, "{}", index),
            SheetRef::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for SheetRef {
    /// Numeric text selects by position
    fn from(value: &str) -> Self {
        match value.trim().parse::<usize>() {
            Ok(index) => SheetRef::Index(index),
            Err(_) => SheetRef::Name(value.to_string()),
        }
    }
}

/// How to read a source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSpec {
    /// Fallback when the extension is not recognized
    pub file_type: FileType,

    /// Expected text encoding
    pub encoding: String,

    /// Keep every cell as text so no information is lost on read
    pub read_as_string: bool,

    #[serde(rename = "sheet_name")]
    pub sheet: SheetRef,

    /// Header row, counted after `skip_rows`
    pub header_row: usize,

    /// Leading rows to drop before the header
    pub skip_rows: usize,

    pub delimiter: char,
}

impl Default for SourceSpec {
    fn default() -> Self {
        Self {
            file_type: FileType::Excel,
            encoding: "utf-8".to_string(),
            read_as_string: true,
            sheet: SheetRef::default(),
            header_row: 0,
            skip_rows: 0,
            delimiter: ',',
        }
    }
}

/// Target type of a mapped column
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    #[default]
    Text,
    Integer,
    Float,
    Date,
    DateTime,
    Boolean,
    /// Unrecognized type name, passed through untouched
    Other(String),
}

impl ColumnType {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_uppercase().as_str() {
            "VARCHAR" | "STRING" | "TEXT" => ColumnType::Text,
            "BIGINT" | "INTEGER" | "INT" | "INT64" => ColumnType::Integer,
            "DOUBLE" | "FLOAT" | "DECIMAL" | "NUMERIC" => ColumnType::Float,
            "DATE" => ColumnType::Date,
            "DATETIME" | "TIMESTAMP" => ColumnType::DateTime,
            "BOOLEAN" | "BOOL" => ColumnType::Boolean,
            _ => ColumnType::Other(name.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::Text => "VARCHAR",
            ColumnType::Integer => "BIGINT",
            ColumnType::Float => "DOUBLE",
            ColumnType::Date => "DATE",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Other(name) => name,
        }
    }
}

impl From<String> for ColumnType {
    fn from(value: String) -> Self {
        ColumnType::parse(&value)
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping of one source column (name or pattern) to a typed target column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Exact header name or a regex pattern
    pub source: String,

    pub target: String,

    #[serde(default)]
    pub dtype: ColumnType,

    #[serde(default)]
    pub required: bool,

    /// Value filling the column when the source is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Explicit parse format for date columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
}

impl ColumnSpec {
    pub fn new(source: impl Into<String>, target: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            dtype,
            required: false,
            default: None,
            date_format: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    /// Whether `source` should be treated as a regular expression
    pub fn is_regex(&self) -> bool {
        let source = &self.source;
        source.contains(".*") || source.contains('|') || source.starts_with('^') || source.ends_with('$')
    }
}

/// Column mapping plus data-quality policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub columns: Vec<ColumnSpec>,

    /// Maximum tolerated null ratio per column
    #[serde(default = "default_threshold")]
    pub circuit_breaker_threshold: f64,

    #[serde(default = "default_true")]
    pub filter_empty_rows: bool,

    /// Keep columns no spec maps to
    #[serde(default)]
    pub preserve_unmapped: bool,
}

fn default_threshold() -> f64 {
    0.3
}

fn default_true() -> bool {
    true
}

impl SchemaConfig {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self {
            columns,
            circuit_breaker_threshold: default_threshold(),
            filter_empty_rows: true,
            preserve_unmapped: false,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Result<Self> {
        self.circuit_breaker_threshold = threshold;
        self.validate()?;
        Ok(self)
    }

    pub fn with_filter_empty_rows(mut self, filter: bool) -> Self {
        self.filter_empty_rows = filter;
        self
    }

    pub fn with_preserve_unmapped(mut self, preserve: bool) -> Self {
        self.preserve_unmapped = preserve;
        self
    }

    /// Check the threshold range and spec targets
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.circuit_breaker_threshold)?;
        for spec in &self.columns {
            if spec.target.trim().is_empty() {
                return Err(IngestError::Config(format!(
                    "column '{}' has an empty target",
                    spec.source
                )));
            }
        }
        Ok(())
    }

    pub fn required_columns(&self) -> Vec<&ColumnSpec> {
        self.columns.iter().filter(|c| c.required).collect()
    }

    pub fn target_columns(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.target.clone()).collect()
    }

    /// Parse from YAML text; `section` is a dotted path into nested mappings
    pub fn from_yaml_str(yaml: &str, section: Option<&str>) -> Result<Self> {
        let root: serde_yaml::Value = serde_yaml::from_str(yaml)
            .map_err(|e| IngestError::Config(format!("invalid YAML: {}", e)))?;
        let node = match section {
            Some(path) => select_section(&root, path)?,
            None => &root,
        };
        Self::from_value(node.clone())
    }

    /// Load from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P, section: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!("cannot read schema file {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content, section)
    }

    /// Build from an already-parsed YAML node; unknown keys are ignored
    pub fn from_value(value: serde_yaml::Value) -> Result<Self> {
        let config: SchemaConfig = serde_yaml::from_value(value)
            .map_err(|e| IngestError::Config(format!("invalid schema: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| IngestError::Config(e.to_string()))
    }
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<()> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(IngestError::Config(format!(
            "circuit breaker threshold must be between 0 and 1, got {}",
            threshold
        )))
    }
}

fn select_section<'a>(root: &'a serde_yaml::Value, path: &str) -> Result<&'a serde_yaml::Value> {
    let mut node = root;
    for key in path.split('.').filter(|k| !k.is_empty()) {
        node = node
            .get(key)
            .ok_or_else(|| IngestError::Config(format!("section '{}' not found (in '{}')", key, path)))?;
    }
    Ok(node)
}
