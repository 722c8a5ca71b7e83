//! Bronze layer: raw capture with normalized headers and provenance columns

use crate::error::Result;
use crate::ingest::frame;
use chrono::Local;
use polars::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::info;
use uuid::Uuid;

pub const ROW_NUM_COLUMN: &str = "_row_num";
pub const SOURCE_FILE_COLUMN: &str = "_source_file";
pub const SHEET_NAME_COLUMN: &str = "_sheet_name";
pub const BATCH_ID_COLUMN: &str = "_batch_id";
pub const INGESTED_AT_COLUMN: &str = "_ingested_at";

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\x{4e00}-\x{9fff}]").expect("valid regex"));
static UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").expect("valid regex"));

/// Where a batch of rows came from
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    pub source_file: Option<PathBuf>,
    pub sheet: Option<String>,
    /// Generated when absent
    pub batch_id: Option<String>,
}

impl Provenance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_file(mut self, path: impl AsRef<Path>) -> Self {
        self.source_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    pub fn with_batch_id(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }
}

/// Normalize a header: whitespace runs become `_`, punctuation is removed
/// (CJK ideographs kept), underscores collapse; empty results become `unnamed`.
pub fn normalize_column_name(name: &str) -> String {
    let name = WHITESPACE.replace_all(name.trim(), "_");
    let name = DISALLOWED.replace_all(&name, "");
    let name = UNDERSCORES.replace_all(&name, "_");
    let name = name.trim_matches('_');
    if name.is_empty() {
        "unnamed".to_string()
    } else {
        name.to_string()
    }
}

/// Short random batch token
pub fn generate_batch_id() -> String {
    Uuid::new_v4().simple().to_string().chars().take(8).collect()
}

/// Raw-capture stage
#[derive(Debug, Clone, Copy)]
pub struct BronzeProcessor {
    pub normalize_columns: bool,
    pub add_row_num: bool,
}

impl Default for BronzeProcessor {
    fn default() -> Self {
        Self {
            normalize_columns: true,
            add_row_num: false,
        }
    }
}

impl BronzeProcessor {
    pub fn new(normalize_columns: bool, add_row_num: bool) -> Self {
        Self {
            normalize_columns,
            add_row_num,
        }
    }

    /// Names of the provenance columns this stage can append
    pub fn metadata_columns() -> Vec<&'static str> {
        vec![
            SOURCE_FILE_COLUMN,
            SHEET_NAME_COLUMN,
            BATCH_ID_COLUMN,
            INGESTED_AT_COLUMN,
        ]
    }

    /// Normalize headers, optionally number rows, and tag every row with provenance
    pub fn process(&self, df: &DataFrame, provenance: &Provenance, add_metadata: bool) -> Result<DataFrame> {
        let mut out = df.clone();

        if self.normalize_columns {
            let names = frame::unique_names(
                frame::column_names(&out)
                    .iter()
                    .map(|name| normalize_column_name(name)),
            );
            out.set_column_names(names.iter().map(String::as_str))?;
        }

        let height = out.height();
        if self.add_row_num {
            let row_numbers: Vec<i64> = (1..=height as i64).collect();
            out.insert_column(0, Series::new(ROW_NUM_COLUMN.into(), row_numbers))?;
        }

        if add_metadata {
            let source_file = provenance
                .source_file
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_string());
            let sheet = provenance.sheet.clone().unwrap_or_default();
            let batch_id = provenance.batch_id.clone().unwrap_or_else(generate_batch_id);
            let ingested_at = Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();

            for (name, value) in [
                (SOURCE_FILE_COLUMN, source_file),
                (SHEET_NAME_COLUMN, sheet),
                (BATCH_ID_COLUMN, batch_id),
                (INGESTED_AT_COLUMN, ingested_at),
            ] {
                out.with_column(Series::new(name.into(), vec![value; height]))?;
            }
        }

        info!("Bronze captured {} rows x {} columns", out.height(), out.width());
        Ok(out)
    }
}
