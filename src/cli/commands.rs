//! CLI command definitions

use crate::ingest::SheetRef;
use clap::Args;
use std::path::PathBuf;

/// Where the source table lives inside its file
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Source file (xlsx, xls, csv, parquet, json)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Sheet index or name for workbooks
    #[arg(long, value_parser = parse_sheet)]
    pub sheet: Option<SheetRef>,

    /// Zero-based row holding the headers
    #[arg(long)]
    pub header_row: Option<usize>,
}

/// Schema file and the section inside it
#[derive(Debug, Args, Clone)]
pub struct SchemaArgs {
    /// YAML schema file
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Dotted path of the schema inside the file (e.g. banks.cub)
    #[arg(long)]
    pub section: Option<String>,
}

/// Run Bronze + Silver and write the result
#[derive(Debug, Args, Clone)]
pub struct IngestCommand {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub schema: SchemaArgs,

    /// Where to write the cleaned table (.csv or .parquet)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pipeline settings (YAML)
    #[arg(long)]
    pub pipeline: Option<PathBuf>,

    /// Batch identifier stamped on every row
    #[arg(long)]
    pub batch_id: Option<String>,

    /// Skip the null-ratio circuit breaker
    #[arg(long)]
    pub no_validate: bool,

    /// Extra attempts for loading the source
    #[arg(long, default_value_t = 0)]
    pub retries: usize,

    /// Context variables (key=value)
    #[arg(long, value_parser = parse_key_value)]
    pub variable: Vec<(String, String)>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Dry-run a schema against a source file
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub schema: SchemaArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Preview a source file after Bronze capture
#[derive(Debug, Args, Clone)]
pub struct InspectCommand {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Number of rows to show
    #[arg(short, long, default_value_t = 10)]
    pub rows: usize,
}

/// List sheets of a workbook
#[derive(Debug, Args, Clone)]
pub struct SheetsCommand {
    /// Workbook file
    #[arg(short, long)]
    pub file: PathBuf,
}

/// Numeric sheet arguments select by position, anything else by name
pub fn parse_sheet(s: &str) -> Result<SheetRef, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Sheet must not be empty".to_string());
    }
    Ok(SheetRef::from(s))
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
