//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{IngestCommand, InspectCommand, SheetsCommand, ValidateCommand};
use std::ffi::OsString;

/// Medallion ingestion tool
#[derive(Debug, Parser, Clone)]
#[command(name = "medallion")]
#[command(version)]
#[command(about = "Turn messy spreadsheets into clean, typed tables", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Load, clean and export a source file
    Ingest(IngestCommand),

    /// Check a source file against a schema without writing anything
    Validate(ValidateCommand),

    /// Show the columns and first rows of a source file
    Inspect(InspectCommand),

    /// List the sheets of a workbook
    Sheets(SheetsCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
