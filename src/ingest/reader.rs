//! Source file reader for spreadsheets, CSV, Parquet and JSON

use crate::error::{IngestError, Result};
use crate::ingest::config::{FileType, SourceSpec};
use crate::ingest::frame;
use encoding_rs::Encoding;
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

/// Reads a source file into a table according to a [`SourceSpec`]
#[derive(Debug, Clone, Default)]
pub struct SourceReader {
    spec: SourceSpec,
}

impl SourceReader {
    pub fn new(spec: SourceSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &SourceSpec {
        &self.spec
    }

    /// Format implied by the extension, falling back to the configured type
    pub fn detect_file_type(&self, path: &Path) -> FileType {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => FileType::Excel,
            "csv" | "txt" => FileType::Csv,
            "parquet" | "pq" => FileType::Parquet,
            "json" => FileType::Json,
            _ => self.spec.file_type,
        }
    }

    /// Read the whole file
    pub fn read(&self, path: &Path) -> Result<DataFrame> {
        if !path.exists() {
            return Err(IngestError::source_file(path.display(), "file does not exist"));
        }

        let file_type = self.detect_file_type(path);
        debug!("Reading {} as {:?}", path.display(), file_type);

        let df = match file_type {
            FileType::Excel => self.read_excel(path)?,
            FileType::Csv => self.read_csv(path)?,
            FileType::Parquet => {
                let file = File::open(path)?;
                let df = ParquetReader::new(file)
                    .finish()
                    .map_err(|e| IngestError::source_file(path.display(), e))?;
                self.as_text_if_requested(df)?
            }
            FileType::Json => {
                let file = File::open(path)?;
                let df = JsonReader::new(file)
                    .finish()
                    .map_err(|e| IngestError::source_file(path.display(), e))?;
                self.as_text_if_requested(df)?
            }
        };

        info!(
            "Read {} rows x {} columns from {}",
            df.height(),
            df.width(),
            path.display()
        );
        Ok(df)
    }

    fn as_text_if_requested(&self, df: DataFrame) -> Result<DataFrame> {
        if self.spec.read_as_string {
            frame::all_text(df)
        } else {
            Ok(df)
        }
    }

    fn read_csv(&self, path: &Path) -> Result<DataFrame> {
        let separator = u8::try_from(self.spec.delimiter)
            .map_err(|_| IngestError::Config(format!("delimiter '{}' is not a single byte", self.spec.delimiter)))?;
        let encoding = resolve_encoding(&self.spec.encoding)?;

        if encoding == encoding_rs::UTF_8 {
            return match self.read_csv_with(path, separator, CsvEncoding::Utf8) {
                Ok(df) => Ok(df),
                Err(err) => {
                    warn!(
                        "Strict UTF-8 read of {} failed ({}); retrying with lossy decoding",
                        path.display(),
                        err
                    );
                    self.read_csv_with(path, separator, CsvEncoding::LossyUtf8)
                        .map_err(|e| IngestError::source_file(path.display(), e))
                }
            };
        }

        let bytes = fs::read(path)?;
        let (decoded, _, had_errors) = encoding.decode(&bytes);
        if had_errors {
            warn!(
                "{} is not valid {}; undecodable bytes were replaced",
                path.display(),
                encoding.name()
            );
        }
        debug!("Decoded {} from {}", path.display(), encoding.name());

        self.csv_options(separator, CsvEncoding::Utf8)
            .into_reader_with_file_handle(Cursor::new(decoded.into_owned().into_bytes()))
            .finish()
            .map_err(|e| IngestError::source_file(path.display(), e))
    }

    fn read_csv_with(&self, path: &Path, separator: u8, encoding: CsvEncoding) -> PolarsResult<DataFrame> {
        self.csv_options(separator, encoding)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()
    }

    fn csv_options(&self, separator: u8, encoding: CsvEncoding) -> CsvReadOptions {
        let schema_length = if self.spec.read_as_string { Some(0) } else { Some(10_000) };
        let parse_options = CsvParseOptions::default()
            .with_separator(separator)
            .with_encoding(encoding)
            .with_truncate_ragged_lines(true);

        CsvReadOptions::default()
            .with_has_header(true)
            .with_skip_rows(self.spec.skip_rows + self.spec.header_row)
            .with_infer_schema_length(schema_length)
            .with_parse_options(parse_options)
    }

    #[cfg(feature = "excel")]
    fn read_excel(&self, path: &Path) -> Result<DataFrame> {
        use calamine::{open_workbook_auto, Data, Reader};

        let mut workbook =
            open_workbook_auto(path).map_err(|e| IngestError::source_file(path.display(), e))?;
        let sheet = resolve_sheet(&workbook.sheet_names(), &self.spec.sheet).ok_or_else(|| {
            IngestError::SheetNotFound {
                path: path.display().to_string(),
                sheet: self.spec.sheet.to_string(),
            }
        })?;
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| IngestError::source_file(path.display(), e))?;

        let cell_text = |cell: &Data| match cell {
            Data::Empty => None,
            Data::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        };

        let mut rows = range.rows().skip(self.spec.skip_rows + self.spec.header_row);
        let headers: Vec<String> = match rows.next() {
            Some(row) => row.iter().map(|c| cell_text(c).unwrap_or_default()).collect(),
            None => return Ok(DataFrame::empty()),
        };
        let body: Vec<Vec<Option<String>>> = rows.map(|row| row.iter().map(cell_text).collect()).collect();

        frame::text_frame(&headers, &body)
    }

    #[cfg(not(feature = "excel"))]
    fn read_excel(&self, path: &Path) -> Result<DataFrame> {
        Err(IngestError::source_file(
            path.display(),
            "workbook support is not enabled (build with the `excel` feature)",
        ))
    }

    /// Sheet names of a workbook, in workbook order
    #[cfg(feature = "excel")]
    pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
        use calamine::{open_workbook_auto, Reader};

        if !path.exists() {
            return Err(IngestError::source_file(path.display(), "file does not exist"));
        }
        let workbook =
            open_workbook_auto(path).map_err(|e| IngestError::source_file(path.display(), e))?;
        Ok(workbook.sheet_names())
    }

    #[cfg(not(feature = "excel"))]
    pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
        Err(IngestError::source_file(
            path.display(),
            "workbook support is not enabled (build with the `excel` feature)",
        ))
    }
}

/// Look up a text encoding by label; Windows code page names are accepted too
fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    let normalized = label.trim().to_lowercase().replace('_', "-");
    let lookup = match normalized.as_str() {
        "cp950" | "ms950" => "big5",
        "cp936" | "ms936" => "gbk",
        "cp932" | "ms932" => "shift_jis",
        other => other,
    };
    Encoding::for_label(lookup.as_bytes())
        .ok_or_else(|| IngestError::Config(format!("unknown text encoding '{}'", label)))
}

#[cfg_attr(not(feature = "excel"), allow(dead_code))]
fn resolve_sheet(names: &[String], sheet: &crate::ingest::config::SheetRef) -> Option<String> {
    use crate::ingest::config::SheetRef;

    match sheet {
        SheetRef::Index(index) => names.get(*index).cloned(),
        SheetRef::Name(name) => names.iter().find(|n| *n == name).cloned(),
    }
}
