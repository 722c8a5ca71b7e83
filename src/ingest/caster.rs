//! Safe type coercion: unparseable cells become null instead of failing

use crate::error::Result;
use crate::ingest::config::{ColumnSpec, ColumnType};
use crate::ingest::frame;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Cell texts treated as missing before numeric/date parsing
const NULL_TOKENS: &[&str] = &["", "nan", "None", "N/A", "-"];

/// Markers stripped from numeric text, in order
const NUMERIC_NOISE: &[&str] = &[",", "NT$", "$", "元"];

const TRUE_WORDS: &[&str] = &["true", "yes", "1", "y", "t", "是", "有"];
const FALSE_WORDS: &[&str] = &["false", "no", "0", "n", "f", "否", "無"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d", "%m/%d/%Y", "%d-%b-%Y", "%b %d, %Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Per-column null counts left after casting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CastSummary {
    pub total_failures: usize,
    pub failures_by_column: BTreeMap<String, usize>,
}

/// Converts text columns to their declared types without ever failing on bad values
#[derive(Debug, Clone, Default)]
pub struct SafeTypeCaster {
    cast_failures: BTreeMap<String, usize>,
}

impl SafeTypeCaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cast every spec target present in the table
    ///
    /// Resets the failure counts. A column's count is its null count after
    /// casting, which includes values that were already missing.
    pub fn cast_columns(&mut self, df: &DataFrame, specs: &[ColumnSpec]) -> Result<DataFrame> {
        self.cast_failures.clear();
        let mut out = df.clone();

        for spec in specs {
            let Ok(column) = out.column(&spec.target) else {
                continue;
            };
            if spec.dtype == ColumnType::Text {
                continue;
            }

            let cast = match &spec.dtype {
                ColumnType::Integer => Some(cast_integer(column)?),
                ColumnType::Float => Some(cast_float(column)?),
                ColumnType::Date => Some(cast_date(column, spec.date_format.as_deref())?),
                ColumnType::DateTime => Some(cast_datetime(column, spec.date_format.as_deref())?),
                ColumnType::Boolean => Some(cast_boolean(column)?),
                ColumnType::Other(name) => {
                    warn!("Unknown type '{}' for column '{}', left unchanged", name, spec.target);
                    None
                }
                ColumnType::Text => None,
            };

            if let Some(series) = cast {
                out.with_column(series)?;
            }

            let nulls = out.column(&spec.target)?.null_count();
            if nulls > 0 {
                debug!("Column '{}' has {} null(s) after casting to {}", spec.target, nulls, spec.dtype);
                self.cast_failures.insert(spec.target.clone(), nulls);
            }
        }

        Ok(out)
    }

    /// Failure counts from the last `cast_columns` call
    pub fn cast_summary(&self) -> CastSummary {
        CastSummary {
            total_failures: self.cast_failures.values().sum(),
            failures_by_column: self.cast_failures.clone(),
        }
    }
}

fn output_name(column: &Column) -> PlSmallStr {
    column.name().clone()
}

fn cast_integer(column: &Column) -> Result<Series> {
    let values: Vec<Option<i64>> = frame::column_text(column)?
        .iter()
        .map(|v| v.as_deref().and_then(parse_integer))
        .collect();
    Ok(Series::new(output_name(column), values))
}

fn cast_float(column: &Column) -> Result<Series> {
    let values: Vec<Option<f64>> = frame::column_text(column)?
        .iter()
        .map(|v| v.as_deref().and_then(parse_float))
        .collect();
    Ok(Series::new(output_name(column), values))
}

fn cast_boolean(column: &Column) -> Result<Series> {
    let values: Vec<Option<bool>> = frame::column_text(column)?
        .iter()
        .map(|v| v.as_deref().and_then(parse_boolean))
        .collect();
    Ok(Series::new(output_name(column), values))
}

fn cast_date(column: &Column, format: Option<&str>) -> Result<Series> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let days: Vec<Option<i32>> = frame::column_text(column)?
        .iter()
        .map(|v| {
            v.as_deref()
                .and_then(|text| parse_date(text, format))
                .and_then(|date| i32::try_from((date - epoch).num_days()).ok())
        })
        .collect();
    Ok(Series::new(output_name(column), days).cast(&DataType::Date)?)
}

fn cast_datetime(column: &Column, format: Option<&str>) -> Result<Series> {
    let millis: Vec<Option<i64>> = frame::column_text(column)?
        .iter()
        .map(|v| {
            v.as_deref()
                .and_then(|text| parse_datetime(text, format))
                .map(|dt| dt.and_utc().timestamp_millis())
        })
        .collect();
    Ok(Series::new(output_name(column), millis).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?)
}

fn is_null_token(text: &str) -> bool {
    NULL_TOKENS.contains(&text)
}

/// Strip separators and currency markers; `None` for missing-value tokens
fn clean_numeric_text(text: &str) -> Option<String> {
    let mut cleaned = text.trim().to_string();
    for noise in NUMERIC_NOISE {
        cleaned = cleaned.replace(noise, "");
    }
    let cleaned = cleaned.trim().to_string();
    if is_null_token(&cleaned) {
        None
    } else {
        Some(cleaned)
    }
}

/// Parse an integer cell (`"1,234"`, `"NT$500"`, `"300元"`, `"12.0"`)
pub fn parse_integer(text: &str) -> Option<i64> {
    let cleaned = clean_numeric_text(text)?;
    if let Ok(value) = cleaned.parse::<i64>() {
        return Some(value);
    }
    let value = cleaned.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// Parse a numeric cell; a trailing `%` divides by 100
pub fn parse_float(text: &str) -> Option<f64> {
    let cleaned = clean_numeric_text(text)?;
    let is_percent = cleaned.ends_with('%');
    let number = cleaned.replace('%', "");
    let value = number.trim().parse::<f64>().ok()?;
    if value.is_nan() {
        return None;
    }
    Some(if is_percent { value / 100.0 } else { value })
}

/// Parse a yes/no style cell (English and Chinese vocabulary)
pub fn parse_boolean(text: &str) -> Option<bool> {
    let word = text.trim().to_lowercase();
    if TRUE_WORDS.contains(&word.as_str()) {
        Some(true)
    } else if FALSE_WORDS.contains(&word.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Parse a date with an explicit format, or by trying common layouts
pub fn parse_date(text: &str, format: Option<&str>) -> Option<NaiveDate> {
    let text = text.trim();
    if is_null_token(text) {
        return None;
    }

    if let Some(format) = format {
        return NaiveDate::parse_from_str(text, format)
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(text, format).ok().map(|dt| dt.date()));
    }

    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
        .or_else(|| parse_datetime(text, None).map(|dt| dt.date()))
}

/// Parse a timestamp with an explicit format, or by trying common layouts
///
/// Date-only text becomes midnight.
pub fn parse_datetime(text: &str, format: Option<&str>) -> Option<NaiveDateTime> {
    let text = text.trim();
    if is_null_token(text) {
        return None;
    }

    if let Some(format) = format {
        return NaiveDateTime::parse_from_str(text, format).ok().or_else(|| {
            NaiveDate::parse_from_str(text, format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        });
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_strips_noise() {
        assert_eq!(parse_integer("1,234"), Some(1234));
        assert_eq!(parse_integer(" $1,000 "), Some(1000));
        assert_eq!(parse_integer("NT$500"), Some(500));
        assert_eq!(parse_integer("300元"), Some(300));
        assert_eq!(parse_integer("-42"), Some(-42));
        assert_eq!(parse_integer("12.0"), Some(12));
        assert_eq!(parse_integer("12.5"), None);
        assert_eq!(parse_integer("abc"), None);
        for token in ["", "nan", "None", "N/A", "-"] {
            assert_eq!(parse_integer(token), None);
        }
    }

    #[test]
    fn test_parse_float_and_percent() {
        assert_eq!(parse_float("1,234.5"), Some(1234.5));
        assert_eq!(parse_float("12.5%"), Some(0.125));
        assert_eq!(parse_float("NaN"), None);
        assert_eq!(parse_float("N/A"), None);
    }

    #[test]
    fn test_parse_boolean_vocabulary() {
        for word in ["true", "YES", " 1 ", "y", "T", "是", "有"] {
            assert_eq!(parse_boolean(word), Some(true), "{}", word);
        }
        for word in ["false", "No", "0", "n", "f", "否", "無"] {
            assert_eq!(parse_boolean(word), Some(false), "{}", word);
        }
        assert_eq!(parse_boolean("maybe"), None);
    }

    #[test]
    fn test_parse_dates() {
        let jan15 = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_date("2024-01-15", None), Some(jan15));
        assert_eq!(parse_date("2024/01/15", None), Some(jan15));
        assert_eq!(parse_date("20240115", None), Some(jan15));
        assert_eq!(parse_date("2024-01-15 08:30:00", None), Some(jan15));
        assert_eq!(parse_date("15.01.2024", Some("%d.%m.%Y")), Some(jan15));
        assert_eq!(parse_date("2024-01-15", Some("%d.%m.%Y")), None);
        assert_eq!(parse_date("not a date", None), None);
        assert_eq!(parse_date("-", None), None);
    }

    #[test]
    fn test_parse_datetime() {
        let dt = parse_datetime("2024-01-15T08:30:00Z", None).unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 08:30:00");
        let midnight = parse_datetime("2024-01-15", None).unwrap();
        assert_eq!(midnight.to_string(), "2024-01-15 00:00:00");
    }

    #[test]
    fn test_parse_datetime_with_format() {
        let dt = parse_datetime("15.01.2024 08:30", Some("%d.%m.%Y %H:%M")).unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 08:30:00");
        let midnight = parse_datetime("15.01.2024", Some("%d.%m.%Y")).unwrap();
        assert_eq!(midnight.to_string(), "2024-01-15 00:00:00");
        assert!(parse_datetime("2024-01-15 08:30:00", Some("%d.%m.%Y %H:%M")).is_none());
    }

    #[test]
    fn test_cast_datetime_honors_date_format() {
        let df = df!("ts" => &["15.01.2024 08:30", "16.01.2024 17:05"]).unwrap();
        let specs = vec![ColumnSpec::new("ts", "ts", ColumnType::DateTime).with_date_format("%d.%m.%Y %H:%M")];

        let mut caster = SafeTypeCaster::new();
        let out = caster.cast_columns(&df, &specs).unwrap();

        assert_eq!(
            out.column("ts").unwrap().dtype(),
            &DataType::Datetime(TimeUnit::Milliseconds, None)
        );
        assert_eq!(out.column("ts").unwrap().null_count(), 0);
        assert_eq!(caster.cast_summary().total_failures, 0);
    }

    #[test]
    fn test_cast_columns_counts_failures() {
        let df = df!(
            "amount" => &[Some("1,000"), Some("oops"), None],
            "rate" => &[Some("5%"), Some("1.5"), Some("2")],
            "day" => &[Some("2024-01-15"), Some("bad"), Some("2024/02/01")],
            "flag" => &[Some("是"), Some("no"), Some("?")],
            "memo" => &[None::<&str>, None, None]
        )
        .unwrap();
        let specs = vec![
            ColumnSpec::new("a", "amount", ColumnType::Integer),
            ColumnSpec::new("r", "rate", ColumnType::Float),
            ColumnSpec::new("d", "day", ColumnType::Date),
            ColumnSpec::new("f", "flag", ColumnType::Boolean),
            ColumnSpec::new("m", "memo", ColumnType::Text),
            ColumnSpec::new("x", "absent", ColumnType::Integer),
        ];

        let mut caster = SafeTypeCaster::new();
        let out = caster.cast_columns(&df, &specs).unwrap();

        assert_eq!(out.column("amount").unwrap().dtype(), &DataType::Int64);
        assert_eq!(out.column("rate").unwrap().dtype(), &DataType::Float64);
        assert_eq!(out.column("day").unwrap().dtype(), &DataType::Date);
        assert_eq!(out.column("flag").unwrap().dtype(), &DataType::Boolean);
        assert_eq!(out.column("memo").unwrap().dtype(), &DataType::String);

        let amounts = out.column("amount").unwrap().as_materialized_series().i64().unwrap().get(0);
        assert_eq!(amounts, Some(1000));
        let rate = out.column("rate").unwrap().as_materialized_series().f64().unwrap().get(0);
        assert_eq!(rate, Some(0.05));

        let summary = caster.cast_summary();
        assert_eq!(summary.failures_by_column.get("amount"), Some(&2));
        assert_eq!(summary.failures_by_column.get("day"), Some(&1));
        assert_eq!(summary.failures_by_column.get("flag"), Some(&1));
        assert!(!summary.failures_by_column.contains_key("rate"));
        assert!(!summary.failures_by_column.contains_key("memo"));
        assert_eq!(summary.total_failures, 4);
    }

    #[test]
    fn test_unknown_type_passes_through() {
        let df = df!("v" => &["x"]).unwrap();
        let specs = vec![ColumnSpec::new("v", "v", ColumnType::parse("money"))];
        let out = SafeTypeCaster::new().cast_columns(&df, &specs).unwrap();
        assert_eq!(out.column("v").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_summary_resets_between_calls() {
        let mut caster = SafeTypeCaster::new();
        let bad = df!("n" => &["x"]).unwrap();
        let good = df!("n" => &["1"]).unwrap();
        let specs = vec![ColumnSpec::new("n", "n", ColumnType::Integer)];

        caster.cast_columns(&bad, &specs).unwrap();
        assert_eq!(caster.cast_summary().total_failures, 1);
        caster.cast_columns(&good, &specs).unwrap();
        assert_eq!(caster.cast_summary(), CastSummary::default());
    }
}
