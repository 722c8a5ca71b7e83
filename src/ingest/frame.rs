//! DataFrame helpers shared by the ingestion stages

use crate::error::Result;
use polars::prelude::*;
use serde_json::Value;
use std::collections::HashSet;

/// Column names as owned strings, in table order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Cell values of a column rendered as text; nulls stay `None`
pub fn column_text(column: &Column) -> Result<Vec<Option<String>>> {
    let series = column.as_materialized_series().cast(&DataType::String)?;
    let values = series.str()?;
    Ok(values.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Make names unique by suffixing repeats (`amount`, `amount_2`, ...)
pub fn unique_names<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for name in names {
        let mut candidate = name.clone();
        let mut n = 2;
        while seen.contains(&candidate) {
            candidate = format!("{}_{}", name, n);
            n += 1;
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

/// Build an all-text table from a header row and body rows
///
/// Short rows are padded with nulls; cells beyond the header are dropped.
pub fn text_frame(headers: &[String], rows: &[Vec<Option<String>>]) -> Result<DataFrame> {
    let names = unique_names(headers.iter().enumerate().map(|(i, h)| {
        if h.trim().is_empty() {
            format!("Unnamed: {}", i)
        } else {
            h.clone()
        }
    }));

    let columns = names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let values: Vec<Option<String>> = rows
                .iter()
                .map(|row| row.get(index).cloned().flatten())
                .collect();
            Column::from(Series::new(name.as_str().into(), values))
        })
        .collect::<Vec<_>>();

    Ok(DataFrame::new(columns)?)
}

/// Cast every column to text
pub fn all_text(df: DataFrame) -> Result<DataFrame> {
    let columns = df
        .get_columns()
        .iter()
        .map(|c| c.cast(&DataType::String))
        .collect::<PolarsResult<Vec<Column>>>()?;
    Ok(DataFrame::new(columns)?)
}

/// Column repeating a scalar `height` times; `None` for null or nested values
pub fn constant_series(name: &str, value: &Value, height: usize) -> Option<Series> {
    let name: PlSmallStr = name.into();
    let series = match value {
        Value::String(text) => Series::new(name, vec![text.as_str(); height]),
        Value::Bool(flag) => Series::new(name, vec![*flag; height]),
        Value::Number(number) => match number.as_i64() {
            Some(int) => Series::new(name, vec![int; height]),
            None => Series::new(name, vec![number.as_f64()?; height]),
        },
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    Some(series)
}

/// Text is blank when null or whitespace only
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}
