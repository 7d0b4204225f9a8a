//! Table access helpers shared by the aggregator and the chart builder.

use polars::prelude::*;

/// Get list of column names, in table order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn row_count(df: &DataFrame) -> usize {
    df.height()
}

/// Whether the table has a column with this name.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Column cells rendered as display strings; nulls stay `None`.
///
/// Floats use the shortest round-trip form with a trailing `.0` for whole numbers.
pub fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?;
    match column.dtype() {
        DataType::String => Ok(column
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()),
        DataType::Float32 | DataType::Float64 => Ok(column
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map(format_number))
            .collect()),
        _ => {
            let series = column.as_materialized_series();
            Ok(series
                .iter()
                .map(|v| {
                    if v.is_null() {
                        None
                    } else {
                        Some(v.to_string().trim_matches('"').to_string())
                    }
                })
                .collect())
        }
    }
}

/// Column cells as f64; nulls and NaN stay `None`.
pub fn f64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let cast = df.column(name)?.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Distinct non-null values in first-seen order.
pub fn unique_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<String>> {
    Ok(first_seen(string_values(df, name)?.into_iter().flatten()))
}

/// Deduplicate while keeping first-seen order.
pub fn first_seen<I: IntoIterator<Item = String>>(values: I) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for v in values {
        if !seen.contains(&v) {
            seen.push(v);
        }
    }
    seen
}

/// Format a float the way survey labels print it: `12.0`, `15.936`.
pub fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}
