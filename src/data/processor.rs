//! Data Processor Module
//! Grouped aggregations derived from the cleaned survey table.

use crate::data::schema::{
    self, COUNT, EDUCATION, INCOME, JOB_PRESTIGE, MALE_BREADWINNER, PRESTIGE_BRACKET, SEX,
    SOCIOECONOMIC_INDEX,
};
use crate::data::table;
use polars::prelude::*;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Column not found in cleaned table: {0}")]
    MissingColumn(String),
    #[error("Column '{0}' used twice as a group key")]
    DuplicateKey(String),
    #[error("Bracket count must be positive")]
    NoBrackets,
}

/// Mean columns of the summary table and their display labels.
pub const SUMMARY_MEASURES: [(&str, &str); 4] = [
    (INCOME, "Income (dollars)"),
    (JOB_PRESTIGE, "Job Prestige Index"),
    (SOCIOECONOMIC_INDEX, "Socioeconomic Index"),
    (EDUCATION, "Education (years)"),
];

pub const SUMMARY_GROUP_LABEL: &str = "Sex";

/// Job prestige binned into equal-width brackets.
#[derive(Debug, Clone)]
pub struct BracketedTable {
    /// Columns: income, sex, job_prestige, prestige_bracket.
    pub df: DataFrame,
    /// Bracket labels in ascending order.
    pub labels: Vec<String>,
    /// Bracket edges, `labels.len() + 1` values.
    pub edges: Vec<f64>,
}

/// Builds derived tables. Every operation reads the cleaned table and returns a new one.
pub struct DataProcessor;

impl DataProcessor {
    fn require(df: &DataFrame, columns: &[&str]) -> Result<(), AggregatorError> {
        for name in columns {
            if !table::has_column(df, name) {
                return Err(AggregatorError::MissingColumn(name.to_string()));
            }
        }
        Ok(())
    }

    /// Group by `keys` (null keys dropped), count rows into `count`, sort by the keys.
    pub fn count_by(df: &DataFrame, keys: &[&str]) -> Result<DataFrame, AggregatorError> {
        Self::require(df, keys)?;
        for (i, key) in keys.iter().enumerate() {
            if keys[..i].contains(key) {
                return Err(AggregatorError::DuplicateKey(key.to_string()));
            }
        }

        let not_null = keys
            .iter()
            .map(|k| col(*k).is_not_null())
            .reduce(|a, b| a.and(b))
            .unwrap_or(lit(true));
        let key_exprs: Vec<Expr> = keys.iter().map(|k| col(*k)).collect();

        let counted = df
            .clone()
            .lazy()
            .select(key_exprs.clone())
            .filter(not_null)
            .group_by(key_exprs.clone())
            .agg([len().cast(DataType::UInt64).alias(COUNT)])
            .sort_by_exprs(key_exprs, SortMultipleOptions::default())
            .collect()?;

        Ok(counted)
    }

    /// Per-sex means of income, prestige, socioeconomic index and education,
    /// rounded to 2 decimals, with display column names.
    pub fn summary_by_sex(df: &DataFrame) -> Result<DataFrame, AggregatorError> {
        let mut needed = vec![SEX];
        needed.extend(SUMMARY_MEASURES.iter().map(|(c, _)| *c));
        Self::require(df, &needed)?;

        let means: Vec<Expr> = SUMMARY_MEASURES
            .iter()
            .map(|(c, _)| col(*c).cast(DataType::Float64).mean())
            .collect();

        let grouped = df
            .clone()
            .lazy()
            .filter(col(SEX).is_not_null())
            .group_by([col(SEX)])
            .agg(means)
            .sort_by_exprs([col(SEX)], SortMultipleOptions::default())
            .collect()?;

        let mut columns: Vec<Column> = vec![grouped
            .column(SEX)?
            .clone()
            .with_name(SUMMARY_GROUP_LABEL.into())];
        for (name, label) in SUMMARY_MEASURES {
            let rounded: Float64Chunked = grouped
                .column(name)?
                .f64()?
                .into_iter()
                .map(|v| v.map(round2))
                .collect();
            columns.push(rounded.with_name(label.into()).into_series().into());
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Counts per (sex, male_breadwinner), ordered along the agreement scale.
    ///
    /// Categories outside the scale keep their relative order after the known ones.
    pub fn breadwinner_counts(df: &DataFrame) -> Result<DataFrame, AggregatorError> {
        let counted = Self::count_by(df, &[SEX, MALE_BREADWINNER])?;
        Self::sort_by_ordinal(&counted, MALE_BREADWINNER)
    }

    /// Stable sort of a derived table by the declared ordinal scale of `column`.
    pub fn sort_by_ordinal(df: &DataFrame, column: &str) -> Result<DataFrame, AggregatorError> {
        let values = table::string_values(df, column)?;
        let unknown = schema::ordinal_scale(column).map_or(0, |s| s.len());
        let mut order: Vec<IdxSize> = (0..values.len() as IdxSize).collect();
        order.sort_by_key(|&i| {
            values[i as usize]
                .as_deref()
                .and_then(|v| schema::ordinal_rank(column, v))
                .unwrap_or(unknown)
        });

        let idx = IdxCa::from_vec("idx".into(), order);
        Ok(df.take(&idx)?)
    }

    /// Counts per (question, grouping) for the dropdown bar chart.
    pub fn dropdown_counts(
        df: &DataFrame,
        question: &str,
        grouping: &str,
    ) -> Result<DataFrame, AggregatorError> {
        let counted = Self::count_by(df, &[question, grouping])?;
        debug!(
            "Dropdown aggregation {} x {}: {} rows",
            question,
            grouping,
            counted.height()
        );
        Ok(counted)
    }

    /// Bin job prestige into `bins` equal-width right-closed brackets.
    ///
    /// Rows without prestige are dropped before binning, rows without income or
    /// sex afterwards.
    pub fn prestige_brackets(df: &DataFrame, bins: usize) -> Result<BracketedTable, AggregatorError> {
        if bins == 0 {
            return Err(AggregatorError::NoBrackets);
        }
        Self::require(df, &[INCOME, SEX, JOB_PRESTIGE])?;

        let subset = df
            .clone()
            .lazy()
            .select([
                col(INCOME).cast(DataType::Float64),
                col(SEX),
                col(JOB_PRESTIGE).cast(DataType::Float64),
            ])
            .filter(col(JOB_PRESTIGE).is_not_null().and(col(JOB_PRESTIGE).is_not_nan()))
            .collect()?;

        let prestige: Vec<f64> = table::f64_values(&subset, JOB_PRESTIGE)?
            .into_iter()
            .flatten()
            .collect();
        let edges = bracket_edges(&prestige, bins);
        let labels: Vec<String> = edges
            .windows(2)
            .map(|w| interval_label(w[0], w[1]))
            .collect();

        let assigned: StringChunked = prestige
            .iter()
            .map(|&v| bracket_index(&edges, v).map(|i| labels[i].as_str()))
            .collect();

        let mut binned = subset;
        binned.with_column(assigned.with_name(PRESTIGE_BRACKET.into()).into_series())?;

        let binned = binned
            .lazy()
            .filter(
                col(INCOME)
                    .is_not_null()
                    .and(col(INCOME).is_not_nan())
                    .and(col(SEX).is_not_null())
                    .and(col(PRESTIGE_BRACKET).is_not_null()),
            )
            .collect()?;

        debug!("Prestige brackets: {:?}", labels);
        Ok(BracketedTable {
            df: binned,
            labels,
            edges,
        })
    }
}

/// Round to 2 decimals, exact ties to even.
fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}

/// `bins + 1` edges over [min, max]; the lowest edge is pulled down by 0.1% of
/// the range so the minimum falls inside the first right-closed bracket.
pub fn bracket_edges(values: &[f64], bins: usize) -> Vec<f64> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (mut lo, mut hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if lo > hi {
        return Vec::new();
    }

    let widen_both = lo == hi;
    if widen_both {
        let pad = if lo == 0.0 { 0.001 } else { 0.001 * lo.abs() };
        lo -= pad;
        hi += pad;
    }

    let step = (hi - lo) / bins as f64;
    let mut edges: Vec<f64> = (0..=bins).map(|i| lo + step * i as f64).collect();
    edges[bins] = hi;
    if !widen_both {
        edges[0] -= (hi - lo) * 0.001;
    }
    edges
}

/// Index of the right-closed bracket `(edges[i], edges[i + 1]]` containing `v`.
pub fn bracket_index(edges: &[f64], v: f64) -> Option<usize> {
    if edges.len() < 2 || !v.is_finite() {
        return None;
    }
    edges.windows(2).position(|w| v > w[0] && v <= w[1])
}

/// `(lo, hi]` with both edges rounded to 3 significant fractional digits.
pub fn interval_label(lo: f64, hi: f64) -> String {
    format!(
        "({}, {}]",
        table::format_number(round_frac(lo, 3)),
        table::format_number(round_frac(hi, 3))
    )
}

/// Round to `precision` decimals, counting from the first significant digit for |v| < 1.
fn round_frac(v: f64, precision: i32) -> f64 {
    if !v.is_finite() || v == 0.0 {
        return v;
    }
    let digits = if v.trunc() == 0.0 {
        -(v.fract().abs().log10().floor() as i32) - 1 + precision
    } else {
        precision
    };
    let scale = 10f64.powi(digits);
    (v * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::tests::fixture_table;

    #[test]
    fn test_summary_means_rounded() {
        let df = df!(
            "sex" => ["male", "female", "male", "female", "male"],
            "income" => [Some(10000.0), Some(20000.0), Some(15001.0), Some(25000.5), None],
            "job_prestige" => [40.0, 50.0, 45.0, 55.0, 50.0],
            "socioeconomic_index" => [30.0, 40.0, 35.0, 45.0, 40.0],
            "education" => [12.0, 16.0, 13.0, 14.0, 12.0]
        )
        .unwrap();

        let summary = DataProcessor::summary_by_sex(&df).unwrap();
        assert_eq!(
            table::column_names(&summary),
            vec![
                "Sex",
                "Income (dollars)",
                "Job Prestige Index",
                "Socioeconomic Index",
                "Education (years)"
            ]
        );
        assert_eq!(
            table::string_values(&summary, "Sex").unwrap(),
            vec![Some("female".to_string()), Some("male".to_string())]
        );
        let income = table::f64_values(&summary, "Income (dollars)").unwrap();
        assert_eq!(income, vec![Some(22500.25), Some(12500.5)]);
        let education = table::f64_values(&summary, "Education (years)").unwrap();
        assert_eq!(education, vec![Some(15.0), Some(12.33)]);

        // 12.125 is exact in binary; the tie goes to the even digit
        let tie = df!(
            "sex" => ["male", "male"],
            "income" => [12.0, 12.25],
            "job_prestige" => [40.0, 50.0],
            "socioeconomic_index" => [30.0, 40.0],
            "education" => [12.0, 13.0]
        )
        .unwrap();
        let summary = DataProcessor::summary_by_sex(&tie).unwrap();
        let income = table::f64_values(&summary, "Income (dollars)").unwrap();
        assert_eq!(income, vec![Some(12.12)]);
        let education = table::f64_values(&summary, "Education (years)").unwrap();
        assert_eq!(education, vec![Some(12.5)]);
    }

    #[test]
    fn test_breadwinner_ordinal_order() {
        let df = df!(
            "sex" => ["male", "female", "male", "female", "male", "female", "male"],
            "male_breadwinner" => [
                Some("strongly disagree"),
                Some("agree"),
                Some("disagree"),
                Some("strongly agree"),
                Some("agree"),
                None,
                Some("strongly disagree"),
            ]
        )
        .unwrap();

        let bars = DataProcessor::breadwinner_counts(&df).unwrap();
        let opinions: Vec<String> = table::string_values(&bars, MALE_BREADWINNER)
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(
            opinions,
            vec!["strongly agree", "agree", "agree", "disagree", "strongly disagree"]
        );
        let sexes: Vec<String> = table::string_values(&bars, SEX)
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(sexes[1], "female");
        assert_eq!(sexes[2], "male");
        let counts = table::f64_values(&bars, COUNT).unwrap();
        assert_eq!(counts[4], Some(2.0));
    }

    #[test]
    fn test_breadwinner_from_loaded_table() {
        let bars = DataProcessor::breadwinner_counts(&fixture_table()).unwrap();
        let ranks: Vec<usize> = table::string_values(&bars, MALE_BREADWINNER)
            .unwrap()
            .into_iter()
            .flatten()
            .map(|v| schema::ordinal_rank(MALE_BREADWINNER, &v).unwrap())
            .collect();
        let mut sorted = ranks.clone();
        sorted.sort();
        assert_eq!(ranks, sorted);
    }

    #[test]
    fn test_dropdown_counts_region_by_sex() {
        let df = df!(
            "sex" => ["male", "female", "male", "female", "male", "male"],
            "region" => [Some("pacific"), Some("pacific"), Some("pacific"), Some("south"), Some("south"), None]
        )
        .unwrap();

        let counts = DataProcessor::dropdown_counts(&df, "region", "sex").unwrap();
        assert_eq!(table::column_names(&counts), vec!["region", "sex", "count"]);
        assert_eq!(counts.height(), 4);

        let region = table::string_values(&counts, "region").unwrap();
        let sex = table::string_values(&counts, "sex").unwrap();
        let count = table::f64_values(&counts, "count").unwrap();
        let rows: Vec<(String, String, f64)> = (0..counts.height())
            .map(|i| {
                (
                    region[i].clone().unwrap(),
                    sex[i].clone().unwrap(),
                    count[i].unwrap(),
                )
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                ("pacific".to_string(), "female".to_string(), 1.0),
                ("pacific".to_string(), "male".to_string(), 2.0),
                ("south".to_string(), "female".to_string(), 1.0),
                ("south".to_string(), "male".to_string(), 1.0),
            ]
        );
    }

    #[test]
    fn test_dropdown_counts_numeric_grouping_sorted() {
        let df = fixture_table();
        let counts = DataProcessor::dropdown_counts(&df, "satjob", "education").unwrap();
        let total: f64 = table::f64_values(&counts, COUNT)
            .unwrap()
            .into_iter()
            .flatten()
            .sum();
        // One respondent answered satjob with a sentinel
        assert_eq!(total, 4.0);
        assert_eq!(counts.column("education").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_dropdown_missing_column() {
        let df = fixture_table();
        let err = DataProcessor::dropdown_counts(&df, "not_a_column", "sex").unwrap_err();
        assert!(matches!(err, AggregatorError::MissingColumn(ref c) if c == "not_a_column"));
        let err = DataProcessor::dropdown_counts(&df, "sex", "sex").unwrap_err();
        assert!(matches!(err, AggregatorError::DuplicateKey(_)));
    }

    #[test]
    fn test_bracket_edges_equal_width() {
        let values = [20.0, 35.0, 50.0, 65.0, 80.0, 42.0];
        let edges = bracket_edges(&values, 6);
        assert_eq!(edges.len(), 7);
        for w in edges[1..].windows(2) {
            assert!((w[1] - w[0] - 10.0).abs() < 1e-9);
        }
        assert!((edges[1] - 30.0).abs() < 1e-9);
        assert!(edges[0] < 20.0 && edges[0] > 19.9);
        assert_eq!(edges[6], 80.0);

        for v in values {
            let hits = edges.windows(2).filter(|w| v > w[0] && v <= w[1]).count();
            assert_eq!(hits, 1, "{} falls in {} brackets", v, hits);
        }
    }

    #[test]
    fn test_prestige_brackets_assign_every_row() {
        let df = df!(
            "income" => [Some(1.0), Some(2.0), Some(3.0), None, Some(5.0), Some(6.0)],
            "sex" => ["male", "female", "male", "female", "male", "female"],
            "job_prestige" => [Some(20.0), Some(80.0), Some(50.0), Some(30.0), None, Some(31.0)]
        )
        .unwrap();

        let binned = DataProcessor::prestige_brackets(&df, 6).unwrap();
        assert_eq!(binned.labels.len(), 6);
        assert_eq!(binned.labels[0], "(19.94, 30.0]");
        assert_eq!(binned.labels[1], "(30.0, 40.0]");
        assert_eq!(binned.labels[5], "(70.0, 80.0]");
        // Null prestige and null income rows are gone
        assert_eq!(binned.df.height(), 4);

        let brackets = table::string_values(&binned.df, PRESTIGE_BRACKET).unwrap();
        let expected = ["(19.94, 30.0]", "(70.0, 80.0]", "(40.0, 50.0]", "(30.0, 40.0]"];
        for (got, want) in brackets.iter().zip(expected) {
            assert_eq!(got.as_deref(), Some(want));
        }
    }

    #[test]
    fn test_constant_prestige_widened() {
        let edges = bracket_edges(&[50.0, 50.0], 2);
        assert_eq!(edges.len(), 3);
        assert!((edges[0] - 49.95).abs() < 1e-9);
        assert!((edges[2] - 50.05).abs() < 1e-9);
        assert_eq!(bracket_index(&edges, 50.0), Some(0));
    }

    #[test]
    fn test_round_frac() {
        assert_eq!(round_frac(15.93666, 3), 15.937);
        assert_eq!(round_frac(0.000123456, 3), 0.000123);
        assert_eq!(interval_label(15.936, 26.6666667), "(15.936, 26.667]");
    }
}
