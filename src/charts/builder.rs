//! Chart Builder Module
//! Pure functions from cleaned or aggregated tables to chart specifications.

use crate::charts::spec::{
    mapped_color, palette_color, ChartKind, ChartSpec, FacetLayout, ScatterPoint, TableSpec,
    Trace, SEX_COLORS, T10,
};
use crate::data::schema::{
    self, COUNT, EDUCATION, INCOME, JOB_PRESTIGE, PRESTIGE_BRACKET, SEX, SOCIOECONOMIC_INDEX,
};
use crate::data::{table, BracketedTable};
use crate::stats::StatsCalculator;
use polars::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Column not found: {0}")]
    MissingColumn(String),
}

/// Facet panels per row in the bracket box plot.
pub const BRACKET_FACET_WRAP: usize = 3;

/// Display order for a column's categories: declared ordinal scale first, then first-seen.
pub fn category_order(column: &str, values: &[String]) -> Vec<String> {
    let mut ordered = table::first_seen(values.iter().cloned());
    if schema::ordinal_scale(column).is_some() {
        // Stable: unknown categories stay in first-seen order after the scale
        ordered.sort_by_key(|v| schema::ordinal_rank(column, v).unwrap_or(usize::MAX));
    }
    ordered
}

pub struct ChartBuilder;

impl ChartBuilder {
    fn require(df: &DataFrame, columns: &[&str]) -> Result<(), ChartError> {
        for name in columns {
            if !table::has_column(df, name) {
                return Err(ChartError::MissingColumn(name.to_string()));
            }
        }
        Ok(())
    }

    /// Income against job prestige, one color and OLS trendline per sex.
    pub fn income_prestige_scatter(df: &DataFrame) -> Result<ChartSpec, ChartError> {
        Self::require(df, &[SEX, INCOME, JOB_PRESTIGE, EDUCATION, SOCIOECONOMIC_INDEX])?;

        let sex = table::string_values(df, SEX)?;
        let x = table::f64_values(df, JOB_PRESTIGE)?;
        let y = table::f64_values(df, INCOME)?;
        let hover_fields = [EDUCATION, SOCIOECONOMIC_INDEX];
        let hover: Vec<Vec<Option<f64>>> = hover_fields
            .iter()
            .map(|f| table::f64_values(df, f))
            .collect::<PolarsResult<_>>()?;

        let groups = category_order(SEX, &sex.iter().flatten().cloned().collect::<Vec<_>>());
        let mut traces = Vec::new();
        let mut trendlines = Vec::new();

        for group in &groups {
            let color = mapped_color(&SEX_COLORS, group);
            let points: Vec<ScatterPoint> = (0..df.height())
                .filter(|&i| sex[i].as_deref() == Some(group.as_str()))
                .filter_map(|i| {
                    Some(ScatterPoint {
                        x: x[i]?,
                        y: y[i]?,
                        hover: hover.iter().map(|h| h[i]).collect(),
                    })
                })
                .collect();

            let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
            let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
            if let Some(fit) = StatsCalculator::ols_fit(&xs, &ys) {
                let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
                let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                trendlines.push(Trace::Trendline {
                    name: group.clone(),
                    color: color.clone(),
                    fit,
                    x_range: (lo, hi),
                });
            }

            traces.push(Trace::Scatter {
                name: group.clone(),
                color,
                points,
                hover_fields: hover_fields.iter().map(|f| f.to_string()).collect(),
            });
        }
        traces.extend(trendlines);

        Ok(ChartSpec {
            id: "income_prestige_scatter".to_string(),
            kind: ChartKind::Scatter,
            title: None,
            title_centered: false,
            width: Some(700.0),
            height: Some(700.0),
            x_field: JOB_PRESTIGE.to_string(),
            y_field: INCOME.to_string(),
            x_label: "Job Prestige Rating".to_string(),
            y_label: "Income".to_string(),
            categories: Vec::new(),
            show_legend: true,
            facet: None,
            traces,
        })
    }

    /// Box plot of `y_field` per sex, legend hidden.
    pub fn box_by_sex(df: &DataFrame, y_field: &str, y_label: &str) -> Result<ChartSpec, ChartError> {
        Self::require(df, &[SEX, y_field])?;

        let sex = table::string_values(df, SEX)?;
        let y = table::f64_values(df, y_field)?;
        let categories = category_order(SEX, &sex.iter().flatten().cloned().collect::<Vec<_>>());
        let traces = Self::box_traces(&sex, &y, &categories, None, |_| true);

        Ok(ChartSpec {
            id: format!("box_{}_by_sex", y_field),
            kind: ChartKind::Box,
            title: None,
            title_centered: false,
            width: Some(700.0),
            height: Some(700.0),
            x_field: SEX.to_string(),
            y_field: y_field.to_string(),
            x_label: String::new(),
            y_label: y_label.to_string(),
            categories,
            show_legend: false,
            facet: None,
            traces,
        })
    }

    /// Income by sex, one panel per prestige bracket, three panels per row.
    pub fn income_by_bracket_box(binned: &BracketedTable) -> Result<ChartSpec, ChartError> {
        let df = &binned.df;
        Self::require(df, &[SEX, INCOME, PRESTIGE_BRACKET])?;

        let sex = table::string_values(df, SEX)?;
        let income = table::f64_values(df, INCOME)?;
        let bracket = table::string_values(df, PRESTIGE_BRACKET)?;

        let present: Vec<String> = binned
            .labels
            .iter()
            .filter(|l| bracket.iter().any(|b| b.as_deref() == Some(l.as_str())))
            .cloned()
            .collect();
        let categories = category_order(SEX, &sex.iter().flatten().cloned().collect::<Vec<_>>());

        let mut traces = Vec::new();
        for (facet, label) in present.iter().enumerate() {
            traces.extend(Self::box_traces(&sex, &income, &categories, Some(facet), |i| {
                bracket[i].as_deref() == Some(label.as_str())
            }));
        }

        Ok(ChartSpec {
            id: "income_by_bracket_box".to_string(),
            kind: ChartKind::Box,
            title: None,
            title_centered: true,
            width: Some(1000.0),
            height: Some(600.0),
            x_field: SEX.to_string(),
            y_field: INCOME.to_string(),
            x_label: "Sex".to_string(),
            y_label: "Income".to_string(),
            categories,
            show_legend: false,
            facet: Some(FacetLayout {
                field: PRESTIGE_BRACKET.to_string(),
                values: present,
                wrap: Some(BRACKET_FACET_WRAP),
            }),
            traces,
        })
    }

    fn box_traces<F: Fn(usize) -> bool>(
        groups: &[Option<String>],
        values: &[Option<f64>],
        categories: &[String],
        facet: Option<usize>,
        keep: F,
    ) -> Vec<Trace> {
        categories
            .iter()
            .filter_map(|category| {
                let selected: Vec<f64> = (0..groups.len())
                    .filter(|&i| keep(i) && groups[i].as_deref() == Some(category.as_str()))
                    .filter_map(|i| values[i])
                    .collect();
                let summary = StatsCalculator::box_summary(&selected)?;
                Some(Trace::Box {
                    name: category.clone(),
                    color: mapped_color(&SEX_COLORS, category),
                    category: category.clone(),
                    facet,
                    summary,
                })
            })
            .collect()
    }

    /// Bar chart of `count` per question category, colored by question, one panel per grouping value.
    pub fn question_bar(
        counts: &DataFrame,
        question: &str,
        grouping: &str,
    ) -> Result<ChartSpec, ChartError> {
        Self::require(counts, &[question, grouping, COUNT])?;

        let answers = table::string_values(counts, question)?;
        let groups = table::string_values(counts, grouping)?;
        let count = table::f64_values(counts, COUNT)?;

        let categories = category_order(question, &table::unique_values(counts, question)?);
        let facets = category_order(grouping, &table::unique_values(counts, grouping)?);

        let mut traces = Vec::new();
        for (color_idx, category) in categories.iter().enumerate() {
            let color = palette_color(&T10, color_idx);
            for (facet, group) in facets.iter().enumerate() {
                let total: f64 = (0..counts.height())
                    .filter(|&i| {
                        answers[i].as_deref() == Some(category.as_str())
                            && groups[i].as_deref() == Some(group.as_str())
                    })
                    .filter_map(|i| count[i])
                    .sum();
                if total > 0.0 {
                    traces.push(Trace::Bar {
                        name: category.clone(),
                        color: color.clone(),
                        category: category.clone(),
                        facet: Some(facet),
                        value: total,
                    });
                }
            }
        }

        Ok(ChartSpec {
            id: format!("bar_{}_by_{}", question, grouping),
            kind: ChartKind::Bar,
            title: None,
            title_centered: false,
            width: None,
            height: None,
            x_field: question.to_string(),
            y_field: COUNT.to_string(),
            x_label: question.to_string(),
            y_label: COUNT.to_string(),
            categories,
            show_legend: true,
            facet: Some(FacetLayout {
                field: grouping.to_string(),
                values: facets,
                wrap: None,
            }),
            traces,
        })
    }

    /// Any derived table as a static text table.
    pub fn table(df: &DataFrame) -> Result<TableSpec, ChartError> {
        let headers = table::column_names(df);
        let columns: Vec<Vec<Option<String>>> = headers
            .iter()
            .map(|h| table::string_values(df, h))
            .collect::<PolarsResult<_>>()?;
        let rows = (0..df.height())
            .map(|i| {
                columns
                    .iter()
                    .map(|c| c[i].clone().unwrap_or_default())
                    .collect()
            })
            .collect();
        Ok(TableSpec { headers, rows })
    }
}
