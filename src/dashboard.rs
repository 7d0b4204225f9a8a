//! Dashboard Assembly
//! Static derived charts computed once from the cleaned table.

use crate::charts::{ChartBuilder, ChartError, ChartSpec, TableSpec};
use crate::data::schema::{INCOME, JOB_PRESTIGE, MALE_BREADWINNER, SEX};
use crate::data::{AggregatorError, DataProcessor};
use polars::prelude::DataFrame;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Number of job prestige brackets in the faceted box plot.
pub const PRESTIGE_BRACKETS: usize = 6;

pub const TITLE: &str = "Economic and Opinion Differences Between Males and Females in the GSS";

pub const DESCRIPTION: &str = "\
The ratio of women's to men's earned income has remained steady at 80% to 85% over the past roughly 15 years even though women are graduating college at higher rates than men.

There is no clear single cause for this discrepancy. Rather, it is likely caused by a combination of factors. These factors may include discrimination, job selection, and women taking more time off for family or pregnancy, among others. This gap tends to widen as men and women get farther into their careers.

The General Social Survey (GSS) is a survey that has been going on since 1977. It collects data on attitude and behavioral trends in the United States. It does this by asking respondents feelings on political and cultural topics relevant at the time of the survey, along with core topics which have been consistent across surveys.";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Aggregation(#[from] AggregatorError),
    #[error(transparent)]
    Chart(#[from] ChartError),
}

/// Every figure that does not depend on user input.
#[derive(Debug, Clone)]
pub struct StaticCharts {
    pub summary: TableSpec,
    pub breadwinner: ChartSpec,
    pub scatter: ChartSpec,
    pub income_box: ChartSpec,
    pub prestige_box: ChartSpec,
    pub bracket_box: ChartSpec,
}

impl StaticCharts {
    /// Build all static figures, splitting the work across the rayon pool.
    pub fn build(table: &Arc<DataFrame>) -> Result<Self, BuildError> {
        let df: &DataFrame = table;

        let ((summary, breadwinner), ((scatter, income_box), (prestige_box, bracket_box))) =
            rayon::join(
                || {
                    rayon::join(
                        || -> Result<TableSpec, BuildError> {
                            let summary = DataProcessor::summary_by_sex(df)?;
                            Ok(ChartBuilder::table(&summary)?)
                        },
                        || -> Result<ChartSpec, BuildError> {
                            let counts = DataProcessor::breadwinner_counts(df)?;
                            let mut spec =
                                ChartBuilder::question_bar(&counts, MALE_BREADWINNER, SEX)?;
                            spec.id = "breadwinner_bar".to_string();
                            Ok(spec)
                        },
                    )
                },
                || {
                    rayon::join(
                        || {
                            rayon::join(
                                || ChartBuilder::income_prestige_scatter(df),
                                || ChartBuilder::box_by_sex(df, INCOME, "Income"),
                            )
                        },
                        || {
                            rayon::join(
                                || ChartBuilder::box_by_sex(df, JOB_PRESTIGE, "Job Prestige Rating"),
                                || -> Result<ChartSpec, BuildError> {
                                    let binned =
                                        DataProcessor::prestige_brackets(df, PRESTIGE_BRACKETS)?;
                                    Ok(ChartBuilder::income_by_bracket_box(&binned)?)
                                },
                            )
                        },
                    )
                },
            );

        let charts = Self {
            summary: summary?,
            breadwinner: breadwinner?,
            scatter: scatter?,
            income_box: income_box?,
            prestige_box: prestige_box?,
            bracket_box: bracket_box?,
        };
        info!("Built static charts from {} rows", df.height());
        Ok(charts)
    }
}
