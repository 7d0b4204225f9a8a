//! Interactive Control Module
//! Binds the question and grouping selectors to the dropdown bar chart.

use crate::charts::{ChartBuilder, ChartError, ChartSpec};
use crate::data::schema::{GROUPING_RANGE, MALE_BREADWINNER, QUESTION_START, SEX};
use crate::data::{table, AggregatorError, DataProcessor};
use polars::prelude::DataFrame;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("'{0}' is not a selectable question")]
    UnknownQuestion(String),
    #[error("'{0}' is not a selectable grouping")]
    UnknownGrouping(String),
    #[error("Aggregation failed: {0}")]
    Aggregation(#[from] AggregatorError),
    #[error("Chart construction failed: {0}")]
    Chart(#[from] ChartError),
}

/// Finite option sets of the two selectors, sliced from the cleaned column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorDomains {
    pub questions: Vec<String>,
    pub groupings: Vec<String>,
}

impl SelectorDomains {
    pub fn from_columns(columns: &[String]) -> Self {
        let questions = columns.get(QUESTION_START..).unwrap_or_default().to_vec();
        let end = GROUPING_RANGE.end.min(columns.len());
        let groupings = columns
            .get(GROUPING_RANGE.start.min(end)..end)
            .unwrap_or_default()
            .to_vec();
        Self {
            questions,
            groupings,
        }
    }

    pub fn validate(&self, selection: &Selection) -> Result<(), ControlError> {
        if !self.questions.contains(&selection.question) {
            return Err(ControlError::UnknownQuestion(selection.question.clone()));
        }
        if !self.groupings.contains(&selection.grouping) {
            return Err(ControlError::UnknownGrouping(selection.grouping.clone()));
        }
        Ok(())
    }
}

/// Current values of both selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub question: String,
    pub grouping: String,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            question: MALE_BREADWINNER.to_string(),
            grouping: SEX.to_string(),
        }
    }
}

/// Control lifecycle.
///
/// Recomputation runs synchronously inside [`InteractiveControl::apply`], so
/// `Recomputing` only lasts for that call and callers always observe `Idle`.
/// The transition is traced at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    /// Last chart held.
    Idle,
    /// A selector changed; the chart is being rebuilt.
    Recomputing,
}

/// Aggregate and chart one selector combination. No state is kept between calls.
pub fn make_figure(df: &DataFrame, selection: &Selection) -> Result<ChartSpec, ControlError> {
    let counts = DataProcessor::dropdown_counts(df, &selection.question, &selection.grouping)?;
    Ok(ChartBuilder::question_bar(
        &counts,
        &selection.question,
        &selection.grouping,
    )?)
}

/// Reactive binding: a selector change rebuilds the chart from both current values.
pub struct InteractiveControl {
    table: Arc<DataFrame>,
    domains: SelectorDomains,
    selection: Selection,
    chart: ChartSpec,
    state: ControlState,
}

impl InteractiveControl {
    /// Start with the default selection.
    pub fn new(cleaned: Arc<DataFrame>) -> Result<Self, ControlError> {
        let domains = SelectorDomains::from_columns(&table::column_names(&cleaned));
        let selection = Selection::default();
        domains.validate(&selection)?;
        let chart = make_figure(&cleaned, &selection)?;

        Ok(Self {
            table: cleaned,
            domains,
            selection,
            chart,
            state: ControlState::Idle,
        })
    }

    pub fn domains(&self) -> &SelectorDomains {
        &self.domains
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn chart(&self) -> &ChartSpec {
        &self.chart
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn set_question(&mut self, question: &str) -> Result<bool, ControlError> {
        let next = Selection {
            question: question.to_string(),
            grouping: self.selection.grouping.clone(),
        };
        self.apply(next)
    }

    pub fn set_grouping(&mut self, grouping: &str) -> Result<bool, ControlError> {
        let next = Selection {
            question: self.selection.question.clone(),
            grouping: grouping.to_string(),
        };
        self.apply(next)
    }

    /// Apply a selector event. Returns whether the chart was replaced.
    ///
    /// Out-of-domain or failing selections leave the previous selection and chart in place.
    pub fn apply(&mut self, next: Selection) -> Result<bool, ControlError> {
        if next == self.selection {
            return Ok(false);
        }
        if let Err(e) = self.domains.validate(&next) {
            warn!("Ignoring selector event: {}", e);
            return Err(e);
        }

        self.state = ControlState::Recomputing;
        debug!(state = ?self.state, "Rebuilding {} by {}", next.question, next.grouping);
        let result = make_figure(&self.table, &next);
        self.state = ControlState::Idle;

        match result {
            Ok(chart) => {
                debug!(
                    "Chart replaced: {} by {}",
                    next.question, next.grouping
                );
                if tracing::enabled!(tracing::Level::TRACE) {
                    if let Ok(json) = chart.to_json() {
                        tracing::trace!("Chart spec: {}", json);
                    }
                }
                self.chart = chart;
                self.selection = next;
                Ok(true)
            }
            Err(e) => {
                warn!("Keeping previous chart: {}", e);
                Err(e)
            }
        }
    }
}
