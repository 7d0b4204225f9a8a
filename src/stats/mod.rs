//! Stats module - box summaries and trendlines

mod calculator;

pub use calculator::{BoxSummary, OlsFit, StatsCalculator};
