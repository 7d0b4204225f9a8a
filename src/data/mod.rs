//! Data module - survey loading, schema and aggregation

pub mod loader;
mod processor;
pub mod schema;
pub mod table;

pub use loader::{DataSource, LoaderError, SurveyLoader};
pub use processor::{AggregatorError, BracketedTable, DataProcessor};
