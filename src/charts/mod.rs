//! Charts module - chart specifications and rendering

mod builder;
mod plotter;
pub mod spec;

pub use builder::{ChartBuilder, ChartError};
pub use plotter::ChartPlotter;
pub use spec::{ChartSpec, TableSpec};
