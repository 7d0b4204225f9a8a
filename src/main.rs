//! GSS Dashboard - Sex differences in the 2018 General Social Survey
//!
//! Loads the survey extract, derives summary tables and charts, and shows
//! them in a native window with a question/grouping selector.

mod charts;
mod config;
mod control;
mod dashboard;
mod data;
mod gui;
mod stats;

use anyhow::{anyhow, Context, Result};
use config::DashboardConfig;
use control::InteractiveControl;
use dashboard::StaticCharts;
use data::{DataSource, SurveyLoader};
use eframe::egui;
use gui::DashboardApp;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

fn init_logging(config: &DashboardConfig) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn main() -> Result<()> {
    let config = DashboardConfig::load_default()?;
    init_logging(&config)?;

    if let Err(e) = run(config) {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

fn run(config: DashboardConfig) -> Result<()> {
    // Load and clean the survey once; everything downstream reads this table
    let source = DataSource::from_location(&config.source.location);
    info!("Loading survey data from {}", source);
    let table = SurveyLoader::new(&config.source)?
        .load(&source)
        .with_context(|| format!("Failed to load survey data from {}", source))?;
    let table = Arc::new(table);

    let statics = StaticCharts::build(&table).context("Failed to build dashboard charts")?;
    let control = InteractiveControl::new(Arc::clone(&table))
        .context("Failed to build the initial selector chart")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window.width, config.window.height])
            .with_min_inner_size([1000.0, 700.0])
            .with_title("GSS Dashboard"),
        ..Default::default()
    };

    eframe::run_native(
        "GSS Dashboard",
        options,
        Box::new(move |cc| Ok(Box::new(DashboardApp::new(cc, control, statics)))),
    )
    .map_err(|e| anyhow!("Dashboard window failed: {}", e))
}
