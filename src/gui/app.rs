//! GSS Dashboard Main Application
//! Main window with the selector panel and the chart viewer.

use crate::control::InteractiveControl;
use crate::dashboard::StaticCharts;
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction};
use egui::SidePanel;
use tracing::info;

/// Main application window.
pub struct DashboardApp {
    control: InteractiveControl,
    statics: StaticCharts,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,
}

impl DashboardApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        control: InteractiveControl,
        statics: StaticCharts,
    ) -> Self {
        Self {
            control,
            statics,
            control_panel: ControlPanel::new(),
            chart_viewer: ChartViewer::new(),
        }
    }

    /// Forward a selector change to the control and report the outcome.
    fn handle_action(&mut self, action: ControlPanelAction) {
        let result = match action {
            ControlPanelAction::QuestionChanged(question) => self.control.set_question(&question),
            ControlPanelAction::GroupingChanged(grouping) => self.control.set_grouping(&grouping),
            ControlPanelAction::None => return,
        };

        match result {
            Ok(true) => {
                let selection = self.control.selection();
                info!(
                    "Showing {} by {}",
                    selection.question, selection.grouping
                );
                self.control_panel.set_status(
                    &format!("Showing {} by {}", selection.question, selection.grouping),
                    false,
                );
            }
            Ok(false) => {}
            Err(e) => {
                self.control_panel
                    .set_status(&format!("Error: {}", e), true);
            }
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Left panel - selectors
        SidePanel::left("control_panel")
            .min_width(260.0)
            .max_width(320.0)
            .show(ctx, |ui| {
                let action =
                    self.control_panel
                        .show(ui, self.control.domains(), self.control.selection());
                self.handle_action(action);
            });

        // Central panel - figures
        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart_viewer
                .show(ui, &self.statics, self.control.chart());
        });
    }
}
