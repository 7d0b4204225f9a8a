//! Chart Viewer Widget
//! Scrollable central panel laying out the dashboard figures.

use crate::charts::{ChartPlotter, ChartSpec};
use crate::dashboard::{StaticCharts, DESCRIPTION, TITLE};
use egui::{RichText, ScrollArea};

const SECTION_SPACING: f32 = 20.0;

/// Scrollable figure area: text, summary table, dropdown chart and static charts.
#[derive(Default)]
pub struct ChartViewer {
    show_breadwinner: bool,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    fn heading(ui: &mut egui::Ui, text: &str) {
        ui.add_space(SECTION_SPACING);
        ui.label(RichText::new(text).size(20.0).strong());
        ui.add_space(6.0);
    }

    /// Draw every section top to bottom.
    pub fn show(&mut self, ui: &mut egui::Ui, statics: &StaticCharts, dropdown: &ChartSpec) {
        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.label(RichText::new(TITLE).size(26.0).strong());
                ui.add_space(10.0);
                for paragraph in DESCRIPTION.split("\n\n") {
                    ui.label(paragraph);
                    ui.add_space(6.0);
                }

                Self::heading(ui, "Summary Table");
                ChartPlotter::draw_table(ui, "summary_table", &statics.summary);

                Self::heading(ui, "Answers by Group");
                ChartPlotter::draw_chart(ui, dropdown);

                ui.add_space(6.0);
                ui.checkbox(
                    &mut self.show_breadwinner,
                    "Show views on if men should be the breadwinner",
                );
                if self.show_breadwinner {
                    ChartPlotter::draw_chart(ui, &statics.breadwinner);
                }

                Self::heading(ui, "Income vs. Job Prestige by Sex");
                ChartPlotter::draw_chart(ui, &statics.scatter);

                ui.add_space(SECTION_SPACING);
                ui.columns(2, |cols| {
                    cols[0].label(RichText::new("Income by Sex").size(20.0).strong());
                    ChartPlotter::draw_chart(&mut cols[0], &statics.income_box);
                    cols[1].label(RichText::new("Job Prestige by Sex").size(20.0).strong());
                    ChartPlotter::draw_chart(&mut cols[1], &statics.prestige_box);
                });

                Self::heading(ui, "Income by Sex and Job Prestige Bracket");
                ChartPlotter::draw_chart(ui, &statics.bracket_box);
                ui.add_space(SECTION_SPACING);
            });
    }
}
