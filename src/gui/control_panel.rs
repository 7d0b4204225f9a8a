//! Control Panel Widget
//! Left side panel with the question and grouping selectors.

use crate::control::{Selection, SelectorDomains};
use egui::{Color32, ComboBox, RichText};

/// Left side control panel driving the dropdown bar chart.
pub struct ControlPanel {
    pub status: String,
    pub is_error: bool,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            status: "Ready".to_string(),
            is_error: false,
        }
    }
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    fn selector(
        ui: &mut egui::Ui,
        id: &str,
        current: &str,
        options: &[String],
    ) -> Option<String> {
        let mut picked = None;
        ComboBox::from_id_salt(id)
            .width(200.0)
            .selected_text(current)
            .show_ui(ui, |ui| {
                for option in options {
                    if ui.selectable_label(current == option, option).clicked()
                        && current != option
                    {
                        picked = Some(option.clone());
                    }
                }
            });
        picked
    }

    /// Draw the control panel
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        domains: &SelectorDomains,
        selection: &Selection,
    ) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("📊 GSS Dashboard")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("General Social Survey 2018")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Question Section =====
        ui.label(RichText::new("Question of Interest").size(14.0).strong());
        ui.add_space(5.0);
        if let Some(question) =
            Self::selector(ui, "question", &selection.question, &domains.questions)
        {
            action = ControlPanelAction::QuestionChanged(question);
        }

        ui.add_space(15.0);

        // ===== Grouping Section =====
        ui.label(RichText::new("Bar Grouping Category").size(14.0).strong());
        ui.add_space(5.0);
        if let Some(grouping) =
            Self::selector(ui, "grouping", &selection.grouping, &domains.groupings)
        {
            action = ControlPanelAction::GroupingChanged(grouping);
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        let status_color = if self.is_error {
            Color32::from_rgb(220, 53, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    /// Set status line
    pub fn set_status(&mut self, status: &str, is_error: bool) {
        self.status = status.to_string();
        self.is_error = is_error;
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    QuestionChanged(String),
    GroupingChanged(String),
}
