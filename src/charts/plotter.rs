//! Chart Plotter Module
//! Draws chart specifications with egui_plot.

use crate::charts::spec::{parse_hex, trendline_at, ChartKind, ChartSpec, TableSpec, Trace};
use egui::{Color32, RichText};
use egui_plot::{Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotPoints, Points};

/// Height used when a chart does not fix one.
const DEFAULT_HEIGHT: f32 = 400.0;
/// Space reserved above each facet panel for its title.
const FACET_TITLE_HEIGHT: f32 = 20.0;
const FACET_SPACING: f32 = 8.0;

/// Renders [`ChartSpec`] values inside an egui `Ui`.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Convert a `#rrggbb` string, gray when malformed.
    pub fn color(hex: &str) -> Color32 {
        parse_hex(hex)
            .map(|(r, g, b)| Color32::from_rgb(r, g, b))
            .unwrap_or(Color32::GRAY)
    }

    /// Draw a chart, laying out facet panels in rows.
    pub fn draw_chart(ui: &mut egui::Ui, spec: &ChartSpec) {
        let avail = ui.available_width();
        let width = spec.width.map_or(avail, |w| w.min(avail));
        let height = spec.height.unwrap_or(DEFAULT_HEIGHT);

        if let Some(title) = &spec.title {
            if spec.title_centered {
                ui.vertical_centered(|ui| {
                    ui.label(RichText::new(title).size(16.0).strong());
                });
            } else {
                ui.label(RichText::new(title).size(16.0).strong());
            }
        }

        let Some(layout) = &spec.facet else {
            Self::draw_panel(ui, spec, None, width, height, spec.show_legend);
            return;
        };
        if layout.values.is_empty() {
            ui.label(RichText::new("No data").color(Color32::GRAY));
            return;
        }

        let columns = layout.columns();
        let rows = layout.values.len().div_ceil(columns);
        let panel_w = (width - FACET_SPACING * (columns - 1) as f32) / columns as f32;
        let panel_h = (height / rows as f32 - FACET_TITLE_HEIGHT).max(120.0);

        for row in 0..rows {
            ui.horizontal(|ui| {
                for col in 0..columns {
                    let idx = row * columns + col;
                    if idx >= layout.values.len() {
                        break;
                    }
                    ui.vertical(|ui| {
                        ui.set_width(panel_w);
                        ui.vertical_centered(|ui| {
                            ui.label(RichText::new(layout.title(idx)).size(12.0));
                        });
                        // One legend for the whole figure
                        let legend = spec.show_legend && idx == 0;
                        Self::draw_panel(ui, spec, Some(idx), panel_w, panel_h, legend);
                    });
                    ui.add_space(FACET_SPACING);
                }
            });
        }
    }

    /// Shared y extent of every trace so facet panels use one scale.
    fn y_extent(spec: &ChartSpec) -> Option<(f64, f64)> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for trace in &spec.traces {
            match trace {
                Trace::Box { summary, .. } => {
                    lo = lo.min(summary.lower_whisker);
                    hi = hi.max(summary.upper_whisker);
                    for &o in &summary.outliers {
                        lo = lo.min(o);
                        hi = hi.max(o);
                    }
                }
                Trace::Bar { value, .. } => {
                    lo = lo.min(0.0);
                    hi = hi.max(*value);
                }
                _ => {}
            }
        }
        (lo <= hi).then_some((lo, hi))
    }

    fn draw_panel(
        ui: &mut egui::Ui,
        spec: &ChartSpec,
        facet: Option<usize>,
        width: f32,
        height: f32,
        show_legend: bool,
    ) {
        let id = match facet {
            Some(i) => format!("{}_{}", spec.id, i),
            None => spec.id.clone(),
        };

        let mut plot = Plot::new(id)
            .width(width)
            .height(height)
            .allow_scroll(false)
            .x_axis_label(spec.x_label.clone())
            .y_axis_label(spec.y_label.clone());

        if show_legend {
            plot = plot.legend(Legend::default());
        }

        if !spec.categories.is_empty() {
            let labels = spec.categories.clone();
            plot = plot.x_axis_formatter(move |mark, _range| {
                let v = mark.value;
                if (v - v.round()).abs() > 1e-6 || v < 0.0 {
                    return String::new();
                }
                labels.get(v.round() as usize).cloned().unwrap_or_default()
            });
        }

        if facet.is_some() {
            if let Some((lo, hi)) = Self::y_extent(spec) {
                plot = plot.include_y(lo).include_y(hi);
            }
        }

        if spec.kind == ChartKind::Scatter {
            plot = plot.label_formatter(Self::scatter_label_formatter(spec));
        }

        plot.show(ui, |plot_ui| {
            for trace in spec.traces_in_facet(facet) {
                let color = Self::color(trace.color());
                match trace {
                    Trace::Scatter { name, points, .. } => {
                        let pts: PlotPoints = points.iter().map(|p| [p.x, p.y]).collect();
                        plot_ui.points(Points::new(pts).radius(2.5).color(color).name(name));
                    }
                    Trace::Trendline {
                        name, fit, x_range, ..
                    } => {
                        let (x0, x1) = *x_range;
                        let pts = PlotPoints::new(vec![[x0, fit.predict(x0)], [x1, fit.predict(x1)]]);
                        plot_ui.line(Line::new(pts).color(color).width(2.0).name(name));
                    }
                    Trace::Box {
                        name,
                        category,
                        summary,
                        ..
                    } => {
                        let x = Self::category_position(spec, category);
                        let elem = BoxElem::new(
                            x,
                            BoxSpread::new(
                                summary.lower_whisker,
                                summary.q1,
                                summary.median,
                                summary.q3,
                                summary.upper_whisker,
                            ),
                        )
                        .box_width(0.5)
                        .fill(color.gamma_multiply(0.3))
                        .stroke(egui::Stroke::new(1.5, color));
                        plot_ui.box_plot(BoxPlot::new(vec![elem]).name(name));

                        if !summary.outliers.is_empty() {
                            let pts: PlotPoints =
                                summary.outliers.iter().map(|&y| [x, y]).collect();
                            plot_ui.points(Points::new(pts).radius(2.0).color(color));
                        }
                    }
                    Trace::Bar {
                        name,
                        category,
                        value,
                        ..
                    } => {
                        let x = Self::category_position(spec, category);
                        let bar = Bar::new(x, *value).width(0.8).fill(color);
                        plot_ui.bar_chart(BarChart::new(vec![bar]).color(color).name(name));
                    }
                }
            }
        });
    }

    fn category_position(spec: &ChartSpec, category: &str) -> f64 {
        spec.categories
            .iter()
            .position(|c| c == category)
            .unwrap_or(0) as f64
    }

    /// Hover text with the point's auxiliary fields, or the fit for a trendline.
    fn scatter_label_formatter(
        spec: &ChartSpec,
    ) -> impl Fn(&str, &egui_plot::PlotPoint) -> String + 'static {
        let x_label = spec.x_label.clone();
        let y_label = spec.y_label.clone();
        let x_field = spec.x_field.clone();
        let y_field = spec.y_field.clone();
        let trendlines: Vec<Trace> = spec
            .traces
            .iter()
            .filter(|t| matches!(t, Trace::Trendline { .. }))
            .cloned()
            .collect();
        let mut lookup: Vec<(f64, f64, Vec<String>)> = Vec::new();
        for trace in &spec.traces {
            if let Trace::Scatter {
                points,
                hover_fields,
                ..
            } = trace
            {
                for p in points {
                    let extra = hover_fields
                        .iter()
                        .zip(&p.hover)
                        .map(|(f, v)| match v {
                            Some(v) => format!("{}: {}", f, v),
                            None => format!("{}: -", f),
                        })
                        .collect();
                    lookup.push((p.x, p.y, extra));
                }
            }
        }

        move |name: &str, value: &egui_plot::PlotPoint| {
            let mut text = format!(
                "{}\n{}: {:.1}\n{}: {:.0}",
                name, x_label, value.x, y_label, value.y
            );
            if let Some((_, _, extra)) = lookup
                .iter()
                .find(|(x, y, _)| (x - value.x).abs() < 1e-9 && (y - value.y).abs() < 1e-9)
            {
                for line in extra {
                    text.push('\n');
                    text.push_str(line);
                }
            } else if let Some(fit) = trendline_at(&trendlines, name, value.x, value.y) {
                for line in fit.hover_lines(&x_field, &y_field) {
                    text.push('\n');
                    text.push_str(&line);
                }
            }
            text
        }
    }

    /// Draw a static table
    pub fn draw_table(ui: &mut egui::Ui, id: &str, table: &TableSpec) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                egui::Grid::new(ui.make_persistent_id(id))
                    .striped(true)
                    .min_col_width(90.0)
                    .spacing([12.0, 4.0])
                    .show(ui, |ui| {
                        for header in &table.headers {
                            ui.label(RichText::new(header).strong().size(12.0));
                        }
                        ui.end_row();

                        for row in &table.rows {
                            for cell in row {
                                ui.label(RichText::new(cell).size(12.0));
                            }
                            ui.end_row();
                        }
                    });
            });
    }
}
