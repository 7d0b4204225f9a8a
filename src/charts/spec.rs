//! Chart Specification Module
//! Renderer-independent chart descriptions produced by the chart builder.
//!
//! Specifications hold only vectors and plain values so that serializing the
//! same input always yields the same JSON.

use crate::stats::{BoxSummary, OlsFit};
use serde::Serialize;

/// Fixed colors for the two sexes.
pub const SEX_COLORS: [(&str, &str); 2] = [("male", "#369b94"), ("female", "#dd7423")];

/// Qualitative "T10" palette used for question categories.
pub const T10: [&str; 10] = [
    "#4C78A8", "#F58518", "#E45756", "#72B7B2", "#54A24B", "#EECA3B", "#B279A2", "#FF9DA6",
    "#9D755D", "#BAB0AC",
];

/// Fallback color for categories without a mapping.
pub const DEFAULT_COLOR: &str = "#636efa";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Scatter,
    Box,
    Bar,
}

/// Small-multiple layout: one panel per value of `field`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetLayout {
    pub field: String,
    /// Panel values in display order.
    pub values: Vec<String>,
    /// Panels per row; `None` keeps them all on one row.
    pub wrap: Option<usize>,
}

impl FacetLayout {
    /// Panel title in `field=value` form.
    pub fn title(&self, index: usize) -> String {
        format!("{}={}", self.field, self.values[index])
    }

    pub fn columns(&self) -> usize {
        self.wrap
            .unwrap_or(self.values.len())
            .min(self.values.len())
            .max(1)
    }
}

/// One scatter point with its hover values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub hover: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trace {
    Scatter {
        name: String,
        color: String,
        points: Vec<ScatterPoint>,
        hover_fields: Vec<String>,
    },
    Trendline {
        name: String,
        color: String,
        fit: OlsFit,
        x_range: (f64, f64),
    },
    Box {
        name: String,
        color: String,
        /// X category the box is drawn over.
        category: String,
        /// Facet panel index, `None` when unfaceted.
        facet: Option<usize>,
        summary: BoxSummary,
    },
    Bar {
        name: String,
        color: String,
        category: String,
        facet: Option<usize>,
        value: f64,
    },
}

impl Trace {
    pub fn name(&self) -> &str {
        match self {
            Trace::Scatter { name, .. }
            | Trace::Trendline { name, .. }
            | Trace::Box { name, .. }
            | Trace::Bar { name, .. } => name,
        }
    }

    pub fn color(&self) -> &str {
        match self {
            Trace::Scatter { color, .. }
            | Trace::Trendline { color, .. }
            | Trace::Box { color, .. }
            | Trace::Bar { color, .. } => color,
        }
    }

    pub fn facet(&self) -> Option<usize> {
        match self {
            Trace::Box { facet, .. } | Trace::Bar { facet, .. } => *facet,
            _ => None,
        }
    }
}

/// A complete chart, consumed by the plotter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    /// Stable identifier used for widget ids.
    pub id: String,
    pub kind: ChartKind,
    pub title: Option<String>,
    pub title_centered: bool,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub x_field: String,
    pub y_field: String,
    pub x_label: String,
    pub y_label: String,
    /// X categories in display order (box and bar charts).
    pub categories: Vec<String>,
    pub show_legend: bool,
    pub facet: Option<FacetLayout>,
    pub traces: Vec<Trace>,
}

impl ChartSpec {
    /// Traces drawn in the given facet panel.
    pub fn traces_in_facet(&self, facet: Option<usize>) -> impl Iterator<Item = &Trace> {
        self.traces.iter().filter(move |t| t.facet() == facet)
    }

    /// Deterministic JSON rendering.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Static table figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSpec {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Fit of the trendline named `name` passing through `(x, y)`, if any.
pub fn trendline_at<'a>(traces: &'a [Trace], name: &str, x: f64, y: f64) -> Option<&'a OlsFit> {
    traces.iter().find_map(|trace| match trace {
        Trace::Trendline {
            name: n,
            fit,
            x_range: (lo, hi),
            ..
        } if n == name && x >= *lo && x <= *hi => {
            let tolerance = 1e-6 * y.abs().max(1.0);
            ((fit.predict(x) - y).abs() <= tolerance).then_some(fit)
        }
        _ => None,
    })
}

/// Look up a category color, falling back to [`DEFAULT_COLOR`].
pub fn mapped_color(map: &[(&str, &str)], category: &str) -> String {
    map.iter()
        .find(|(k, _)| *k == category)
        .map(|(_, c)| *c)
        .unwrap_or(DEFAULT_COLOR)
        .to_string()
}

/// Palette color for the n-th category, cycling.
pub fn palette_color(palette: &[&str], index: usize) -> String {
    palette[index % palette.len()].to_string()
}

/// Parse `#rrggbb` into RGB components.
pub fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colors() {
        assert_eq!(mapped_color(&SEX_COLORS, "male"), "#369b94");
        assert_eq!(mapped_color(&SEX_COLORS, "female"), "#dd7423");
        assert_eq!(mapped_color(&SEX_COLORS, "other"), DEFAULT_COLOR);
        assert_eq!(palette_color(&T10, 11), "#F58518");
        assert_eq!(parse_hex("#369b94"), Some((0x36, 0x9b, 0x94)));
        assert_eq!(parse_hex("369b94"), None);
    }

    #[test]
    fn test_trendline_lookup() {
        let fit = OlsFit {
            slope: 600.0,
            intercept: -1000.0,
            r_squared: 0.9,
            p_value: Some(0.01),
            n: 4,
        };
        let traces = vec![Trace::Trendline {
            name: "male".to_string(),
            color: "#369b94".to_string(),
            fit: fit.clone(),
            x_range: (50.0, 60.0),
        }];

        assert_eq!(trendline_at(&traces, "male", 50.0, 29000.0), Some(&fit));
        assert_eq!(trendline_at(&traces, "male", 60.0, 35000.0), Some(&fit));
        // Scatter point of the same group, off the line
        assert_eq!(trendline_at(&traces, "male", 55.0, 40000.0), None);
        assert_eq!(trendline_at(&traces, "female", 50.0, 29000.0), None);
        assert_eq!(trendline_at(&traces, "male", 70.0, 41000.0), None);
    }

    #[test]
    fn test_facet_layout() {
        let layout = FacetLayout {
            field: "sex".to_string(),
            values: vec!["female".to_string(), "male".to_string()],
            wrap: Some(3),
        };
        assert_eq!(layout.columns(), 2);
        assert_eq!(layout.title(1), "sex=male");
    }
}
