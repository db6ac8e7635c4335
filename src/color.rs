use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::Figure;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: trace label → Color32
// ---------------------------------------------------------------------------

/// Maps the trace labels of one figure to distinct colours.
///
/// Colours are assigned in trace order, so a trace keeps its colour while
/// others are hidden or shown.
#[derive(Debug, Clone)]
pub struct ColorMap {
    pub figure: String,
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl Default for ColorMap {
    fn default() -> Self {
        ColorMap {
            figure: String::new(),
            mapping: BTreeMap::new(),
            default_color: Color32::GRAY,
        }
    }
}

impl ColorMap {
    /// Build a colour map over the figure's traces.
    pub fn new(figure: &Figure) -> Self {
        let palette = generate_palette(figure.traces.len());
        let mapping: BTreeMap<String, Color32> = figure
            .traces
            .iter()
            .zip(palette)
            .map(|(t, c)| (t.label.clone(), c))
            .collect();

        ColorMap {
            figure: figure.title.clone(),
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a trace label.
    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Trace;

    fn figure(labels: &[&str]) -> Figure {
        Figure {
            title: "t".to_string(),
            x_label: None,
            y_label: None,
            traces: labels
                .iter()
                .map(|l| Trace {
                    label: l.to_string(),
                    x: None,
                    y: Vec::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn palette_size_matches_request() {
        assert!(generate_palette(0).is_empty());
        assert_eq!(generate_palette(6).len(), 6);
    }

    #[test]
    fn traces_get_distinct_colors() {
        let map = ColorMap::new(&figure(&["left", "right", "top"]));
        let left = map.color_for("left");
        let right = map.color_for("right");
        assert_ne!(left, right);
        // Unknown labels fall back to the default.
        assert_eq!(map.color_for("ghost"), Color32::GRAY);
    }
}
