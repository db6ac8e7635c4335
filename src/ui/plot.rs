use eframe::egui::Ui;
use egui_plot::{Line, Plot, PlotPoints};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Figure plot (central panel)
// ---------------------------------------------------------------------------

/// Render the selected figure in the central panel.
pub fn figure_plot(ui: &mut Ui, state: &AppState) {
    let Some(figure) = state.current_figure() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a contact log to view figures  (File → Open…)");
        });
        return;
    };

    // Id includes the title so zoom/pan memory is per figure.
    Plot::new(("figure_plot", figure.title.as_str()))
        .legend(egui_plot::Legend::default())
        .x_axis_label(figure.x_label.as_deref().unwrap_or("frame"))
        .y_axis_label(figure.y_label.as_deref().unwrap_or(""))
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for trace in &figure.traces {
                if trace.is_empty() || state.is_trace_hidden(&trace.label) {
                    continue;
                }

                // Paired traces plot y against their x series, index traces
                // against the record number.
                let points: PlotPoints = match &trace.x {
                    Some(x) => x
                        .iter()
                        .zip(trace.y.iter())
                        .map(|(&xi, &yi)| [xi, yi])
                        .collect(),
                    None => trace
                        .y
                        .iter()
                        .enumerate()
                        .map(|(i, &yi)| [i as f64, yi])
                        .collect(),
                };

                let line = Line::new(points)
                    .name(&trace.label)
                    .color(state.color_map.color_for(&trace.label))
                    .width(1.5);

                plot_ui.line(line);
            }
        });
}
