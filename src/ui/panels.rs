use std::path::PathBuf;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::schema::FormatSpec;
use crate::data::{export, loader};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – figure and trace selection
// ---------------------------------------------------------------------------

/// Render the left panel: figure selector plus per-trace visibility.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Figures");
    ui.separator();

    // Clone what we need so we can mutate state inside the loop.
    let titles: Vec<String> = match &state.analysis {
        Some(analysis) => analysis.figures.iter().map(|f| f.title.clone()).collect(),
        None => {
            ui.label("No contact log loaded.");
            return;
        }
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for (i, title) in titles.iter().enumerate() {
                if ui
                    .selectable_label(state.selected_figure == i, title)
                    .clicked()
                {
                    state.select_figure(i);
                }
            }

            ui.separator();
            ui.horizontal(|ui: &mut Ui| {
                ui.strong("Traces");
                if ui.small_button("All").clicked() {
                    state.show_all_traces();
                }
                if ui.small_button("None").clicked() {
                    state.hide_all_traces();
                }
            });

            let labels: Vec<String> = state
                .current_figure()
                .map(|f| f.traces.iter().map(|t| t.label.clone()).collect())
                .unwrap_or_default();

            for label in &labels {
                let mut shown = !state.is_trace_hidden(label);
                let text = RichText::new(label).color(state.color_map.color_for(label));
                if ui.checkbox(&mut shown, text).changed() {
                    state.toggle_trace(label);
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open contact log…").clicked() {
                open_data_dialog(state);
                ui.close_menu();
            }
            if ui.button("Load format preset…").clicked() {
                open_preset_dialog(state);
                ui.close_menu();
            }
            let exportable = state.current_figure().is_some();
            if ui
                .add_enabled(exportable, egui::Button::new("Export figure CSV…"))
                .clicked()
            {
                export_csv_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        ui.label("Format");
        let names: Vec<String> = state.formats.iter().map(|f| f.name.clone()).collect();
        egui::ComboBox::from_id_salt("format_preset")
            .selected_text(state.format().name.clone())
            .show_ui(ui, |ui: &mut Ui| {
                for (i, name) in names.iter().enumerate() {
                    if ui
                        .selectable_label(state.format_index == i, name)
                        .clicked()
                        && state.format_index != i
                    {
                        state.format_index = i;
                        reload_current(state);
                    }
                }
            });

        ui.separator();

        if let Some(analysis) = &state.analysis {
            // The loaded analysis keeps its own format name; the combo above
            // may already point elsewhere after a failed reload.
            ui.label(format!(
                "{}: {} records · {} channels · {} figures · {} dropped",
                analysis.dataset.format,
                analysis.dataset.records,
                analysis.dataset.channels.len(),
                analysis.figures.len(),
                analysis.dataset.dropped
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_data_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open contact log")
        .add_filter("Contact logs", &["txt", "dat", "log"])
        .add_filter("All files", &["*"])
        .pick_file();

    if let Some(path) = file {
        load_into_state(state, path);
    }
}

fn load_into_state(state: &mut AppState, path: PathBuf) {
    match loader::load_analysis(&path, state.format()) {
        Ok(analysis) => {
            log::info!(
                "Loaded {} records into {} channels from {} ({} dropped)",
                analysis.dataset.records,
                analysis.dataset.channels.len(),
                path.display(),
                analysis.dataset.dropped
            );
            state.set_analysis(analysis, path);
        }
        Err(e) => {
            log::error!("Failed to load {}: {e:#}", path.display());
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}

/// Re-run the load of the current file, e.g. after a format switch.
pub fn reload_current(state: &mut AppState) {
    if let Some(path) = state.data_path.clone() {
        load_into_state(state, path);
    }
}

pub fn open_preset_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Load format preset")
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        match FormatSpec::from_json_file(&path) {
            Ok(format) => {
                log::info!("Loaded format preset '{}' from {}", format.name, path.display());
                state.add_format(format);
                reload_current(state);
            }
            Err(e) => {
                log::error!("Failed to load preset {}: {e:#}", path.display());
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}

pub fn export_csv_dialog(state: &mut AppState) {
    let Some(figure) = state.current_figure() else {
        return;
    };
    let file = rfd::FileDialog::new()
        .set_title("Export figure CSV")
        .set_file_name(format!(
            "{}.csv",
            figure.title.to_lowercase().replace(' ', "_")
        ))
        .add_filter("CSV", &["csv"])
        .save_file();

    let Some(path) = file else {
        return;
    };
    let title = figure.title.clone();
    match export::write_figure_csv(figure, &path) {
        Ok(()) => {
            log::info!("Exported '{}' to {}", title, path.display());
            state.status_message = None;
        }
        Err(e) => {
            log::error!("Failed to export {}: {e:#}", path.display());
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
