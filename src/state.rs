use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::color::ColorMap;
use crate::data::model::{Analysis, Figure};
use crate::data::schema::FormatSpec;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded analysis (None until the user opens a contact log).
    pub analysis: Option<Analysis>,

    /// Known format presets: the built-ins plus any loaded from JSON.
    pub formats: Vec<FormatSpec>,

    /// Index of the active preset in `formats`.
    pub format_index: usize,

    /// Index of the figure shown in the central panel.
    pub selected_figure: usize,

    /// Trace labels hidden by the user, per figure index.
    pub hidden_traces: BTreeMap<usize, BTreeSet<String>>,

    /// Colour assignment for the current figure's traces.
    pub color_map: ColorMap,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Path of the currently loaded contact log, kept for reloads.
    pub data_path: Option<PathBuf>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            analysis: None,
            formats: FormatSpec::builtin(),
            format_index: 0,
            selected_figure: 0,
            hidden_traces: BTreeMap::new(),
            color_map: ColorMap::default(),
            status_message: None,
            data_path: None,
        }
    }
}

impl AppState {
    /// The active format preset.
    pub fn format(&self) -> &FormatSpec {
        &self.formats[self.format_index]
    }

    /// Ingest a freshly loaded analysis, resetting per-figure UI state.
    pub fn set_analysis(&mut self, analysis: Analysis, path: PathBuf) {
        self.selected_figure = 0;
        self.hidden_traces.clear();
        self.analysis = Some(analysis);
        self.data_path = Some(path);
        self.status_message = None;
        self.rebuild_color_map();
    }

    /// Register a user-supplied preset and make it active.
    pub fn add_format(&mut self, format: FormatSpec) {
        self.formats.push(format);
        self.format_index = self.formats.len() - 1;
    }

    /// Switch the central panel to another figure.
    pub fn select_figure(&mut self, index: usize) {
        self.selected_figure = index;
        self.rebuild_color_map();
    }

    /// Rebuild the colour map for the currently selected figure.
    pub fn rebuild_color_map(&mut self) {
        self.color_map = self.current_figure().map(ColorMap::new).unwrap_or_default();
    }

    /// The figure shown in the central panel, if any.
    pub fn current_figure(&self) -> Option<&Figure> {
        self.analysis
            .as_ref()
            .and_then(|a| a.figures.get(self.selected_figure))
    }

    pub fn is_trace_hidden(&self, label: &str) -> bool {
        self.hidden_traces
            .get(&self.selected_figure)
            .map_or(false, |hidden| hidden.contains(label))
    }

    /// Toggle one trace of the current figure.
    pub fn toggle_trace(&mut self, label: &str) {
        let hidden = self.hidden_traces.entry(self.selected_figure).or_default();
        if !hidden.remove(label) {
            hidden.insert(label.to_string());
        }
    }

    pub fn show_all_traces(&mut self) {
        self.hidden_traces.remove(&self.selected_figure);
    }

    pub fn hide_all_traces(&mut self) {
        let labels: BTreeSet<String> = self
            .current_figure()
            .map(|f| f.traces.iter().map(|t| t.label.clone()).collect())
            .unwrap_or_default();
        self.hidden_traces.insert(self.selected_figure, labels);
    }
}
