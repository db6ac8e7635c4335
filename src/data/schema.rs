use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Physical constants shared by the built-in presets
// ---------------------------------------------------------------------------

/// Rest separation of bonded sphere centres [m], one sphere diameter.
pub const REST_SEPARATION_M: f64 = 5.0e-6;
/// Gap/overlap display conversion: metres → millimetres.
pub const M_TO_MM: f64 = 1.0e3;
/// Force display conversion: newtons → millinewtons.
const N_TO_MN: f64 = 1.0e3;
/// Displacement display conversion: metres → micrometres.
const M_TO_UM: f64 = 1.0e6;

/// Flat key addressing a raw channel series, `"<channel>.<field>"`.
pub fn series_key(channel: &str, field: &str) -> String {
    format!("{channel}.{field}")
}

// ---------------------------------------------------------------------------
// Schema types
// ---------------------------------------------------------------------------

/// How records of a file map onto channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Routing {
    /// Record `i` goes to channel `i mod N`; the file must carry complete
    /// repeating groups of all N channels.
    RoundRobin,
    /// The leading `width` integer columns are matched against each
    /// channel's tag key; unmatched records are dropped.
    TagMatch { width: usize },
}

/// One channel of a format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub label: String,
    /// Tag key for [`Routing::TagMatch`]; exactly `width` values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<i64>>,
}

/// One numeric field extracted from every matching record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// Zero-based column in the source record.
    pub column: usize,
    /// Multiplier applied at ingest (unit conversion).
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

/// A derived series computed from the schema's raw or earlier derived series.
///
/// Operands are series keys: `"<channel>.<field>"` for raw series, the bare
/// label for a derived series defined earlier in the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivedSpec {
    /// `(a[k] - b[k] - offset) * scale`.
    ScaledDifference {
        label: String,
        a: String,
        b: String,
        #[serde(default)]
        offset: f64,
        #[serde(default = "default_scale")]
        scale: f64,
    },
    /// `(hypot(a.x[k] - b.x[k], a.y[k] - b.y[k]) - offset) * scale` between
    /// two channels that both declare `x` and `y` fields.
    ScaledSeparation {
        label: String,
        a: String,
        b: String,
        #[serde(default)]
        offset: f64,
        #[serde(default = "default_scale")]
        scale: f64,
    },
}

impl DerivedSpec {
    /// The key under which this series is registered.
    pub fn label(&self) -> &str {
        match self {
            DerivedSpec::ScaledDifference { label, .. } => label,
            DerivedSpec::ScaledSeparation { label, .. } => label,
        }
    }
}

/// One trace of a figure: a labelled series key, optionally paired with a
/// second key for the x axis (otherwise plotted against the record index).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSpec {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    pub y: String,
}

/// One figure: a titled trace group with optional axis labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureSpec {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_label: Option<String>,
    pub traces: Vec<TraceSpec>,
}

/// The complete declarative description of one file format: routing, field
/// positions, derived series, and figure groupings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatSpec {
    pub name: String,
    pub routing: Routing,
    pub channels: Vec<ChannelSpec>,
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub derived: Vec<DerivedSpec>,
    #[serde(default)]
    pub figures: Vec<FigureSpec>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Structural problems of a format preset, caught before any data is read.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("format '{0}' declares no channels")]
    NoChannels(String),
    #[error("format '{0}' declares no fields")]
    NoFields(String),
    #[error("empty {0} name")]
    EmptyName(&'static str),
    #[error("{what} name '{name}' must not contain '.'")]
    DottedName { what: &'static str, name: String },
    #[error("duplicate {what} '{name}'")]
    Duplicate { what: &'static str, name: String },
    #[error("tag routing needs a key width of at least 1")]
    ZeroTagWidth,
    #[error("channel '{channel}' needs {expected} tag values, found {found}")]
    TagWidth {
        channel: String,
        expected: usize,
        found: usize,
    },
    #[error("channel '{0}' carries tags but routing is round-robin")]
    UnexpectedTags(String),
    #[error("duplicate tag key on channel '{0}'")]
    DuplicateTagKey(String),
    #[error("'{referrer}' references unknown series '{name}'")]
    UnknownSeries { referrer: String, name: String },
    #[error("'{referrer}' references unknown channel '{name}'")]
    UnknownChannel { referrer: String, name: String },
}

fn check_name(name: &str, what: &'static str) -> Result<(), SchemaError> {
    if name.is_empty() {
        return Err(SchemaError::EmptyName(what));
    }
    if name.contains('.') {
        return Err(SchemaError::DottedName {
            what,
            name: name.to_string(),
        });
    }
    Ok(())
}

impl FormatSpec {
    /// Validate the preset's structure: unique undotted names, tag keys that
    /// fit the routing, and resolvable derived/figure references.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.channels.is_empty() {
            return Err(SchemaError::NoChannels(self.name.clone()));
        }
        if self.fields.is_empty() {
            return Err(SchemaError::NoFields(self.name.clone()));
        }

        let mut channel_labels = BTreeSet::new();
        for channel in &self.channels {
            check_name(&channel.label, "channel")?;
            if !channel_labels.insert(channel.label.as_str()) {
                return Err(SchemaError::Duplicate {
                    what: "channel",
                    name: channel.label.clone(),
                });
            }
        }

        let mut field_names = BTreeSet::new();
        for field in &self.fields {
            check_name(&field.name, "field")?;
            if !field_names.insert(field.name.as_str()) {
                return Err(SchemaError::Duplicate {
                    what: "field",
                    name: field.name.clone(),
                });
            }
        }

        match self.routing {
            Routing::RoundRobin => {
                for channel in &self.channels {
                    if channel.tags.is_some() {
                        return Err(SchemaError::UnexpectedTags(channel.label.clone()));
                    }
                }
            }
            Routing::TagMatch { width } => {
                if width == 0 {
                    return Err(SchemaError::ZeroTagWidth);
                }
                let mut keys = BTreeSet::new();
                for channel in &self.channels {
                    let found = channel.tags.as_ref().map_or(0, |t| t.len());
                    if found != width {
                        return Err(SchemaError::TagWidth {
                            channel: channel.label.clone(),
                            expected: width,
                            found,
                        });
                    }
                    if !keys.insert(channel.tags.clone()) {
                        return Err(SchemaError::DuplicateTagKey(channel.label.clone()));
                    }
                }
            }
        }

        // Series keys resolvable so far: every channel.field, then derived
        // labels in declaration order (a derived series may only reference
        // earlier ones).
        let mut keys: BTreeSet<String> = BTreeSet::new();
        for channel in &self.channels {
            for field in &self.fields {
                keys.insert(series_key(&channel.label, &field.name));
            }
        }

        for spec in &self.derived {
            check_name(spec.label(), "derived series")?;
            match spec {
                DerivedSpec::ScaledDifference { label, a, b, .. } => {
                    for name in [a, b] {
                        if !keys.contains(name.as_str()) {
                            return Err(SchemaError::UnknownSeries {
                                referrer: label.clone(),
                                name: name.clone(),
                            });
                        }
                    }
                }
                DerivedSpec::ScaledSeparation { label, a, b, .. } => {
                    for name in [a, b] {
                        if !channel_labels.contains(name.as_str()) {
                            return Err(SchemaError::UnknownChannel {
                                referrer: label.clone(),
                                name: name.clone(),
                            });
                        }
                        for coord in ["x", "y"] {
                            let key = series_key(name, coord);
                            if !keys.contains(&key) {
                                return Err(SchemaError::UnknownSeries {
                                    referrer: label.clone(),
                                    name: key,
                                });
                            }
                        }
                    }
                }
            }
            if !keys.insert(spec.label().to_string()) {
                return Err(SchemaError::Duplicate {
                    what: "derived series",
                    name: spec.label().to_string(),
                });
            }
        }

        for figure in &self.figures {
            let mut labels = BTreeSet::new();
            for trace in &figure.traces {
                if !labels.insert(trace.label.as_str()) {
                    return Err(SchemaError::Duplicate {
                        what: "figure trace",
                        name: trace.label.clone(),
                    });
                }
                for key in trace.x.iter().chain(std::iter::once(&trace.y)) {
                    if !keys.contains(key.as_str()) {
                        return Err(SchemaError::UnknownSeries {
                            referrer: trace.label.clone(),
                            name: key.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Highest source column the format reads, plus one: the minimum record
    /// width the tokenizer must see.
    pub fn required_columns(&self) -> usize {
        let fields = self.fields.iter().map(|f| f.column + 1).max().unwrap_or(0);
        fields.max(self.tag_width())
    }

    /// Width of the leading tag key, 0 for round-robin routing.
    pub fn tag_width(&self) -> usize {
        match self.routing {
            Routing::RoundRobin => 0,
            Routing::TagMatch { width } => width,
        }
    }

    /// Load and validate a custom preset from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading preset {}", path.display()))?;
        let spec: FormatSpec = serde_json::from_str(&text).context("parsing preset JSON")?;
        spec.validate()?;
        Ok(spec)
    }
}

// ---------------------------------------------------------------------------
// Built-in presets for the simulator's four log layouts
// ---------------------------------------------------------------------------

fn chan(label: &str) -> ChannelSpec {
    ChannelSpec {
        label: label.to_string(),
        tags: None,
    }
}

fn tag_chan(label: &str, tags: &[i64]) -> ChannelSpec {
    ChannelSpec {
        label: label.to_string(),
        tags: Some(tags.to_vec()),
    }
}

fn field(name: &str, column: usize) -> FieldSpec {
    scaled_field(name, column, 1.0)
}

fn scaled_field(name: &str, column: usize, scale: f64) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        column,
        scale,
    }
}

/// Linear gap between two position series, offset by the rest separation and
/// expressed in millimetres.
fn gap(label: &str, a: &str, b: &str) -> DerivedSpec {
    DerivedSpec::ScaledDifference {
        label: label.to_string(),
        a: a.to_string(),
        b: b.to_string(),
        offset: REST_SEPARATION_M,
        scale: M_TO_MM,
    }
}

/// Centre-to-centre overlap between two sphere channels, offset by the rest
/// separation and expressed in millimetres.
fn overlap(label: &str, a: &str, b: &str) -> DerivedSpec {
    DerivedSpec::ScaledSeparation {
        label: label.to_string(),
        a: a.to_string(),
        b: b.to_string(),
        offset: REST_SEPARATION_M,
        scale: M_TO_MM,
    }
}

/// Plain difference of two already-scaled series.
fn diff(label: &str, a: &str, b: &str) -> DerivedSpec {
    DerivedSpec::ScaledDifference {
        label: label.to_string(),
        a: a.to_string(),
        b: b.to_string(),
        offset: 0.0,
        scale: 1.0,
    }
}

fn idx_trace(label: &str, y: &str) -> TraceSpec {
    TraceSpec {
        label: label.to_string(),
        x: None,
        y: y.to_string(),
    }
}

fn xy_trace(label: &str, x: &str, y: &str) -> TraceSpec {
    TraceSpec {
        label: label.to_string(),
        x: Some(x.to_string()),
        y: y.to_string(),
    }
}

impl FormatSpec {
    /// All built-in presets, in menu order.
    pub fn builtin() -> Vec<FormatSpec> {
        vec![
            FormatSpec::four_sphere(),
            FormatSpec::three_sphere(),
            FormatSpec::three_bond(),
            FormatSpec::force_log(),
        ]
    }

    /// Four spheres in a square packing, interleaved round-robin; gaps along
    /// each side of the square.
    pub fn four_sphere() -> FormatSpec {
        FormatSpec {
            name: "four-sphere".to_string(),
            routing: Routing::RoundRobin,
            channels: vec![chan("p1"), chan("p2"), chan("p3"), chan("p4")],
            fields: vec![field("x", 0), field("y", 1)],
            derived: vec![
                gap("left", "p2.y", "p1.y"),
                gap("right", "p3.y", "p4.y"),
                gap("top", "p3.x", "p2.x"),
                gap("bottom", "p4.x", "p1.x"),
                diff("right - left", "right", "left"),
                diff("bottom - top", "bottom", "top"),
            ],
            figures: vec![
                FigureSpec {
                    title: "Positions and gaps".to_string(),
                    x_label: Some("frame".to_string()),
                    y_label: None,
                    traces: vec![
                        idx_trace("p1 y", "p1.y"),
                        idx_trace("p2 y", "p2.y"),
                        idx_trace("p3 y", "p3.y"),
                        idx_trace("p4 y", "p4.y"),
                        idx_trace("left", "left"),
                        idx_trace("right", "right"),
                        idx_trace("top", "top"),
                        idx_trace("bottom", "bottom"),
                    ],
                },
                FigureSpec {
                    title: "Left and top gaps".to_string(),
                    x_label: Some("frame".to_string()),
                    y_label: None,
                    traces: vec![
                        idx_trace("p1 y", "p1.y"),
                        idx_trace("p2 y", "p2.y"),
                        idx_trace("left", "left"),
                        idx_trace("top", "top"),
                    ],
                },
                FigureSpec {
                    title: "Right and bottom gaps".to_string(),
                    x_label: Some("frame".to_string()),
                    y_label: None,
                    traces: vec![
                        idx_trace("p3 y", "p3.y"),
                        idx_trace("p4 y", "p4.y"),
                        idx_trace("right", "right"),
                        idx_trace("bottom", "bottom"),
                    ],
                },
                FigureSpec {
                    title: "Gap asymmetry".to_string(),
                    x_label: Some("frame".to_string()),
                    y_label: Some("gap difference [mm]".to_string()),
                    traces: vec![
                        idx_trace("right - left", "right - left"),
                        idx_trace("bottom - top", "bottom - top"),
                    ],
                },
            ],
        }
    }

    /// Three spheres in a triangle packing: a linear gap along the base and
    /// Euclidean overlaps along the two slanted bonds.
    pub fn three_sphere() -> FormatSpec {
        FormatSpec {
            name: "three-sphere".to_string(),
            routing: Routing::RoundRobin,
            channels: vec![chan("p1"), chan("p2"), chan("p3")],
            fields: vec![field("x", 0), field("y", 1)],
            derived: vec![
                gap("bot", "p2.x", "p1.x"),
                overlap("right", "p3", "p1"),
                overlap("left", "p2", "p3"),
                diff("right - left", "right", "left"),
            ],
            figures: vec![
                FigureSpec {
                    title: "Positions and bond overlaps".to_string(),
                    x_label: Some("frame".to_string()),
                    y_label: None,
                    traces: vec![
                        idx_trace("p1 y", "p1.y"),
                        idx_trace("p2 y", "p2.y"),
                        idx_trace("p3 y", "p3.y"),
                        idx_trace("left", "left"),
                        idx_trace("right", "right"),
                        idx_trace("bot", "bot"),
                    ],
                },
                FigureSpec {
                    title: "Overlap asymmetry".to_string(),
                    x_label: Some("frame".to_string()),
                    y_label: Some("overlap difference [mm]".to_string()),
                    traces: vec![idx_trace("right - left", "right - left")],
                },
            ],
        }
    }

    /// Bond stress log: records tagged with the sphere index pair of each
    /// bond, carrying the normal (sigma) and tangential (tau) bond stress.
    pub fn three_bond() -> FormatSpec {
        FormatSpec {
            name: "three-bond".to_string(),
            routing: Routing::TagMatch { width: 2 },
            channels: vec![
                tag_chan("bot", &[0, 1]),
                tag_chan("right", &[1, 2]),
                tag_chan("left", &[0, 2]),
            ],
            fields: vec![field("sigma", 2), field("tau", 3)],
            derived: Vec::new(),
            figures: vec![FigureSpec {
                title: "Bond stresses".to_string(),
                x_label: Some("frame".to_string()),
                y_label: None,
                traces: vec![
                    idx_trace("bot sigma", "bot.sigma"),
                    idx_trace("bot tau", "bot.tau"),
                    idx_trace("right sigma", "right.sigma"),
                    idx_trace("right tau", "right.tau"),
                    idx_trace("left sigma", "left.sigma"),
                    idx_trace("left tau", "left.tau"),
                ],
            }],
        }
    }

    /// Contact force log, one record per step, tagged 0 (loading) or
    /// 1 (unloading). Forces are converted to millinewtons and the
    /// tangential displacement to micrometres at ingest.
    pub fn force_log() -> FormatSpec {
        FormatSpec {
            name: "force-log".to_string(),
            routing: Routing::TagMatch { width: 1 },
            channels: vec![tag_chan("loading", &[0]), tag_chan("unloading", &[1])],
            fields: vec![
                field("displacement", 1),
                scaled_field("normal_force", 2, N_TO_MN),
                scaled_field("tangential_displacement", 3, M_TO_UM),
                scaled_field("tangential_force", 5, N_TO_MN),
            ],
            derived: Vec::new(),
            figures: vec![
                FigureSpec {
                    title: "Normal force vs displacement".to_string(),
                    x_label: Some("displacement [m]".to_string()),
                    y_label: Some("normal force [mN]".to_string()),
                    traces: vec![
                        xy_trace("loading", "loading.displacement", "loading.normal_force"),
                        xy_trace(
                            "unloading",
                            "unloading.displacement",
                            "unloading.normal_force",
                        ),
                    ],
                },
                FigureSpec {
                    title: "Tangential vs normal force".to_string(),
                    x_label: Some("normal force [mN]".to_string()),
                    y_label: Some("tangential force [mN]".to_string()),
                    traces: vec![
                        xy_trace("loading", "loading.normal_force", "loading.tangential_force"),
                        xy_trace(
                            "unloading",
                            "unloading.normal_force",
                            "unloading.tangential_force",
                        ),
                    ],
                },
                FigureSpec {
                    title: "Tangential force vs displacement".to_string(),
                    x_label: Some("tangential displacement [µm]".to_string()),
                    y_label: Some("tangential force [mN]".to_string()),
                    traces: vec![
                        xy_trace(
                            "loading",
                            "loading.tangential_displacement",
                            "loading.tangential_force",
                        ),
                        xy_trace(
                            "unloading",
                            "unloading.tangential_displacement",
                            "unloading.tangential_force",
                        ),
                    ],
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_presets_validate() {
        for spec in FormatSpec::builtin() {
            spec.validate()
                .unwrap_or_else(|e| panic!("preset '{}' invalid: {e}", spec.name));
        }
    }

    #[test]
    fn four_sphere_preset_shape() {
        let spec = FormatSpec::four_sphere();
        assert_eq!(spec.routing, Routing::RoundRobin);
        assert_eq!(spec.channels.len(), 4);
        assert_eq!(spec.required_columns(), 2);
        assert_eq!(spec.figures.len(), 4);
        // Gap convention: 5 µm rest separation, millimetre output.
        match &spec.derived[0] {
            DerivedSpec::ScaledDifference { offset, scale, .. } => {
                assert_eq!(*offset, 5.0e-6);
                assert_eq!(*scale, 1000.0);
            }
            other => panic!("unexpected derived spec {other:?}"),
        }
    }

    #[test]
    fn force_log_preset_scales_and_tags() {
        let spec = FormatSpec::force_log();
        assert_eq!(spec.tag_width(), 1);
        assert_eq!(spec.channels[0].tags.as_deref(), Some(&[0][..]));
        assert_eq!(spec.required_columns(), 6);
        let force = spec.fields.iter().find(|f| f.name == "normal_force").unwrap();
        assert_eq!(force.scale, 1000.0);
        let slip = spec
            .fields
            .iter()
            .find(|f| f.name == "tangential_displacement")
            .unwrap();
        assert_eq!(slip.scale, 1.0e6);
    }

    #[test]
    fn custom_preset_parses_from_json() {
        let text = r#"{
            "name": "two-sphere",
            "routing": { "mode": "round_robin" },
            "channels": [{ "label": "p1" }, { "label": "p2" }],
            "fields": [
                { "name": "x", "column": 0 },
                { "name": "y", "column": 1 }
            ],
            "derived": [
                {
                    "kind": "scaled_difference",
                    "label": "gap",
                    "a": "p2.y",
                    "b": "p1.y",
                    "offset": 5e-6,
                    "scale": 1000.0
                },
                { "kind": "scaled_separation", "label": "sep", "a": "p1", "b": "p2" }
            ],
            "figures": [
                { "title": "Gap", "traces": [{ "label": "gap", "y": "gap" }] }
            ]
        }"#;
        let spec: FormatSpec = serde_json::from_str(text).unwrap();
        spec.validate().unwrap();
        assert_eq!(spec.name, "two-sphere");
        // Omitted offset/scale fall back to 0 and 1.
        match &spec.derived[1] {
            DerivedSpec::ScaledSeparation { offset, scale, .. } => {
                assert_eq!(*offset, 0.0);
                assert_eq!(*scale, 1.0);
            }
            other => panic!("unexpected derived spec {other:?}"),
        }
    }

    #[test]
    fn validation_rejects_short_tag_key() {
        let mut spec = FormatSpec::three_bond();
        spec.channels[0].tags = Some(vec![0]);
        assert_eq!(
            spec.validate(),
            Err(SchemaError::TagWidth {
                channel: "bot".to_string(),
                expected: 2,
                found: 1,
            })
        );
    }

    #[test]
    fn validation_rejects_unknown_trace_series() {
        let mut spec = FormatSpec::four_sphere();
        spec.figures[0].traces.push(idx_trace("ghost", "p9.y"));
        assert_eq!(
            spec.validate(),
            Err(SchemaError::UnknownSeries {
                referrer: "ghost".to_string(),
                name: "p9.y".to_string(),
            })
        );
    }

    #[test]
    fn validation_rejects_forward_derived_reference() {
        let mut spec = FormatSpec::four_sphere();
        // "right - left" is declared after "left" and "right"; reversing the
        // order must fail.
        spec.derived.swap(0, 4);
        assert!(matches!(
            spec.validate(),
            Err(SchemaError::UnknownSeries { .. })
        ));
    }

    #[test]
    fn validation_rejects_tags_under_round_robin() {
        let mut spec = FormatSpec::three_sphere();
        spec.channels[1].tags = Some(vec![7]);
        assert_eq!(
            spec.validate(),
            Err(SchemaError::UnexpectedTags("p2".to_string()))
        );
    }
}
