use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Channel – one tracked entity
// ---------------------------------------------------------------------------

/// One tracked entity: a sphere, a bonded pair, or a loading phase.
///
/// A channel owns one ordered series per schema field. Every record routed to
/// the channel appends one value to every series, so all series of a channel
/// share the same length by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Channel label from the format preset (e.g. "p2", "loading").
    pub label: String,
    /// Field name → values, in file order.
    pub series: BTreeMap<String, Vec<f64>>,
}

impl Channel {
    /// Values of one field series, if the field is declared.
    pub fn field(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    /// Number of records routed to this channel.
    pub fn len(&self) -> usize {
        self.series.values().next().map_or(0, |v| v.len())
    }

    /// Whether no record has been routed here yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// ContactDataset – one fully de-interleaved contact log
// ---------------------------------------------------------------------------

/// The de-interleaved content of one contact log.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactDataset {
    /// Name of the format preset that produced this dataset.
    pub format: String,
    /// Channels in preset order.
    pub channels: Vec<Channel>,
    /// Records routed into a channel.
    pub records: usize,
    /// Records whose tag key matched no channel (tag routing only).
    pub dropped: usize,
}

impl ContactDataset {
    /// Look up a channel by its preset label.
    pub fn channel(&self, label: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.label == label)
    }
}

// ---------------------------------------------------------------------------
// Figure / Trace – display-ready series
// ---------------------------------------------------------------------------

/// A labelled series ready for the display sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub label: String,
    /// Paired x values; `None` plots `y` against the record index.
    pub x: Option<Vec<f64>>,
    pub y: Vec<f64>,
}

impl Trace {
    /// Number of points in the trace.
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// Whether the trace carries no points.
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// A titled group of traces rendered as one plot.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub traces: Vec<Trace>,
}

/// Everything the UI needs after a successful load.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub dataset: ContactDataset,
    pub figures: Vec<Figure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_len_follows_its_series() {
        let mut series = BTreeMap::new();
        series.insert("x".to_string(), vec![1.0, 2.0]);
        series.insert("y".to_string(), vec![3.0, 4.0]);
        let channel = Channel {
            label: "p1".to_string(),
            series,
        };
        assert_eq!(channel.len(), 2);
        assert!(!channel.is_empty());
        assert_eq!(channel.field("y"), Some(&[3.0, 4.0][..]));
        assert_eq!(channel.field("z"), None);
    }

    #[test]
    fn dataset_channel_lookup_by_label() {
        let dataset = ContactDataset {
            format: "three-bond".to_string(),
            channels: vec![
                Channel {
                    label: "bot".to_string(),
                    series: BTreeMap::new(),
                },
                Channel {
                    label: "left".to_string(),
                    series: BTreeMap::new(),
                },
            ],
            records: 0,
            dropped: 0,
        };
        assert_eq!(dataset.channel("left").map(|c| c.label.as_str()), Some("left"));
        assert!(dataset.channel("right").is_none());
    }
}
