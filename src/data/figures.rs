use std::collections::BTreeMap;

use crate::data::metrics::{lookup, wrap, MetricError};
use crate::data::model::{Figure, Trace};
use crate::data::schema::FormatSpec;

/// Materialize the format's figures from an evaluated series map.
///
/// Each trace pulls its y series (and x series, when paired) by key; a paired
/// trace with differing x and y lengths is an error, never silently clipped.
pub fn build_figures(
    format: &FormatSpec,
    series: &BTreeMap<String, Vec<f64>>,
) -> Result<Vec<Figure>, MetricError> {
    let mut figures = Vec::with_capacity(format.figures.len());
    for spec in &format.figures {
        let mut traces = Vec::with_capacity(spec.traces.len());
        for trace in &spec.traces {
            let y = lookup(series, &trace.y)
                .map_err(|e| wrap(&trace.label, e))?
                .clone();
            let x = match &trace.x {
                Some(key) => {
                    let x = lookup(series, key).map_err(|e| wrap(&trace.label, e))?;
                    if x.len() != y.len() {
                        return Err(wrap(
                            &trace.label,
                            MetricError::LengthMismatch {
                                a: key.clone(),
                                a_len: x.len(),
                                b: trace.y.clone(),
                                b_len: y.len(),
                            },
                        ));
                    }
                    Some(x.clone())
                }
                None => None,
            };
            traces.push(Trace {
                label: trace.label.clone(),
                x,
                y,
            });
        }
        figures.push(Figure {
            title: spec.title.clone(),
            x_label: spec.x_label.clone(),
            y_label: spec.y_label.clone(),
            traces,
        });
    }
    Ok(figures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{FigureSpec, Routing, TraceSpec};

    fn format_with(figures: Vec<FigureSpec>) -> FormatSpec {
        FormatSpec {
            name: "test".to_string(),
            routing: Routing::RoundRobin,
            channels: Vec::new(),
            fields: Vec::new(),
            derived: Vec::new(),
            figures,
        }
    }

    fn series(entries: &[(&str, &[f64])]) -> BTreeMap<String, Vec<f64>> {
        entries
            .iter()
            .map(|(key, values)| (key.to_string(), values.to_vec()))
            .collect()
    }

    fn trace(label: &str, x: Option<&str>, y: &str) -> TraceSpec {
        TraceSpec {
            label: label.to_string(),
            x: x.map(str::to_string),
            y: y.to_string(),
        }
    }

    #[test]
    fn index_trace_resolves_without_x() {
        let format = format_with(vec![FigureSpec {
            title: "Gaps".to_string(),
            x_label: None,
            y_label: None,
            traces: vec![trace("gap", None, "gap")],
        }]);
        let figures =
            build_figures(&format, &series(&[("gap", &[1.0, 2.0][..])])).unwrap();

        assert_eq!(figures.len(), 1);
        assert_eq!(figures[0].traces[0].x, None);
        assert_eq!(figures[0].traces[0].y, vec![1.0, 2.0]);
    }

    #[test]
    fn paired_trace_carries_both_series() {
        let format = format_with(vec![FigureSpec {
            title: "Force".to_string(),
            x_label: Some("d".to_string()),
            y_label: Some("F".to_string()),
            traces: vec![trace("loading", Some("d"), "f")],
        }]);
        let figures = build_figures(
            &format,
            &series(&[("d", &[0.0, 1.0][..]), ("f", &[0.0, 5.0][..])]),
        )
        .unwrap();

        let t = &figures[0].traces[0];
        assert_eq!(t.x.as_deref(), Some(&[0.0, 1.0][..]));
        assert_eq!(t.y, vec![0.0, 5.0]);
    }

    #[test]
    fn mismatched_pair_is_an_error() {
        let format = format_with(vec![FigureSpec {
            title: "Force".to_string(),
            x_label: None,
            y_label: None,
            traces: vec![trace("loading", Some("d"), "f")],
        }]);
        let err = build_figures(
            &format,
            &series(&[("d", &[0.0][..]), ("f", &[0.0, 5.0][..])]),
        )
        .unwrap_err();

        match err {
            MetricError::Derived { label, source } => {
                assert_eq!(label, "loading");
                assert!(matches!(*source, MetricError::LengthMismatch { .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unknown_series_names_the_trace() {
        let format = format_with(vec![FigureSpec {
            title: "Gaps".to_string(),
            x_label: None,
            y_label: None,
            traces: vec![trace("gap", None, "missing")],
        }]);
        let err = build_figures(&format, &series(&[])).unwrap_err();
        assert!(matches!(err, MetricError::Derived { label, .. } if label == "gap"));
    }
}
