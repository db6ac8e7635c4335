use std::collections::BTreeMap;

use thiserror::Error;

use crate::data::model::ContactDataset;
use crate::data::schema::{series_key, DerivedSpec, FormatSpec};

/// Failure while evaluating a derived series.
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("series length mismatch: '{a}' has {a_len} samples, '{b}' has {b_len}")]
    LengthMismatch {
        a: String,
        a_len: usize,
        b: String,
        b_len: usize,
    },
    #[error("unknown series '{0}'")]
    UnknownSeries(String),
    #[error("evaluating '{label}'")]
    Derived {
        label: String,
        #[source]
        source: Box<MetricError>,
    },
}

/// `(a[k] - b[k] - offset) * scale`, element-wise.
pub fn scaled_difference(
    a: &[f64],
    b: &[f64],
    offset: f64,
    scale: f64,
) -> Result<Vec<f64>, MetricError> {
    check_lengths("a", a, "b", b)?;
    Ok(a.iter()
        .zip(b)
        .map(|(&a, &b)| (a - b - offset) * scale)
        .collect())
}

/// `(hypot(ax[k] - bx[k], ay[k] - by[k]) - offset) * scale`, element-wise.
pub fn scaled_separation(
    ax: &[f64],
    ay: &[f64],
    bx: &[f64],
    by: &[f64],
    offset: f64,
    scale: f64,
) -> Result<Vec<f64>, MetricError> {
    check_lengths("a.x", ax, "a.y", ay)?;
    check_lengths("b.x", bx, "b.y", by)?;
    check_lengths("a.x", ax, "b.x", bx)?;
    Ok(ax
        .iter()
        .zip(ay)
        .zip(bx.iter().zip(by))
        .map(|((&ax, &ay), (&bx, &by))| ((ax - bx).hypot(ay - by) - offset) * scale)
        .collect())
}

fn check_lengths(a: &str, av: &[f64], b: &str, bv: &[f64]) -> Result<(), MetricError> {
    if av.len() != bv.len() {
        return Err(MetricError::LengthMismatch {
            a: a.to_string(),
            a_len: av.len(),
            b: b.to_string(),
            b_len: bv.len(),
        });
    }
    Ok(())
}

pub(crate) fn wrap(label: &str, source: MetricError) -> MetricError {
    MetricError::Derived {
        label: label.to_string(),
        source: Box::new(source),
    }
}

pub(crate) fn lookup<'a>(
    series: &'a BTreeMap<String, Vec<f64>>,
    key: &str,
) -> Result<&'a Vec<f64>, MetricError> {
    series
        .get(key)
        .ok_or_else(|| MetricError::UnknownSeries(key.to_string()))
}

/// Evaluate every derived series of the format over a loaded dataset.
///
/// The returned map holds all raw series under `"<channel>.<field>"` keys and
/// every derived series under its bare label. Derived series are evaluated in
/// declaration order, so later ones can reference earlier ones.
pub fn evaluate_series(
    format: &FormatSpec,
    dataset: &ContactDataset,
) -> Result<BTreeMap<String, Vec<f64>>, MetricError> {
    let mut series: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for channel in &dataset.channels {
        for (field, values) in &channel.series {
            series.insert(series_key(&channel.label, field), values.clone());
        }
    }

    for spec in &format.derived {
        let values = match spec {
            DerivedSpec::ScaledDifference {
                label,
                a,
                b,
                offset,
                scale,
            } => {
                let a = lookup(&series, a).map_err(|e| wrap(label, e))?;
                let b = lookup(&series, b).map_err(|e| wrap(label, e))?;
                scaled_difference(a, b, *offset, *scale).map_err(|e| wrap(label, e))?
            }
            DerivedSpec::ScaledSeparation {
                label,
                a,
                b,
                offset,
                scale,
            } => {
                let ax = lookup(&series, &series_key(a, "x")).map_err(|e| wrap(label, e))?;
                let ay = lookup(&series, &series_key(a, "y")).map_err(|e| wrap(label, e))?;
                let bx = lookup(&series, &series_key(b, "x")).map_err(|e| wrap(label, e))?;
                let by = lookup(&series, &series_key(b, "y")).map_err(|e| wrap(label, e))?;
                scaled_separation(ax, ay, bx, by, *offset, *scale).map_err(|e| wrap(label, e))?
            }
        };
        series.insert(spec.label().to_string(), values);
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Channel;
    use crate::data::schema::{M_TO_MM, REST_SEPARATION_M};

    fn channel(label: &str, fields: &[(&str, &[f64])]) -> Channel {
        Channel {
            label: label.to_string(),
            series: fields
                .iter()
                .map(|(name, values)| (name.to_string(), values.to_vec()))
                .collect(),
        }
    }

    fn dataset(channels: Vec<Channel>) -> ContactDataset {
        let records = channels.iter().map(Channel::len).sum();
        ContactDataset {
            format: "test".to_string(),
            channels,
            records,
            dropped: 0,
        }
    }

    #[test]
    fn difference_applies_offset_then_scale() {
        let out = scaled_difference(&[3.0, 4.0], &[1.0, 1.0], 0.5, 10.0).unwrap();
        assert_eq!(out, vec![15.0, 25.0]);
    }

    #[test]
    fn difference_flips_sign_only_when_offset_is_zero() {
        let forward = scaled_difference(&[3.0, -2.0], &[1.0, 5.0], 0.0, 4.0).unwrap();
        let swapped = scaled_difference(&[1.0, 5.0], &[3.0, -2.0], 0.0, 4.0).unwrap();
        assert_eq!(forward, vec![8.0, -28.0]);
        assert_eq!(swapped, vec![-8.0, 28.0]);

        // A nonzero offset breaks the antisymmetry.
        let forward = scaled_difference(&[3.0], &[1.0], 0.5, 10.0).unwrap();
        let swapped = scaled_difference(&[1.0], &[3.0], 0.5, 10.0).unwrap();
        assert_eq!(forward, vec![15.0]);
        assert_eq!(swapped, vec![-25.0]);
        assert_ne!(swapped[0], -forward[0]);
    }

    #[test]
    fn difference_rejects_unequal_lengths() {
        let err = scaled_difference(&[1.0, 2.0], &[1.0], 0.0, 1.0).unwrap_err();
        assert!(matches!(
            err,
            MetricError::LengthMismatch {
                a_len: 2,
                b_len: 1,
                ..
            }
        ));
    }

    #[test]
    fn separation_is_plain_distance_with_identity_params() {
        // 3-4-5 triangle.
        let out = scaled_separation(&[3.0], &[4.0], &[0.0], &[0.0], 0.0, 1.0).unwrap();
        assert_eq!(out, vec![5.0]);
    }

    #[test]
    fn separation_at_rest_distance_is_zero() {
        let rest = REST_SEPARATION_M;
        let out = scaled_separation(&[rest], &[0.0], &[0.0], &[0.0], rest, M_TO_MM).unwrap();
        assert!(out[0].abs() < 1e-12);
    }

    #[test]
    fn separation_of_coincident_centres_is_negated_offset() {
        let out = scaled_separation(&[2.0], &[7.0], &[2.0], &[7.0], 0.25, 8.0).unwrap();
        assert_eq!(out, vec![-2.0]);
    }

    #[test]
    fn evaluation_seeds_raw_series_and_follows_order() {
        let spec = FormatSpec::four_sphere();
        let make = |base: f64| {
            channel(
                "",
                &[
                    ("x", &[base, base + 1.0][..]),
                    ("y", &[base * 2.0, base * 2.0 + 1.0][..]),
                ],
            )
        };
        let mut channels = Vec::new();
        for (i, label) in ["p1", "p2", "p3", "p4"].iter().enumerate() {
            let mut c = make(i as f64);
            c.label = label.to_string();
            channels.push(c);
        }
        let series = evaluate_series(&spec, &dataset(channels)).unwrap();

        assert!(series.contains_key("p1.x"));
        assert!(series.contains_key("left"));
        // "right - left" chains on the two earlier derived series.
        let right = &series["right"];
        let left = &series["left"];
        let chained = &series["right - left"];
        for k in 0..2 {
            assert!((chained[k] - (right[k] - left[k])).abs() < 1e-9);
        }
    }

    #[test]
    fn evaluation_reports_failing_label() {
        let spec = FormatSpec::three_sphere();
        // p3 shorter than the others: the first separation referencing it fails.
        let channels = vec![
            channel("p1", &[("x", &[0.0, 1.0][..]), ("y", &[0.0, 0.0][..])]),
            channel("p2", &[("x", &[5.0, 6.0][..]), ("y", &[0.0, 0.0][..])]),
            channel("p3", &[("x", &[2.5][..]), ("y", &[4.0][..])]),
        ];
        let err = evaluate_series(&spec, &dataset(channels)).unwrap_err();
        match err {
            MetricError::Derived { label, source } => {
                assert_eq!(label, "right");
                assert!(matches!(*source, MetricError::LengthMismatch { .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn three_sphere_overlaps_match_hand_computation() {
        let spec = FormatSpec::three_sphere();
        // Equilateral-ish triangle: base 6 µm wide, apex centred above.
        let channels = vec![
            channel("p1", &[("x", &[0.0][..]), ("y", &[0.0][..])]),
            channel("p2", &[("x", &[6.0e-6][..]), ("y", &[0.0][..])]),
            channel("p3", &[("x", &[3.0e-6][..]), ("y", &[4.0e-6][..])]),
        ];
        let series = evaluate_series(&spec, &dataset(channels)).unwrap();

        // bot = (p2.x - p1.x - 5 µm) * 1000 = 1 µm in mm units.
        assert!((series["bot"][0] - 1.0e-3).abs() < 1e-12);
        // right = (hypot(3 µm, 4 µm) - 5 µm) * 1000 = 0.
        assert!(series["right"][0].abs() < 1e-12);
        assert!(series["left"][0].abs() < 1e-12);
        assert!(series["right - left"][0].abs() < 1e-12);
    }
}
