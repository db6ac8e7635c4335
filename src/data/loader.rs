use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::data::model::{Analysis, Channel, ContactDataset};
use crate::data::schema::{FormatSpec, Routing};
use crate::data::{figures, metrics};

/// Failure while reading a contact log.
///
/// Lines and columns in messages are 1-based and 0-based respectively: lines
/// follow the text file, columns follow the format's column indices.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("reading line {line}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: record has {found} columns, need at least {expected}")]
    MissingColumns {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}, column {column}: '{token}' is not a number")]
    NonNumeric {
        line: usize,
        column: usize,
        token: String,
    },
    #[error("line {line}, column {column}: '{token}' is not an integer tag")]
    BadTag {
        line: usize,
        column: usize,
        token: String,
    },
    #[error("trailing partial group: {remainder} record(s) after the last complete set of {channels}")]
    TruncatedGroup { channels: usize, remainder: usize },
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a contact log from a file and route its records per `format`.
pub fn load_file(path: &Path, format: &FormatSpec) -> Result<ContactDataset, LoadError> {
    let file = File::open(path)?;
    load_records(BufReader::new(file), format)
}

/// Load a contact log, evaluate the format's derived series and assemble its
/// figures.
pub fn load_analysis(path: &Path, format: &FormatSpec) -> Result<Analysis> {
    let dataset =
        load_file(path, format).with_context(|| format!("loading {}", path.display()))?;
    let series = metrics::evaluate_series(format, &dataset)
        .with_context(|| format!("deriving series for format '{}'", format.name))?;
    let figures = figures::build_figures(format, &series).context("assembling figures")?;
    Ok(Analysis { dataset, figures })
}

/// Parse whitespace-separated records from a reader and de-interleave them
/// into the format's channels.
///
/// The format must have passed [`FormatSpec::validate`]. Every line is a
/// record; the first malformed one (blank lines included) aborts the load.
/// Under round-robin routing the file must end on a complete channel group;
/// under tag routing records whose tag key matches no channel are dropped
/// and counted.
pub fn load_records<R: BufRead>(
    reader: R,
    format: &FormatSpec,
) -> Result<ContactDataset, LoadError> {
    let required = format.required_columns();
    let tag_width = format.tag_width();

    // One value buffer per channel and field; channels are assembled only
    // after the whole file has parsed.
    let mut buffers: Vec<Vec<Vec<f64>>> =
        vec![vec![Vec::new(); format.fields.len()]; format.channels.len()];
    let mut routed = 0usize;
    let mut records = 0usize;
    let mut dropped = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|source| LoadError::Read {
            line: line_no,
            source,
        })?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < required {
            return Err(LoadError::MissingColumns {
                line: line_no,
                expected: required,
                found: tokens.len(),
            });
        }

        let channel = match &format.routing {
            Routing::RoundRobin => {
                let c = routed % format.channels.len();
                routed += 1;
                Some(c)
            }
            Routing::TagMatch { .. } => {
                let mut key = Vec::with_capacity(tag_width);
                for (column, token) in tokens[..tag_width].iter().enumerate() {
                    let tag = token.parse::<i64>().map_err(|_| LoadError::BadTag {
                        line: line_no,
                        column,
                        token: token.to_string(),
                    })?;
                    key.push(tag);
                }
                format
                    .channels
                    .iter()
                    .position(|c| c.tags.as_deref() == Some(key.as_slice()))
            }
        };

        // Parse every field before any buffer is touched so a bad token
        // cannot leave a channel half-updated.
        let mut values = Vec::with_capacity(format.fields.len());
        for field in &format.fields {
            let token = tokens[field.column];
            let value = token.parse::<f64>().map_err(|_| LoadError::NonNumeric {
                line: line_no,
                column: field.column,
                token: token.to_string(),
            })?;
            values.push(value * field.scale);
        }

        match channel {
            Some(c) => {
                records += 1;
                for (f, value) in values.into_iter().enumerate() {
                    buffers[c][f].push(value);
                }
            }
            None => dropped += 1,
        }
    }

    if matches!(format.routing, Routing::RoundRobin) {
        let remainder = routed % format.channels.len();
        if remainder != 0 {
            return Err(LoadError::TruncatedGroup {
                channels: format.channels.len(),
                remainder,
            });
        }
    }

    let channels = format
        .channels
        .iter()
        .zip(buffers)
        .map(|(spec, fields)| Channel {
            label: spec.label.clone(),
            series: format
                .fields
                .iter()
                .map(|f| f.name.clone())
                .zip(fields)
                .collect(),
        })
        .collect();

    Ok(ContactDataset {
        format: format.name.clone(),
        channels,
        records,
        dropped,
    })
}
