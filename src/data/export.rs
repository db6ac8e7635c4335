use std::path::Path;

use anyhow::{Context, Result};

use crate::data::model::{Figure, Trace};

/// Write a figure's traces to a CSV file.
///
/// The first column is the record index. Index traces contribute one column
/// named after the trace; paired traces contribute an extra `"<label> x"`
/// column before it. Traces shorter than the longest one are padded with
/// empty fields.
pub fn write_figure_csv(figure: &Figure, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec!["frame".to_string()];
    for trace in &figure.traces {
        if trace.x.is_some() {
            header.push(format!("{} x", trace.label));
        }
        header.push(trace.label.clone());
    }
    writer.write_record(&header).context("writing CSV header")?;

    let rows = figure.traces.iter().map(Trace::len).max().unwrap_or(0);
    for row in 0..rows {
        let mut record = vec![row.to_string()];
        for trace in &figure.traces {
            if let Some(x) = &trace.x {
                record.push(x.get(row).map_or_else(String::new, f64::to_string));
            }
            record.push(trace.y.get(row).map_or_else(String::new, f64::to_string));
        }
        writer.write_record(&record).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}
