use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Read target IDs from a newline-delimited file, or from one column of a
/// CSV file when `csv_column` is set. IDs are deduplicated preserving
/// first-seen order.
pub fn read_targets(path: &Path, csv_column: Option<&str>) -> Result<Vec<String>> {
    let raw = match csv_column {
        None => read_lines(path)?,
        Some(column) => read_csv_column(path, column)?,
    };

    let mut seen = HashSet::new();
    Ok(raw
        .into_iter()
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.clone()))
        .collect())
}

/// Apply resume bounds to the target list. `end_idx` of -1 means the end
/// of the input; the debug flag restricts the run to the single target at
/// `start_idx`.
pub fn apply_bounds(mut targets: Vec<String>, start_idx: usize, end_idx: i64, debug: bool) -> Vec<String> {
    let end = if debug {
        start_idx.saturating_add(1)
    } else if end_idx < 0 {
        targets.len()
    } else {
        end_idx as usize
    };
    let end = end.min(targets.len());
    let start = start_idx.min(end);
    targets.truncate(end);
    targets.drain(..start);
    targets
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file =
        File::open(path).with_context(|| format!("unable to read input file {}", path.display()))?;
    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        out.push(line?.trim().to_string());
    }
    Ok(out)
}

fn read_csv_column(path: &Path, column: &str) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("unable to read input file {}", path.display()))?;
    let Some(idx) = reader.headers()?.iter().position(|h| h == column) else {
        bail!("column {column} not found in {}", path.display());
    };

    let mut out = Vec::new();
    for record in reader.records() {
        let record = record?;
        out.push(record.get(idx).unwrap_or("").trim().to_string());
    }
    Ok(out)
}
