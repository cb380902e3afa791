use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Concatenate per-worker CSV files into one, keeping each file's row
/// order and taking files in the order given (credential insertion
/// order). `dedup_key` drops rows whose value in that column was already
/// seen, keeping the first occurrence.
pub fn merge_csv(inputs: &[PathBuf], output: &Path, dedup_key: Option<usize>) -> Result<u64> {
    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("unable to open merged file {}", output.display()))?;

    let mut header_written = false;
    let mut seen: HashSet<String> = HashSet::new();
    let mut rows = 0u64;

    for input in inputs {
        let mut reader = csv::Reader::from_path(input)
            .with_context(|| format!("unable to read worker file {}", input.display()))?;
        if !header_written {
            writer.write_record(reader.headers()?)?;
            header_written = true;
        }
        for record in reader.records() {
            let record = record?;
            if let Some(key) = dedup_key {
                let value = record.get(key).unwrap_or("").to_string();
                if !seen.insert(value) {
                    continue;
                }
            }
            writer.write_record(&record)?;
            rows += 1;
        }
    }

    writer.flush()?;
    Ok(rows)
}

/// Concatenate per-worker JSONL files in worker order.
pub fn merge_jsonl(inputs: &[PathBuf], output: &Path) -> Result<u64> {
    let mut out = File::create(output)
        .with_context(|| format!("unable to open merged file {}", output.display()))?;

    let mut lines = 0u64;
    for input in inputs {
        let reader = BufReader::new(
            File::open(input)
                .with_context(|| format!("unable to read worker file {}", input.display()))?,
        );
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            writeln!(out, "{line}")?;
            lines += 1;
        }
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(path: &Path, contents: &str) {
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn merge_preserves_file_and_row_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        write_csv(&a, "main,v\nA,1\nB,2\n");
        write_csv(&b, "main,v\nC,3\n");

        let merged = dir.path().join("merged.csv");
        let rows = merge_csv(&[a, b], &merged, None).unwrap();
        assert_eq!(rows, 3);
        assert_eq!(
            std::fs::read_to_string(&merged).unwrap(),
            "main,v\nA,1\nB,2\nC,3\n"
        );
    }

    #[test]
    fn merge_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        write_csv(&a, "main,v\nA,1\nB,2\n");
        write_csv(&b, "main,v\nB,9\nC,3\n");

        let first = dir.path().join("m1.csv");
        let second = dir.path().join("m2.csv");
        merge_csv(&[a.clone(), b.clone()], &first, Some(0)).unwrap();
        merge_csv(&[a, b], &second, Some(0)).unwrap();
        assert_eq!(
            std::fs::read_to_string(&first).unwrap(),
            std::fs::read_to_string(&second).unwrap()
        );
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        write_csv(&a, "id,v\nX,first\n");
        write_csv(&b, "id,v\nX,second\nY,only\n");

        let merged = dir.path().join("merged.csv");
        let rows = merge_csv(&[a, b], &merged, Some(0)).unwrap();
        assert_eq!(rows, 2);
        assert_eq!(
            std::fs::read_to_string(&merged).unwrap(),
            "id,v\nX,first\nY,only\n"
        );
    }

    #[test]
    fn zero_inputs_yield_an_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let merged = dir.path().join("merged.csv");
        let rows = merge_csv(&[], &merged, None).unwrap();
        assert_eq!(rows, 0);
        assert_eq!(std::fs::read_to_string(&merged).unwrap(), "");
    }

    #[test]
    fn merge_jsonl_concatenates_lines() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jsonl");
        let b = dir.path().join("b.jsonl");
        std::fs::write(&a, "{\"id\":\"a\"}\n").unwrap();
        std::fs::write(&b, "{\"id\":\"b\"}\n{\"id\":\"c\"}\n").unwrap();

        let merged = dir.path().join("merged.jsonl");
        let lines = merge_jsonl(&[a, b], &merged).unwrap();
        assert_eq!(lines, 3);
        assert_eq!(
            std::fs::read_to_string(&merged).unwrap(),
            "{\"id\":\"a\"}\n{\"id\":\"b\"}\n{\"id\":\"c\"}\n"
        );
    }
}
