use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

/// Append-only CSV writer for one worker's output file. Each logical
/// record batch is flushed as soon as it is written so a crashed worker
/// loses at most the in-flight target.
pub struct CsvWriter {
    writer: csv::Writer<File>,
}

impl CsvWriter {
    pub fn create(path: impl Into<PathBuf>, header: &[String]) -> Result<Self> {
        let path = path.into();
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("unable to open output file {}", path.display()))?;
        writer.write_record(header)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    pub fn write_rows(&mut self, rows: &[Vec<String>]) -> Result<()> {
        for row in rows {
            self.writer.write_record(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Append-only newline-delimited JSON writer, flushed per line.
pub struct JsonlWriter {
    writer: BufWriter<File>,
}

impl JsonlWriter {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path)
            .with_context(|| format!("unable to open output file {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn write_line<T: Serialize>(&mut self, value: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, value)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_are_flushed_per_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let header = vec!["main".to_string(), "value".to_string()];
        let mut writer = CsvWriter::create(&path, &header).unwrap();
        writer
            .write_rows(&[vec!["a".to_string(), "1".to_string()]])
            .unwrap();

        // Readable before the writer is dropped
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "main,value\na,1\n");

        writer
            .write_rows(&[vec!["b".to_string(), "2".to_string()]])
            .unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "main,value\na,1\nb,2\n");
    }

    #[test]
    fn jsonl_lines_are_self_contained() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let mut writer = JsonlWriter::create(&path).unwrap();
        writer.write_line(&serde_json::json!({"id": "a"})).unwrap();
        writer.write_line(&serde_json::json!({"id": "b"})).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["id"], "a");
    }
}
