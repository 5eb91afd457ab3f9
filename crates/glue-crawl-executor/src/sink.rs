//! File-backed record sink.

use glue_crawl::{Record, RecordSink, SinkError};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Serialize)]
struct Line<'a> {
    parser: &'a str,
    at: chrono::DateTime<chrono::Utc>,
    record: &'a Record,
}

/// Appends one JSON object per record to a file.
#[derive(Debug)]
pub struct JsonlSink {
    name: String,
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlSink {
    /// Open (or create) `path` for appending.
    pub fn open(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            name: name.into(),
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for JsonlSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn accept(&self, parser: &str, record: &Record) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&Line {
            parser,
            at: chrono::Utc::now(),
            record,
        })?;
        line.push(b'\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| SinkError::Closed(format!("sink '{}' poisoned", self.name)))?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/records.jsonl");
        let sink = JsonlSink::open("jsonl", &path).unwrap();

        let record = json!({"repository": "xxl-job"}).as_object().cloned().unwrap();
        sink.accept("TestPageParser", &record).unwrap();
        sink.accept("TestPageParser", &record).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["parser"], "TestPageParser");
        assert_eq!(lines[1]["record"]["repository"], "xxl-job");
    }
}
