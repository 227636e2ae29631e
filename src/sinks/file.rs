//! File sink: one JSON object per line, append-only

use crate::core::{Fields, LogLevel, LoggerError, Record, Result, Sink};
use chrono::SecondsFormat;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Serialized shape of one line. Every line carries the same keys; `source`
/// is the only optional one.
#[derive(Serialize)]
struct FileLine<'a> {
    timestamp: String,
    level: LogLevel,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    fields: &'a Fields,
}

/// Appends records to an already existing or creatable file.
///
/// The file is opened in append mode at construction and never truncated.
/// No header or footer is written, so each line parses on its own.
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
    add_source: bool,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                LoggerError::io_operation(
                    "opening log file",
                    format!("cannot open '{}' for append", path.display()),
                    e,
                )
            })?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            add_source: true,
        })
    }

    /// Include the call-site location when the record carries one
    #[must_use]
    pub fn with_source(mut self, add_source: bool) -> Self {
        self.add_source = add_source;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(&self, record: &Record) -> Result<Vec<u8>> {
        let line = FileLine {
            timestamp: record
                .timestamp()
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
            level: record.level(),
            message: record.message(),
            source: if self.add_source {
                record.source().map(|s| s.to_string())
            } else {
                None
            },
            fields: record.fields(),
        };

        let mut buf = serde_json::to_vec(&line)?;
        buf.push(b'\n');
        Ok(buf)
    }
}

impl Sink for FileSink {
    fn write(&mut self, record: &Record) -> Result<()> {
        let line = self.encode(record)?;
        self.writer.write_all(&line).map_err(|e| {
            LoggerError::io_operation(
                "writing log file",
                format!("append to '{}' failed", self.path.display()),
                e,
            )
        })
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SourceLocation;
    use chrono::{TimeZone, Utc};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_file_sink_writes_json_lines() -> Result<()> {
        let dir = tempdir()?;
        let log_path = dir.path().join("app.log");

        let mut sink = FileSink::new(&log_path)?;
        let ts = Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap();
        let record = Record::at(
            LogLevel::Info,
            "catalog item created",
            Fields::new().with("item_id", 42).with("draft", false),
            ts,
        );

        sink.write(&record)?;
        sink.flush()?;

        let content = fs::read_to_string(&log_path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);

        let parsed: serde_json::Value = serde_json::from_str(lines[0])?;
        assert_eq!(parsed["level"], "INFO");
        assert_eq!(parsed["message"], "catalog item created");
        assert_eq!(parsed["timestamp"], "2025-01-08T10:30:45.000000000Z");
        assert_eq!(parsed["fields"]["item_id"], 42);
        assert_eq!(parsed["fields"]["draft"], false);
        assert!(parsed.get("source").is_none());
        Ok(())
    }

    #[test]
    fn test_file_sink_appends_never_truncates() -> Result<()> {
        let dir = tempdir()?;
        let log_path = dir.path().join("app.log");
        fs::write(&log_path, "{\"previous\":\"run\"}\n")?;

        {
            let mut sink = FileSink::new(&log_path)?;
            sink.write(&Record::new(LogLevel::Debug, "next run", Fields::new()))?;
        }

        let content = fs::read_to_string(&log_path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("previous"));
        assert!(lines[1].contains("next run"));
        Ok(())
    }

    #[test]
    fn test_file_sink_source_toggle() -> Result<()> {
        let dir = tempdir()?;
        let with_path = dir.path().join("with.log");
        let without_path = dir.path().join("without.log");

        let record = Record::new(LogLevel::Error, "boom", Fields::new())
            .with_source(Some(SourceLocation::new("src/handlers.rs", 88)));

        let mut with = FileSink::new(&with_path)?;
        with.write(&record)?;
        with.flush()?;
        let mut without = FileSink::new(&without_path)?.with_source(false);
        without.write(&record)?;
        without.flush()?;

        let with_line: serde_json::Value = serde_json::from_str(fs::read_to_string(&with_path)?.trim())?;
        let without_line: serde_json::Value =
            serde_json::from_str(fs::read_to_string(&without_path)?.trim())?;
        assert_eq!(with_line["source"], "src/handlers.rs:88");
        assert!(without_line.get("source").is_none());
        Ok(())
    }

    #[test]
    fn test_file_sink_open_failure_is_reported() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("no-such-dir").join("app.log");

        let err = FileSink::new(&missing).err().expect("open should fail");
        assert!(matches!(err, LoggerError::IoOperation { .. }));
        assert!(err.to_string().contains("opening log file"));
    }
}
