//! Console sink for development mode

use crate::core::{FieldValue, Fields, LogLevel, Record, Result, Sink};
use colored::Colorize;
use std::io::{self, Write};

const TIME_FORMAT: &str = "%H:%M:%S%.3f";

/// Renders one colorized, human-readable line per record.
///
/// Layout: `HH:MM:SS.mmm LEVEL [file:line] message key=value ...`.
/// This path shares nothing with the file encoding.
pub struct ConsoleSink {
    out: Box<dyn Write + Send>,
    use_colors: bool,
    add_source: bool,
}

impl ConsoleSink {
    /// Console sink writing to standard output
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Box::new(out),
            use_colors: true,
            add_source: true,
        }
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    #[must_use]
    pub fn with_source(mut self, add_source: bool) -> Self {
        self.add_source = add_source;
        self
    }

    /// Render a record without the trailing newline
    pub fn format_line(&self, record: &Record) -> String {
        let time = record.timestamp().format(TIME_FORMAT).to_string();
        let level = format!("{:<5}", record.level().to_str());
        let message = sanitize_message(record.message());

        let source = match (self.add_source, record.source()) {
            (true, Some(location)) => format!(" {}", location),
            _ => String::new(),
        };

        let fields = if record.fields().is_empty() {
            String::new()
        } else {
            format!(" {}", render_fields(record.fields()))
        };

        if self.use_colors {
            let level = match record.level() {
                LogLevel::Error => level.color(record.level().color_code()).bold(),
                other => level.color(other.color_code()),
            };
            format!(
                "{} {}{} {}{}",
                time.cyan(),
                level,
                source,
                message,
                fields.bright_black()
            )
        } else {
            format!("{} {}{} {}{}", time, level, source, message, fields)
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn write(&mut self, record: &Record) -> Result<()> {
        let line = self.format_line(record);
        writeln!(self.out, "{}", line)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

/// Escape line breaks and tabs so a record always occupies one terminal line
fn sanitize_message(message: &str) -> String {
    message
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// `key=value` pairs in insertion order, escaped like the message
fn render_fields(fields: &Fields) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}={}", sanitize_message(key), render_value(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(text) => sanitize_message(text),
        FieldValue::Nested(fields) => format!("{{{}}}", render_fields(fields)),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Fields, SourceLocation};
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn record(level: LogLevel, message: &str) -> Record {
        let ts = Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap()
            + chrono::Duration::microseconds(123_456);
        Record::at(level, message, Fields::new(), ts)
    }

    #[test]
    fn test_plain_layout() {
        let sink = ConsoleSink::with_writer(io::sink()).with_colors(false);
        let rec = Record::at(
            LogLevel::Info,
            "listening",
            Fields::new().with("port", 8080).with("tls", false),
            *record(LogLevel::Info, "").timestamp(),
        );

        assert_eq!(sink.format_line(&rec), "10:30:45.123 INFO  listening port=8080 tls=false");
    }

    #[test]
    fn test_source_rendered_after_level() {
        let sink = ConsoleSink::with_writer(io::sink()).with_colors(false);
        let rec = record(LogLevel::Debug, "query")
            .with_source(Some(SourceLocation::new("src/repo.rs", 17)));

        assert_eq!(sink.format_line(&rec), "10:30:45.123 DEBUG src/repo.rs:17 query");

        let no_source = ConsoleSink::with_writer(io::sink())
            .with_colors(false)
            .with_source(false);
        assert_eq!(no_source.format_line(&rec), "10:30:45.123 DEBUG query");
    }

    #[test]
    fn test_message_newlines_escaped() {
        let sink = ConsoleSink::with_writer(io::sink()).with_colors(false);
        let line = sink.format_line(&record(LogLevel::Warn, "a\nERROR forged"));

        assert!(!line.contains('\n'));
        assert!(line.contains("a\\nERROR forged"));
    }

    #[test]
    fn test_field_values_escaped() {
        let sink = ConsoleSink::with_writer(io::sink()).with_colors(false);
        let rec = Record::at(
            LogLevel::Info,
            "login",
            Fields::new()
                .with("user", "bob\n10:00:00.000 ERROR forged")
                .with("ctx", Fields::new().with("note", "a\tb\r\nc")),
            *record(LogLevel::Info, "").timestamp(),
        );

        let line = sink.format_line(&rec);
        assert!(!line.contains('\n') && !line.contains('\r') && !line.contains('\t'));
        assert_eq!(
            line,
            "10:30:45.123 INFO  login user=bob\\n10:00:00.000 ERROR forged ctx={note=a\\tb\\r\\nc}"
        );
    }

    #[test]
    fn test_colored_levels_differ() {
        colored::control::set_override(true);
        let sink = ConsoleSink::with_writer(io::sink());

        let warn = sink.format_line(&record(LogLevel::Warn, "same"));
        let info = sink.format_line(&record(LogLevel::Info, "same"));

        assert!(warn.contains("\u{1b}[33m"), "warn line: {:?}", warn);
        assert!(info.contains("\u{1b}[32m"), "info line: {:?}", info);
        assert_ne!(warn, info);
    }

    #[test]
    fn test_write_appends_newline() -> Result<()> {
        let buffer = SharedBuffer::default();
        let mut sink = ConsoleSink::with_writer(buffer.clone()).with_colors(false);

        sink.write(&record(LogLevel::Error, "first"))?;
        sink.write(&record(LogLevel::Error, "second"))?;
        sink.flush()?;

        let output = String::from_utf8(buffer.0.lock().clone()).unwrap();
        assert_eq!(output.lines().count(), 2);
        assert!(output.ends_with("second\n"));
        Ok(())
    }
}
