//! Immutable log record

use super::fields::Fields;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use std::fmt;

/// Call-site location captured by the logging macros
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
}

impl SourceLocation {
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One log event.
///
/// The timestamp is taken when the record is created at the call site, so
/// sinks observe enqueue time rather than write time. Records have no
/// mutators; a worker consumes each one exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    level: LogLevel,
    message: String,
    timestamp: DateTime<Utc>,
    fields: Fields,
    source: Option<SourceLocation>,
}

impl Record {
    pub fn new(level: LogLevel, message: impl Into<String>, fields: Fields) -> Self {
        Self::at(level, message, fields, Utc::now())
    }

    /// Build a record with an explicit timestamp
    pub fn at(
        level: LogLevel,
        message: impl Into<String>,
        fields: Fields,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp,
            fields,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: Option<SourceLocation>) -> Self {
        self.source = source;
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> &DateTime<Utc> {
        &self.timestamp
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn source(&self) -> Option<SourceLocation> {
        self.source
    }
}
