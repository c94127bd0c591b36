// console_sink.rs
// Line-oriented console provider used by the demo binary.

use std::io::{self, Write};
use std::sync::Mutex;

use crate::errors::{LoggingError, LoggingResult, SafeLock};
use crate::log_record::LogRecord;
use crate::log_sink::LogSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleTarget {
    Stdout,
    Stderr,
}

/// Writes one line per record. Output is serialized through a mutex so
/// concurrent records never interleave.
pub struct ConsoleSink {
    writer: Mutex<Box<dyn Write + Send>>,
    json: bool,
    timestamps: bool,
}

impl ConsoleSink {
    pub fn new(target: ConsoleTarget) -> Self {
        let writer: Box<dyn Write + Send> = match target {
            ConsoleTarget::Stdout => Box::new(io::stdout()),
            ConsoleTarget::Stderr => Box::new(io::stderr()),
        };
        Self::with_writer(writer)
    }

    pub fn stdout() -> Self {
        Self::new(ConsoleTarget::Stdout)
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        ConsoleSink {
            writer: Mutex::new(writer),
            json: false,
            timestamps: true,
        }
    }

    /// Emit each record as a JSON object instead of a text line.
    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    fn render(&self, record: &LogRecord) -> LoggingResult<String> {
        if self.json {
            serde_json::to_string(record)
                .map_err(|e| LoggingError::serialization("console record", e))
        } else {
            Ok(format_line(record, self.timestamps))
        }
    }
}

/// `timestamp [LEVEL] category[event] => scope => scope message`, followed
/// by an indented error line when the record carries one.
pub fn format_line(record: &LogRecord, timestamps: bool) -> String {
    let mut line = String::new();
    if timestamps {
        line.push_str(&record.timestamp.to_rfc3339());
        line.push(' ');
    }
    line.push_str(&format!(
        "[{}] {}[{}]",
        record.severity.label(),
        record.category,
        record.event_id
    ));
    for scope in &record.scopes {
        line.push_str(" => ");
        line.push_str(&scope.message);
    }
    line.push(' ');
    line.push_str(&record.message);
    if let Some(error) = &record.error {
        line.push_str("\n    error: ");
        line.push_str(error);
    }
    line
}

impl LogSink for ConsoleSink {
    fn consume(&self, record: &LogRecord) -> LoggingResult<()> {
        let line = self.render(record)?;
        let mut writer = self.writer.safe_lock()?;
        writeln!(writer, "{line}").map_err(|e| LoggingError::io("console write", e))
    }

    fn flush(&self) -> LoggingResult<()> {
        self.writer
            .safe_lock()?
            .flush()
            .map_err(|e| LoggingError::io("console flush", e))
    }

    fn close(&self) -> LoggingResult<()> {
        self.flush()
    }

    fn name(&self) -> &str {
        "console"
    }
}
