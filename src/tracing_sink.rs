// tracing_sink.rs
// Forwards records into whatever `tracing` subscriber the process runs.

use crate::errors::LoggingResult;
use crate::log_record::LogRecord;
use crate::log_sink::LogSink;
use crate::severity::Severity;

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        TracingSink
    }
}

impl LogSink for TracingSink {
    fn consume(&self, record: &LogRecord) -> LoggingResult<()> {
        let scopes = record.scope_messages().join(" => ");
        let event_id = record.event_id.id;
        let category = record.category.as_str();
        let message = record.message.as_str();

        // tracing levels are compile-time constants, one arm per level
        match record.severity {
            Severity::Trace => {
                tracing::trace!(category, event_id, scopes, "{message}")
            }
            Severity::Debug => {
                tracing::debug!(category, event_id, scopes, "{message}")
            }
            Severity::Information => {
                tracing::info!(category, event_id, scopes, "{message}")
            }
            Severity::Warning => {
                tracing::warn!(category, event_id, scopes, "{message}")
            }
            Severity::Error | Severity::Critical => {
                let critical = record.severity == Severity::Critical;
                tracing::error!(category, event_id, scopes, critical, "{message}")
            }
            Severity::None => {}
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}
