// log_sink.rs
// Pluggable consumers of finished log records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::errors::{LoggingResult, SafeLock};
use crate::filter::LevelFilter;
use crate::log_record::LogRecord;
use crate::severity::Severity;

/// A consumer of log records. `consume` may be called from many threads at
/// once, so implementations serialize internally where they need to.
pub trait LogSink: Send + Sync {
    fn consume(&self, record: &LogRecord) -> LoggingResult<()>;

    fn flush(&self) -> LoggingResult<()> {
        Ok(())
    }

    /// Called once when the owning factory is disposed.
    fn close(&self) -> LoggingResult<()> {
        Ok(())
    }

    /// Name used in diagnostics when this sink fails.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn consume(&self, record: &LogRecord) -> LoggingResult<()> {
        (**self).consume(record)
    }

    fn flush(&self) -> LoggingResult<()> {
        (**self).flush()
    }

    fn close(&self) -> LoggingResult<()> {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Per-sink filtering options accepted by `register_sink`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinkConfig {
    pub minimum_level: Option<Severity>,
    #[serde(default)]
    pub category_filters: BTreeMap<String, Severity>,
}

impl SinkConfig {
    pub fn with_minimum_level(level: Severity) -> Self {
        SinkConfig {
            minimum_level: Some(level),
            category_filters: BTreeMap::new(),
        }
    }

    pub fn filter(mut self, prefix: impl Into<String>, level: Severity) -> Self {
        self.category_filters.insert(prefix.into(), level);
        self
    }

    /// True when the config adds nothing over the factory's own filter.
    pub fn is_passthrough(&self) -> bool {
        self.minimum_level.is_none() && self.category_filters.is_empty()
    }

    pub fn to_filter(&self) -> LoggingResult<LevelFilter> {
        LevelFilter::with_overrides(
            self.minimum_level.unwrap_or(Severity::Trace),
            self.category_filters
                .iter()
                .map(|(prefix, level)| (prefix.clone(), *level)),
        )
    }
}

/// Re-checks each record against its own filter before passing it on.
pub struct FilteredSink<S> {
    inner: S,
    filter: LevelFilter,
}

impl<S: LogSink> FilteredSink<S> {
    pub fn new(inner: S, filter: LevelFilter) -> Self {
        FilteredSink { inner, filter }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: LogSink> LogSink for FilteredSink<S> {
    fn consume(&self, record: &LogRecord) -> LoggingResult<()> {
        if self.filter.is_enabled(&record.category, record.severity) {
            self.inner.consume(record)
        } else {
            Ok(())
        }
    }

    fn flush(&self) -> LoggingResult<()> {
        self.inner.flush()
    }

    fn close(&self) -> LoggingResult<()> {
        self.inner.close()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Keeps a copy of every record it receives.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
    flushes: AtomicUsize,
    closes: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .safe_lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.message).collect()
    }

    pub fn len(&self) -> usize {
        self.records.safe_lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.safe_lock() {
            records.clear();
        }
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl LogSink for MemorySink {
    fn consume(&self, record: &LogRecord) -> LoggingResult<()> {
        self.records.safe_lock()?.push(record.clone());
        Ok(())
    }

    fn flush(&self) -> LoggingResult<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> LoggingResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_record::EventId;

    fn record(category: &str, severity: Severity) -> LogRecord {
        LogRecord::new(category, severity, EventId::default(), "msg".into())
    }

    #[test]
    fn memory_sink_keeps_copies() {
        let sink = MemorySink::new();
        sink.consume(&record("a", Severity::Debug)).unwrap();
        sink.consume(&record("b", Severity::Error)).unwrap();
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.records()[1].category, "b");
        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn filtered_sink_rechecks_severity() {
        let config = SinkConfig::with_minimum_level(Severity::Warning).filter("db", Severity::Trace);
        let sink = FilteredSink::new(MemorySink::new(), config.to_filter().unwrap());

        sink.consume(&record("http", Severity::Information)).unwrap();
        sink.consume(&record("http", Severity::Error)).unwrap();
        sink.consume(&record("db::query", Severity::Trace)).unwrap();

        let categories: Vec<String> = sink.inner().records().into_iter().map(|r| r.category).collect();
        assert_eq!(categories, vec!["http", "db::query"]);
    }

    #[test]
    fn filtered_sink_forwards_lifecycle_calls() {
        let sink = FilteredSink::new(MemorySink::new(), LevelFilter::default());
        sink.flush().unwrap();
        sink.close().unwrap();
        assert_eq!(sink.inner().flush_count(), 1);
        assert_eq!(sink.inner().close_count(), 1);
        assert_eq!(sink.name(), "memory");
    }

    #[test]
    fn passthrough_config_is_detected() {
        assert!(SinkConfig::default().is_passthrough());
        assert!(!SinkConfig::with_minimum_level(Severity::Trace).is_passthrough());
        let bad = SinkConfig::default().filter(" ", Severity::Trace);
        assert!(bad.to_filter().unwrap_err().is_config());
    }
}
