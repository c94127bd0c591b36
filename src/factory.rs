//! Logger factory
//!
//! The factory owns the sinks, the level filter and the logger cache. It is
//! built once at startup and handed to every component that logs; clones
//! share the same state. `dispose` ends its life: sinks are flushed and
//! closed exactly once, cached loggers go silent, and `create_logger` fails
//! with a lifecycle error from then on. Dropping the last handle disposes
//! too.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::errors::{LoggingError, LoggingResult, SafeReadLock, SafeWriteLock};
use crate::filter::LevelFilter;
use crate::log_record::LogRecord;
use crate::log_sink::{FilteredSink, LogSink, SinkConfig};
use crate::logger::Logger;
use crate::severity::Severity;

/// Global minimum plus category-prefix overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryConfig {
    pub minimum_level: Severity,
    #[serde(default)]
    pub category_filters: BTreeMap<String, Severity>,
}

impl FactoryConfig {
    pub fn to_filter(&self) -> LoggingResult<LevelFilter> {
        LevelFilter::with_overrides(
            self.minimum_level,
            self.category_filters
                .iter()
                .map(|(prefix, level)| (prefix.clone(), *level)),
        )
    }
}

pub(crate) struct FactoryShared {
    filter: RwLock<LevelFilter>,
    sinks: RwLock<Vec<Arc<dyn LogSink>>>,
    loggers: RwLock<HashMap<String, Logger>>,
    disposed: AtomicBool,
    sink_failures: AtomicU64,
}

impl FactoryShared {
    pub(crate) fn dispatch(&self, record: &LogRecord) {
        let sinks = match self.sinks.safe_read() {
            Ok(sinks) => sinks,
            Err(e) => {
                tracing::error!(error = %e, "sink list unavailable, record dropped");
                return;
            }
        };
        for sink in sinks.iter() {
            self.isolate(sink.as_ref(), "consume", || sink.consume(record));
        }
    }

    /// Runs one sink operation, converting both errors and panics into a
    /// counted diagnostic.
    fn isolate<F>(&self, sink: &dyn LogSink, operation: &str, call: F)
    where
        F: FnOnce() -> LoggingResult<()>,
    {
        let failure = match panic::catch_unwind(AssertUnwindSafe(call)) {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(sink = sink.name(), operation, failure = %failure, "log sink failed");
    }

    fn flush_all(&self) {
        if let Ok(sinks) = self.sinks.safe_read() {
            for sink in sinks.iter() {
                self.isolate(sink.as_ref(), "flush", || sink.flush());
            }
        }
    }

    fn release(&self, sinks: Vec<Arc<dyn LogSink>>) {
        for sink in sinks {
            self.isolate(sink.as_ref(), "flush", || sink.flush());
            self.isolate(sink.as_ref(), "close", || sink.close());
        }
    }

    /// The disposed flag flips under the sink lock, so `configure` either
    /// lands before and has its sinks released here, or sees the flag.
    fn dispose(&self) {
        let sinks = match self.sinks.safe_write() {
            Ok(mut sinks) => {
                if self.disposed.swap(true, Ordering::AcqRel) {
                    return;
                }
                std::mem::take(&mut *sinks)
            }
            Err(e) => {
                if self.disposed.swap(true, Ordering::AcqRel) {
                    return;
                }
                tracing::error!(error = %e, "sink list unavailable during dispose");
                Vec::new()
            }
        };
        let released = sinks.len();
        self.release(sinks);

        if let Ok(mut loggers) = self.loggers.safe_write() {
            for logger in loggers.values() {
                logger.entry().set_minimum_level(Severity::None);
            }
            loggers.clear();
        }
        tracing::debug!(released, "logger factory disposed");
    }
}

impl Drop for FactoryShared {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        format!("panicked: {text}")
    } else if let Some(text) = payload.downcast_ref::<String>() {
        format!("panicked: {text}")
    } else {
        "panicked".to_string()
    }
}

#[derive(Clone)]
pub struct LoggerFactory {
    shared: Arc<FactoryShared>,
}

impl Default for LoggerFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LoggerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerFactory")
            .field("sinks", &self.sink_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl LoggerFactory {
    /// A factory with global defaults and no sinks.
    pub fn new() -> Self {
        Self::from_parts(LevelFilter::default(), Vec::new())
    }

    pub fn builder() -> LoggerFactoryBuilder {
        LoggerFactoryBuilder::default()
    }

    fn from_parts(filter: LevelFilter, sinks: Vec<Arc<dyn LogSink>>) -> Self {
        LoggerFactory {
            shared: Arc::new(FactoryShared {
                filter: RwLock::new(filter),
                sinks: RwLock::new(sinks),
                loggers: RwLock::new(HashMap::new()),
                disposed: AtomicBool::new(false),
                sink_failures: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the cached logger for `category`, creating it on first use.
    pub fn create_logger(&self, category: &str) -> LoggingResult<Logger> {
        self.ensure_live(category)?;
        if let Some(logger) = self.shared.loggers.safe_read()?.get(category) {
            return Ok(logger.clone());
        }

        let mut loggers = self.shared.loggers.safe_write()?;
        self.ensure_live(category)?;
        let minimum = self.shared.filter.safe_read()?.minimum_for(category);
        let logger = loggers
            .entry(category.to_string())
            .or_insert_with(|| Logger::new(category, minimum, Arc::downgrade(&self.shared)));
        Ok(logger.clone())
    }

    /// Logger whose category is the type name of `T`.
    pub fn create_logger_for<T: ?Sized>(&self) -> LoggingResult<Logger> {
        self.create_logger(std::any::type_name::<T>())
    }

    fn ensure_live(&self, category: &str) -> LoggingResult<()> {
        if self.is_disposed() {
            return Err(LoggingError::lifecycle(format!(
                "cannot create logger '{category}': factory has been disposed"
            )));
        }
        Ok(())
    }

    /// Replaces sinks and level configuration. Sinks that are not carried
    /// over are flushed and closed. Cached loggers pick up the new levels.
    pub fn configure(&self, sinks: Vec<Arc<dyn LogSink>>, config: FactoryConfig) -> LoggingResult<()> {
        if self.is_disposed() {
            return Err(LoggingError::lifecycle("cannot configure a disposed factory"));
        }
        let filter = config.to_filter()?;

        let replaced = {
            let mut current = self.shared.sinks.safe_write()?;
            if self.is_disposed() {
                return Err(LoggingError::lifecycle("cannot configure a disposed factory"));
            }
            let old = std::mem::replace(&mut *current, sinks);
            old.into_iter()
                .filter(|sink| !current.iter().any(|kept| same_sink(kept, sink)))
                .collect::<Vec<_>>()
        };
        self.shared.release(replaced);

        *self.shared.filter.safe_write()? = filter;
        {
            let loggers = self.shared.loggers.safe_read()?;
            let filter = self.shared.filter.safe_read()?;
            for logger in loggers.values() {
                logger
                    .entry()
                    .set_minimum_level(filter.minimum_for(logger.category()));
            }
        }
        tracing::debug!(minimum = %config.minimum_level, "logger factory reconfigured");
        Ok(())
    }

    /// Flushes every sink. Failures are isolated like in dispatch.
    pub fn flush(&self) {
        self.shared.flush_all();
    }

    /// Flushes and closes every sink once. Safe to call repeatedly.
    pub fn dispose(&self) {
        self.shared.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }

    /// Number of sink operations that failed and were isolated.
    pub fn sink_failures(&self) -> u64 {
        self.shared.sink_failures.load(Ordering::Relaxed)
    }

    /// Number of cached loggers.
    pub fn logger_count(&self) -> usize {
        self.shared.loggers.safe_read().map(|l| l.len()).unwrap_or(0)
    }

    pub fn sink_count(&self) -> usize {
        self.shared.sinks.safe_read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn minimum_level_for(&self, category: &str) -> Severity {
        self.shared
            .filter
            .safe_read()
            .map(|filter| filter.minimum_for(category))
            .unwrap_or(Severity::None)
    }
}

fn same_sink(a: &Arc<dyn LogSink>, b: &Arc<dyn LogSink>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Collects sinks and level rules before the factory exists. Configuration
/// errors are held until `build`.
#[derive(Default)]
pub struct LoggerFactoryBuilder {
    config: FactoryConfig,
    sinks: Vec<Arc<dyn LogSink>>,
    error: Option<LoggingError>,
}

impl LoggerFactoryBuilder {
    pub fn minimum_level(mut self, level: Severity) -> Self {
        self.config.minimum_level = level;
        self
    }

    pub fn add_filter(mut self, prefix: impl Into<String>, level: Severity) -> Self {
        self.config.category_filters.insert(prefix.into(), level);
        self
    }

    pub fn config(mut self, config: FactoryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn add_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Adds a sink that the caller keeps a handle to.
    pub fn add_shared_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Adds a sink wrapped in its own filter when `config` asks for one.
    pub fn register_sink(mut self, sink: impl LogSink + 'static, config: SinkConfig) -> Self {
        if config.is_passthrough() {
            return self.add_sink(sink);
        }
        match config.to_filter() {
            Ok(filter) => self.sinks.push(Arc::new(FilteredSink::new(sink, filter))),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    pub fn build(self) -> LoggingResult<LoggerFactory> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let filter = self.config.to_filter()?;
        Ok(LoggerFactory::from_parts(filter, self.sinks))
    }
}
