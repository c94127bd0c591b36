//! Category-bound logger
//!
//! A [`Logger`] is a cheap handle onto an entry in its factory's cache. The
//! effective minimum severity for the category is stored in that entry, so
//! checking whether a record would be emitted is a single atomic load. The
//! message is rendered only after that check passes.

use std::error::Error;
use std::panic::Location;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use crate::factory::FactoryShared;
use crate::filter;
use crate::formatter;
use crate::log_record::{describe_error, EventId, LogArg, LogRecord};
use crate::scope::{self, ScopeGuard, ScopeValue};
use crate::severity::Severity;

pub(crate) struct LoggerEntry {
    category: String,
    minimum_level: AtomicU8,
    factory: Weak<FactoryShared>,
}

impl LoggerEntry {
    pub(crate) fn set_minimum_level(&self, level: Severity) {
        self.minimum_level.store(level.as_u8(), Ordering::Release);
    }
}

#[derive(Clone)]
pub struct Logger {
    entry: Arc<LoggerEntry>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("category", &self.entry.category)
            .field("minimum_level", &self.minimum_level())
            .finish()
    }
}

impl Logger {
    pub(crate) fn new(category: &str, minimum_level: Severity, factory: Weak<FactoryShared>) -> Self {
        Logger {
            entry: Arc::new(LoggerEntry {
                category: category.to_string(),
                minimum_level: AtomicU8::new(minimum_level.as_u8()),
                factory,
            }),
        }
    }

    pub(crate) fn entry(&self) -> &LoggerEntry {
        &self.entry
    }

    pub fn category(&self) -> &str {
        &self.entry.category
    }

    pub fn minimum_level(&self) -> Severity {
        Severity::from_u8(self.entry.minimum_level.load(Ordering::Acquire))
    }

    pub fn is_enabled(&self, severity: Severity) -> bool {
        filter::passes(self.minimum_level(), severity)
    }

    /// True when both handles refer to the same cache entry.
    pub fn shares_entry_with(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.entry, &other.entry)
    }

    /// Every emit method funnels into this. Never fails and never panics
    /// because of a sink.
    #[track_caller]
    pub fn emit(
        &self,
        severity: Severity,
        event_id: impl Into<EventId>,
        error: Option<&dyn Error>,
        template: Option<&str>,
        args: &[LogArg],
    ) {
        if !self.is_enabled(severity) {
            return;
        }
        let (message, bound) = formatter::render_and_bind(template, args);
        let record = LogRecord::new(&self.entry.category, severity, event_id.into(), message)
            .with_template(template, bound)
            .with_error(error.map(describe_error))
            .with_location(Location::caller());
        self.dispatch(record);
    }

    /// Emits text that is already rendered, without template parsing.
    pub(crate) fn emit_rendered(&self, severity: Severity, message: String, args: Vec<LogArg>) {
        if !self.is_enabled(severity) {
            return;
        }
        let record = LogRecord::new(&self.entry.category, severity, EventId::default(), message)
            .with_template(None, args);
        self.dispatch(record);
    }

    fn dispatch(&self, record: LogRecord) {
        let Some(factory) = self.entry.factory.upgrade() else {
            return;
        };
        let record = record.with_scopes(scope::current_chain().into_values());
        factory.dispatch(&record);
    }

    #[track_caller]
    pub fn log(&self, severity: Severity, event_id: impl Into<EventId>, template: &str, args: &[LogArg]) {
        self.emit(severity, event_id, None, Some(template), args);
    }

    /// Like [`Logger::log`] with an error attached to the record.
    #[track_caller]
    pub fn log_error(
        &self,
        severity: Severity,
        event_id: impl Into<EventId>,
        error: &dyn Error,
        template: &str,
        args: &[LogArg],
    ) {
        self.emit(severity, event_id, Some(error), Some(template), args);
    }

    #[track_caller]
    pub fn trace(&self, event_id: impl Into<EventId>, template: &str, args: &[LogArg]) {
        self.emit(Severity::Trace, event_id, None, Some(template), args);
    }

    #[track_caller]
    pub fn debug(&self, event_id: impl Into<EventId>, template: &str, args: &[LogArg]) {
        self.emit(Severity::Debug, event_id, None, Some(template), args);
    }

    #[track_caller]
    pub fn information(&self, event_id: impl Into<EventId>, template: &str, args: &[LogArg]) {
        self.emit(Severity::Information, event_id, None, Some(template), args);
    }

    #[track_caller]
    pub fn warning(&self, event_id: impl Into<EventId>, template: &str, args: &[LogArg]) {
        self.emit(Severity::Warning, event_id, None, Some(template), args);
    }

    #[track_caller]
    pub fn error(&self, event_id: impl Into<EventId>, template: &str, args: &[LogArg]) {
        self.emit(Severity::Error, event_id, None, Some(template), args);
    }

    #[track_caller]
    pub fn critical(&self, event_id: impl Into<EventId>, template: &str, args: &[LogArg]) {
        self.emit(Severity::Critical, event_id, None, Some(template), args);
    }

    /// Pushes a formatted scope onto the calling thread's stack. The scope
    /// ends when the returned guard is dropped.
    pub fn begin_scope(&self, template: &str, args: &[LogArg]) -> ScopeGuard {
        scope::push(ScopeValue::new(template, args))
    }
}
