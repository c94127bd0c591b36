// log_bridge.rs
// Routes `log` crate macros from any dependency through a LoggerFactory.

use crate::errors::{LoggingError, LoggingResult};
use crate::factory::LoggerFactory;
use crate::filter;
use crate::log_record::LogArg;
use crate::severity::Severity;

/// `log::Log` implementation backed by a factory. The log target becomes
/// the category, so the factory's prefix filters apply to it.
pub struct LogBridge {
    factory: LoggerFactory,
}

impl LogBridge {
    pub fn new(factory: LoggerFactory) -> Self {
        LogBridge { factory }
    }

    /// Installs the bridge as the process-wide `log` logger.
    pub fn install(factory: LoggerFactory, max_level: log::LevelFilter) -> LoggingResult<()> {
        log::set_boxed_logger(Box::new(LogBridge::new(factory)))
            .map_err(|e| LoggingError::config(format!("log bridge already installed: {e}")))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl log::Log for LogBridge {
    // Answers from the filter alone; a query must not grow the logger cache.
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        !self.factory.is_disposed()
            && filter::passes(
                self.factory.minimum_level_for(metadata.target()),
                Severity::from(metadata.level()),
            )
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Ok(logger) = self.factory.create_logger(record.target()) else {
            return;
        };
        let severity = Severity::from(record.level());
        let mut args = Vec::new();
        if let Some(module) = record.module_path() {
            args.push(LogArg::named("module", module));
        }
        if let (Some(file), Some(line)) = (record.file(), record.line()) {
            args.push(LogArg::named("source", format!("{file}:{line}")));
        }
        logger.emit_rendered(severity, record.args().to_string(), args);
    }

    fn flush(&self) {
        self.factory.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_sink::MemorySink;
    use log::Log;
    use std::sync::Arc;

    #[test]
    fn log_records_reach_the_factory() {
        let sink = Arc::new(MemorySink::new());
        let factory = LoggerFactory::builder()
            .minimum_level(Severity::Debug)
            .add_filter("noisy", Severity::Error)
            .add_sink(sink.clone())
            .build()
            .unwrap();
        let bridge = LogBridge::new(factory);

        bridge.log(
            &log::Record::builder()
                .target("app::net")
                .level(log::Level::Info)
                .args(format_args!("connected to {{peer}} {}", 7))
                .module_path(Some("app::net"))
                .build(),
        );
        bridge.log(
            &log::Record::builder()
                .target("noisy::dep")
                .level(log::Level::Warn)
                .args(format_args!("suppressed"))
                .build(),
        );

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, "app::net");
        assert_eq!(records[0].severity, Severity::Information);
        assert_eq!(records[0].message, "connected to {peer} 7");
        assert_eq!(records[0].arg("module"), Some(&serde_json::json!("app::net")));

        let trace = log::Metadata::builder()
            .target("app")
            .level(log::Level::Trace)
            .build();
        assert!(!bridge.enabled(&trace));
    }

    #[test]
    fn enabled_queries_do_not_create_loggers() {
        let factory = LoggerFactory::builder()
            .minimum_level(Severity::Information)
            .build()
            .unwrap();
        let bridge = LogBridge::new(factory.clone());

        for target in ["a", "b::c", "d"] {
            let metadata = log::Metadata::builder()
                .target(target)
                .level(log::Level::Warn)
                .build();
            assert!(bridge.enabled(&metadata));
        }
        bridge.log(
            &log::Record::builder()
                .target("quiet")
                .level(log::Level::Debug)
                .args(format_args!("below the minimum"))
                .build(),
        );
        assert_eq!(factory.logger_count(), 0);

        factory.dispose();
        let metadata = log::Metadata::builder()
            .target("a")
            .level(log::Level::Error)
            .build();
        assert!(!bridge.enabled(&metadata));
    }
}
