//! Library root for the `zoppa_logging` crate
//! Structured logging core: level filtering, scope nesting, message
//! templates and pluggable sinks behind an explicit factory.

// Core error handling
pub mod errors;

// Records and their parts
pub mod log_record;
pub mod severity;

// Rendering, scopes and filtering
pub mod filter;
pub mod formatter;
pub mod scope;

// Logger and factory
pub mod factory;
pub mod logger;

// Sinks
pub mod console_sink;
pub mod log_sink;
pub mod tracing_sink;

// `log` crate integration
pub mod log_bridge;

// Configuration
pub mod config;


pub use errors::{LoggingError, LoggingResult};
pub use factory::{FactoryConfig, LoggerFactory, LoggerFactoryBuilder};
pub use log_record::{EventId, LogArg, LogRecord};
pub use log_sink::{FilteredSink, LogSink, MemorySink, SinkConfig};
pub use logger::Logger;
pub use scope::{ScopeChain, ScopeGuard, ScopeValue};
pub use severity::Severity;
