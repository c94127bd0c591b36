//! Error handling for the logging core
//!
//! Only configuration and lifecycle errors ever reach a caller. Sink errors
//! are produced by sinks and swallowed by the dispatch loop, and the message
//! formatter has no error type at all because it always produces a string.

use thiserror::Error;

/// Main error type for the logging core
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Lifecycle error: {message}")]
    Lifecycle { message: String },

    #[error("Sink '{sink}' failed: {message}")]
    Sink { sink: String, message: String },

    #[error("Lock poisoned: {resource}")]
    LockPoisoned { resource: String },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Type alias for Result with LoggingError
pub type LoggingResult<T> = Result<T, LoggingError>;

impl LoggingError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a lifecycle error
    pub fn lifecycle(message: impl Into<String>) -> Self {
        Self::Lifecycle {
            message: message.into(),
        }
    }

    /// Create a sink error
    pub fn sink(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sink {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// True for errors that are raised at configuration time
    pub fn is_config(&self) -> bool {
        matches!(self, LoggingError::Config { .. })
    }

    /// True for errors raised by using a disposed factory
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, LoggingError::Lifecycle { .. })
    }
}

/// Helper trait for mutex operations that report poisoning as an error
pub trait SafeLock<T: ?Sized> {
    fn safe_lock(&self) -> LoggingResult<std::sync::MutexGuard<'_, T>>;
}

impl<T: ?Sized> SafeLock<T> for std::sync::Mutex<T> {
    fn safe_lock(&self) -> LoggingResult<std::sync::MutexGuard<'_, T>> {
        self.lock().map_err(|_| LoggingError::LockPoisoned {
            resource: "mutex".to_string(),
        })
    }
}

/// Helper trait for RwLock read operations
pub trait SafeReadLock<T: ?Sized> {
    fn safe_read(&self) -> LoggingResult<std::sync::RwLockReadGuard<'_, T>>;
}

impl<T: ?Sized> SafeReadLock<T> for std::sync::RwLock<T> {
    fn safe_read(&self) -> LoggingResult<std::sync::RwLockReadGuard<'_, T>> {
        self.read().map_err(|_| LoggingError::LockPoisoned {
            resource: "rwlock_read".to_string(),
        })
    }
}

/// Helper trait for RwLock write operations
pub trait SafeWriteLock<T: ?Sized> {
    fn safe_write(&self) -> LoggingResult<std::sync::RwLockWriteGuard<'_, T>>;
}

impl<T: ?Sized> SafeWriteLock<T> for std::sync::RwLock<T> {
    fn safe_write(&self) -> LoggingResult<std::sync::RwLockWriteGuard<'_, T>> {
        self.write().map_err(|_| LoggingError::LockPoisoned {
            resource: "rwlock_write".to_string(),
        })
    }
}

impl From<std::io::Error> for LoggingError {
    fn from(err: std::io::Error) -> Self {
        LoggingError::io("io_operation", err)
    }
}

impl From<serde_json::Error> for LoggingError {
    fn from(err: serde_json::Error) -> Self {
        LoggingError::serialization("json_operation", err)
    }
}

impl From<figment::Error> for LoggingError {
    fn from(err: figment::Error) -> Self {
        LoggingError::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = LoggingError::config("unknown severity 'loud'");
        assert!(config_err.to_string().contains("Configuration error"));
        assert!(config_err.is_config());

        let lifecycle_err = LoggingError::lifecycle("factory disposed");
        assert!(lifecycle_err.is_lifecycle());
        assert!(!lifecycle_err.is_config());

        let sink_err = LoggingError::sink("console", "broken pipe");
        assert_eq!(sink_err.to_string(), "Sink 'console' failed: broken pipe");
    }

    #[test]
    fn test_error_chaining() {
        use std::error::Error;

        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = LoggingError::io("writing console line", io_err);

        assert!(err.source().is_some());
        assert!(err.to_string().contains("I/O operation failed"));
    }

    #[test]
    fn test_poisoned_lock_is_reported() {
        use std::sync::{Arc, Mutex};

        let lock = Arc::new(Mutex::new(0));
        let clone = Arc::clone(&lock);
        let _ = std::thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        let err = lock.safe_lock().unwrap_err();
        assert!(matches!(err, LoggingError::LockPoisoned { .. }));
    }
}
