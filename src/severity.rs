use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::LoggingError;

/// Severity classifies log output. `None` is only meaningful as a threshold:
/// a minimum of `None` disables everything it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Trace = 0,
    Debug = 1,
    Information = 2,
    Warning = 3,
    Error = 4,
    Critical = 5,
    None = 6,
}

impl Severity {
    pub const ALL: [Severity; 7] = [
        Severity::Trace,
        Severity::Debug,
        Severity::Information,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
        Severity::None,
    ];

    /// Short upper-case label used by console output.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Information => "INFO",
            Severity::Warning => "WARN",
            Severity::Error => "ERROR",
            Severity::Critical => "CRIT",
            Severity::None => "NONE",
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_u8(value: u8) -> Severity {
        Severity::ALL
            .get(value as usize)
            .copied()
            .unwrap_or(Severity::None)
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Information
    }
}

impl FromStr for Severity {
    type Err = LoggingError;

    fn from_str(input: &str) -> Result<Severity, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "information" | "info" => Ok(Severity::Information),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" | "fatal" => Ok(Severity::Critical),
            "none" | "off" => Ok(Severity::None),
            other => Err(LoggingError::config(format!(
                "unknown severity '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<log::Level> for Severity {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Trace => Severity::Trace,
            log::Level::Debug => Severity::Debug,
            log::Level::Info => Severity::Information,
            log::Level::Warn => Severity::Warning,
            log::Level::Error => Severity::Error,
        }
    }
}
