// log_record.rs
// Structured values produced for every emission that passes the level filter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::panic::Location;

use crate::scope::ScopeValue;
use crate::severity::Severity;

/// Identifies a logging call site independently of its rendered text.
/// The default value (0, no name) is the empty sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    pub id: i32,
    pub name: Option<String>,
}

impl EventId {
    pub fn new(id: i32) -> Self {
        EventId { id, name: None }
    }

    pub fn named(id: i32, name: impl Into<String>) -> Self {
        EventId {
            id,
            name: Some(name.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id == 0 && self.name.is_none()
    }
}

impl From<i32> for EventId {
    fn from(id: i32) -> Self {
        EventId::new(id)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}:{}", self.id, name),
            None => write!(f, "{}", self.id),
        }
    }
}

/// One argument supplied to a message template. `Value::Null` is the null
/// argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogArg {
    pub key: Option<String>,
    pub value: Value,
}

impl LogArg {
    pub fn new(value: impl Into<Value>) -> Self {
        LogArg {
            key: None,
            value: value.into(),
        }
    }

    pub fn named(key: impl Into<String>, value: impl Into<Value>) -> Self {
        LogArg {
            key: Some(key.into()),
            value: value.into(),
        }
    }

    pub fn null() -> Self {
        LogArg {
            key: None,
            value: Value::Null,
        }
    }
}

macro_rules! log_arg_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for LogArg {
                fn from(value: $ty) -> Self {
                    LogArg::new(value)
                }
            }
        )*
    };
}

log_arg_from!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64, bool, String, &str, Value);

impl<T: Into<Value>> From<Option<T>> for LogArg {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => LogArg::new(inner),
            None => LogArg::null(),
        }
    }
}

/// Immutable record handed to every sink. Sinks borrow it for the duration
/// of `consume` and clone whatever they want to keep.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub category: String,
    pub severity: Severity,
    pub event_id: EventId,
    pub message: String,
    pub template: Option<String>,
    pub args: Vec<LogArg>,
    pub scopes: Vec<ScopeValue>,
    pub error: Option<String>,
    #[serde(serialize_with = "serialize_location")]
    pub location: Option<&'static Location<'static>>,
    pub thread: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    /// Creates a record stamped with the current time and thread name.
    pub fn new(category: &str, severity: Severity, event_id: EventId, message: String) -> Self {
        LogRecord {
            category: category.to_string(),
            severity,
            event_id,
            message,
            template: None,
            args: Vec::new(),
            scopes: Vec::new(),
            error: None,
            location: None,
            thread: std::thread::current().name().map(str::to_string),
            timestamp: Utc::now(),
        }
    }

    pub fn with_template(mut self, template: Option<&str>, args: Vec<LogArg>) -> Self {
        self.template = template.map(str::to_string);
        self.args = args;
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<ScopeValue>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    pub fn with_location(mut self, location: &'static Location<'static>) -> Self {
        self.location = Some(location);
        self
    }

    /// Looks up a bound argument by key.
    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args
            .iter()
            .find(|arg| arg.key.as_deref() == Some(key))
            .map(|arg| &arg.value)
    }

    /// Rendered scope messages, outermost first.
    pub fn scope_messages(&self) -> Vec<&str> {
        self.scopes.iter().map(|s| s.message.as_str()).collect()
    }
}

fn serialize_location<S: Serializer>(
    location: &Option<&'static Location<'static>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match location {
        Some(loc) => serializer.serialize_str(&format!("{}:{}", loc.file(), loc.line())),
        None => serializer.serialize_none(),
    }
}

/// Renders an error together with its source chain, joined by ": ".
pub fn describe_error(error: &dyn std::error::Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_event_id_is_empty_sentinel() {
        let id = EventId::default();
        assert!(id.is_empty());
        assert_eq!(id.id, 0);
        assert!(id.name.is_none());
        assert!(!EventId::new(3).is_empty());
        assert_eq!(EventId::named(7, "Oops").to_string(), "7:Oops");
    }

    #[test]
    fn log_arg_conversions() {
        let arg: LogArg = 100.into();
        assert_eq!(arg.value, serde_json::json!(100));
        assert!(arg.key.is_none());

        let none: LogArg = Option::<i32>::None.into();
        assert_eq!(none.value, Value::Null);

        let named = LogArg::named("user", "alice");
        assert_eq!(named.key.as_deref(), Some("user"));
    }

    #[test]
    fn record_serializes_location_as_file_and_line() {
        let record = LogRecord::new("demo", Severity::Debug, EventId::new(1), "hi".into())
            .with_location(Location::caller());
        let json = serde_json::to_value(&record).unwrap();
        let location = json["location"].as_str().unwrap();
        assert!(location.contains("log_record.rs:"));
        assert_eq!(json["eventId"]["id"], 1);
        assert_eq!(json["severity"], "Debug");
    }

    #[test]
    fn describe_error_includes_source_chain() {
        #[derive(Debug)]
        struct Outer(std::io::Error);
        impl fmt::Display for Outer {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "request failed")
            }
        }
        impl std::error::Error for Outer {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert_eq!(describe_error(&err), "request failed: disk full");
    }
}
