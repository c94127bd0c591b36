// filter.rs
// Minimum-severity rules: one global threshold plus category-prefix overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{LoggingError, LoggingResult};
use crate::severity::Severity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelFilter {
    minimum_level: Severity,
    overrides: BTreeMap<String, Severity>,
}

impl Default for LevelFilter {
    fn default() -> Self {
        LevelFilter::new(Severity::default())
    }
}

impl LevelFilter {
    pub fn new(minimum_level: Severity) -> Self {
        LevelFilter {
            minimum_level,
            overrides: BTreeMap::new(),
        }
    }

    /// Builds a filter, rejecting malformed category prefixes.
    pub fn with_overrides(
        minimum_level: Severity,
        overrides: impl IntoIterator<Item = (String, Severity)>,
    ) -> LoggingResult<Self> {
        let mut filter = LevelFilter::new(minimum_level);
        for (prefix, level) in overrides {
            filter.add_override(prefix, level)?;
        }
        Ok(filter)
    }

    pub fn add_override(&mut self, prefix: impl Into<String>, level: Severity) -> LoggingResult<()> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        self.overrides.insert(prefix, level);
        Ok(())
    }

    pub fn minimum_level(&self) -> Severity {
        self.minimum_level
    }

    pub fn overrides(&self) -> &BTreeMap<String, Severity> {
        &self.overrides
    }

    /// Threshold that applies to `category`: the longest matching prefix, or
    /// the global minimum when no prefix matches.
    pub fn minimum_for(&self, category: &str) -> Severity {
        self.overrides
            .iter()
            .filter(|(prefix, _)| category.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, level)| *level)
            .unwrap_or(self.minimum_level)
    }

    pub fn is_enabled(&self, category: &str, severity: Severity) -> bool {
        passes(self.minimum_for(category), severity)
    }
}

/// True when `severity` clears `minimum`. Nothing clears a `None` minimum
/// and a `None` record is never emitted.
pub fn passes(minimum: Severity, severity: Severity) -> bool {
    severity != Severity::None && minimum != Severity::None && severity >= minimum
}

fn validate_prefix(prefix: &str) -> LoggingResult<()> {
    if prefix.trim().is_empty() {
        return Err(LoggingError::config("category filter prefix cannot be empty"));
    }
    if prefix.chars().any(char::is_whitespace) {
        return Err(LoggingError::config(format!(
            "category filter prefix '{prefix}' contains whitespace"
        )));
    }
    Ok(())
}

/// Parses `prefix=level,prefix=level` as used by the environment config.
pub fn parse_overrides(list: &str) -> LoggingResult<Vec<(String, Severity)>> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> LoggingResult<(String, Severity)> {
            let (prefix, level) = entry.split_once('=').ok_or_else(|| {
                LoggingError::config(format!("category filter '{entry}' must be prefix=level"))
            })?;
            let prefix = prefix.trim().to_string();
            validate_prefix(&prefix)?;
            Ok((prefix, level.parse::<Severity>()?))
        })
        .collect()
}
