// config.rs
// Environment-driven logging configuration, validated into typed settings.

use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::console_sink::{ConsoleSink, ConsoleTarget};
use crate::errors::LoggingResult;
use crate::factory::{FactoryConfig, LoggerFactory, LoggerFactoryBuilder};
use crate::filter::parse_overrides;
use crate::log_sink::SinkConfig;
use crate::severity::Severity;

pub const ENV_PREFIX: &str = "ZOPPA_LOG_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_minimum_level")]
    pub minimum_level: String,
    /// `prefix=level,prefix=level`
    #[serde(default)]
    pub category_filters: String,
    #[serde(default)]
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub json: bool,
    #[serde(default)]
    pub stderr: bool,
    #[serde(default = "default_true")]
    pub timestamps: bool,
    #[serde(default)]
    pub minimum_level: Option<String>,
}

fn default_minimum_level() -> String {
    "Information".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            enabled: true,
            json: false,
            stderr: false,
            timestamps: true,
            minimum_level: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            minimum_level: default_minimum_level(),
            category_filters: String::new(),
            console: ConsoleConfig::default(),
        }
    }
}

/// Defaults merged with `ZOPPA_LOG_*` environment variables. Nested keys use
/// a double underscore, e.g. `ZOPPA_LOG_CONSOLE__JSON=true`.
pub fn load_config() -> LoggingResult<LoggingConfig> {
    LoggingConfig::from_figment(
        Figment::from(Serialized::defaults(LoggingConfig::default()))
            .merge(Env::prefixed(ENV_PREFIX).split("__")),
    )
}

impl LoggingConfig {
    /// Extracts and validates a config from any figment.
    pub fn from_figment(figment: Figment) -> LoggingResult<Self> {
        let config: LoggingConfig = figment.extract()?;
        config.factory_config()?;
        config.console_sink_config()?;
        Ok(config)
    }

    pub fn factory_config(&self) -> LoggingResult<FactoryConfig> {
        let minimum_level: Severity = self.minimum_level.parse()?;
        let category_filters: BTreeMap<String, Severity> =
            parse_overrides(&self.category_filters)?.into_iter().collect();
        let config = FactoryConfig {
            minimum_level,
            category_filters,
        };
        config.to_filter()?;
        Ok(config)
    }

    pub fn console_sink_config(&self) -> LoggingResult<SinkConfig> {
        let minimum_level = self
            .console
            .minimum_level
            .as_deref()
            .map(str::parse::<Severity>)
            .transpose()?;
        Ok(SinkConfig {
            minimum_level,
            category_filters: BTreeMap::new(),
        })
    }

    /// Builds a factory with the console sink when it is enabled.
    pub fn build_factory(&self) -> LoggingResult<LoggerFactory> {
        self.factory_builder()?.build()
    }

    /// Builder preloaded with levels and the console sink, for callers that
    /// want to add sinks of their own.
    pub fn factory_builder(&self) -> LoggingResult<LoggerFactoryBuilder> {
        let mut builder = LoggerFactory::builder().config(self.factory_config()?);
        if self.console.enabled {
            let target = if self.console.stderr {
                ConsoleTarget::Stderr
            } else {
                ConsoleTarget::Stdout
            };
            let sink = ConsoleSink::new(target)
                .json(self.console.json)
                .timestamps(self.console.timestamps);
            builder = builder.register_sink(sink, self.console_sink_config()?);
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn figment_with(overrides: serde_json::Value) -> Figment {
        Figment::from(Serialized::defaults(LoggingConfig::default()))
            .merge(Serialized::defaults(overrides))
    }

    #[test]
    fn defaults_are_valid() {
        let config = LoggingConfig::from_figment(figment_with(serde_json::json!({}))).unwrap();
        let factory_config = config.factory_config().unwrap();
        assert_eq!(factory_config.minimum_level, Severity::Information);
        assert!(factory_config.category_filters.is_empty());
        assert!(config.console.enabled);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = LoggingConfig::from_figment(figment_with(serde_json::json!({
            "minimum_level": "trace",
            "category_filters": "app=warn,app::db=debug",
            "console": { "json": true, "minimum_level": "error" }
        })))
        .unwrap();

        let factory_config = config.factory_config().unwrap();
        assert_eq!(factory_config.minimum_level, Severity::Trace);
        assert_eq!(factory_config.category_filters["app::db"], Severity::Debug);
        assert!(config.console.json);
        assert_eq!(
            config.console_sink_config().unwrap().minimum_level,
            Some(Severity::Error)
        );
    }

    #[test]
    fn invalid_level_fails_fast() {
        let err = LoggingConfig::from_figment(figment_with(serde_json::json!({
            "minimum_level": "chatty"
        })))
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn malformed_filter_fails_fast() {
        let err = LoggingConfig::from_figment(figment_with(serde_json::json!({
            "category_filters": "app"
        })))
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn disabled_console_builds_factory_without_sinks() {
        let mut config = LoggingConfig::default();
        config.console.enabled = false;
        let factory = config.build_factory().unwrap();
        assert_eq!(factory.sink_count(), 0);
    }
}
