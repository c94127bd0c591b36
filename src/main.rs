// zoppa-demo - main.rs
// Replays the console demo: a factory with a console provider, nested
// scopes, and debug records with event ids and template arguments.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use std::sync::Arc;

use zoppa_logging::config::load_config;
use zoppa_logging::log_bridge::LogBridge;
use zoppa_logging::log_sink::LogSink;
use zoppa_logging::tracing_sink::TracingSink;
use zoppa_logging::{EventId, LoggerFactory, Severity};

#[derive(Parser)]
#[command(
    name = "zoppa-demo",
    version = "0.1.0",
    about = "Exercise the zoppa logging core"
)]
struct Cli {
    /// Minimum severity for the factory and the console provider
    /// [default: ZOPPA_LOG_MINIMUM_LEVEL or Information]
    #[arg(long)]
    min_level: Option<String>,

    /// Write console records as JSON objects
    #[arg(long)]
    json: bool,

    /// Also forward records to the tracing subscriber on stderr
    #[arg(long)]
    tracing: bool,
}

// Category marker only.
#[allow(dead_code)]
struct Program;

struct TestCls {
    factory: LoggerFactory,
}

impl TestCls {
    fn new(factory: LoggerFactory) -> Self {
        TestCls { factory }
    }

    fn log(&self) -> anyhow::Result<()> {
        let logger = self.factory.create_logger_for::<TestCls>()?;
        logger.debug(1, "hit? {c} {d}", &[100.into(), 200.into()]);
        {
            let _scope = logger.begin_scope("2", &[]);
            logger.debug(3, "Nothing to see here.", &[]);
            logger.debug(5, "Warning... that was odd.", &[]);
        }
        logger.debug(7, "Oops, there was an error.", &[]);
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse(), None)
}

/// Builds the factory from env config plus flags and replays the demo.
/// `extra_sink` receives every record alongside the configured sinks.
fn run(cli: Cli, extra_sink: Option<Arc<dyn LogSink>>) -> anyhow::Result<()> {
    let mut config = load_config().context("loading logging configuration")?;
    if let Some(level) = cli.min_level.as_deref() {
        let minimum: Severity = level.parse()?;
        config.minimum_level = minimum.to_string();
        config.console.minimum_level = Some(minimum.to_string());
    }
    config.console.json |= cli.json;

    let mut builder = config.factory_builder()?;
    if cli.tracing {
        builder = builder.add_sink(TracingSink::new());
    }
    if let Some(sink) = extra_sink {
        builder = builder.add_shared_sink(sink);
    }
    let factory = builder.build().context("building logger factory")?;
    LogBridge::install(factory.clone(), log::LevelFilter::Trace)?;

    let logger = factory.create_logger_for::<Program>()?;

    let cls = TestCls::new(factory.clone());
    cls.log()?;

    {
        let _outer = logger.begin_scope("scope start {a}", &[100.into()]);
        logger.debug(1, "Does this line get hit? {h} {b}", &[100.into(), 200.into()]);
        {
            let _inner = logger.begin_scope("2", &[]);
            logger.debug(3, "Nothing to see here.", &[]);
            logger.debug(5, "Warning... that was odd.", &[]);
        }
        logger.debug(7, "Oops, there was an error.", &[]);
    }
    logger.debug(5, "== 120.", &[]);

    logger.emit(Severity::Debug, EventId::default(), None, None, &[]);

    log::info!(target: "zoppa_demo::bridge", "records from the log crate reach the same sinks");

    factory.dispose();
    Ok(())
}
