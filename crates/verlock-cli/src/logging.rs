//! Logging setup for the command line tool
//!
//! Log lines go to stderr so tables printed on stdout stay pipeable.
//! `RUST_LOG` takes precedence over `--log-level`.

use clap::ValueEnum;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human readable, coloured when stderr is a terminal
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
    pub format: LogFormat,
    /// Whether to log span open/close events
    pub enable_spans: bool,
}

impl LoggingConfig {
    /// Build a config for `level`, keeping noisy dependencies at warn
    pub fn new(level: &str, format: LogFormat) -> Self {
        Self {
            default_filter: format!(
                "warn,verlock={level},verlock_core={level},\
                 verlock_drivers={level},verlock_driver_postgres={level},\
                 verlock_driver_mysql={level},verlock_driver_sqlite={level},\
                 verlock_triggers={level}"
            ),
            format,
            enable_spans: level.eq_ignore_ascii_case("trace"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("info", LogFormat::Pretty)
    }
}

/// Install the global subscriber
pub fn init(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))?;

    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_span_events(span_events)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_target(true)
            .with_span_events(span_events)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(layer).try_init()?;

    tracing::debug!(filter = %config.default_filter, format = ?config.format, "logging initialized");
    Ok(())
}
