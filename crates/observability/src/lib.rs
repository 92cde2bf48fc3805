//! # Observability
//!
//! Log subscriber setup and Prometheus export for the acquisition binaries.
//!
//! The log level comes from the verbosity flags of the caller unless
//! `RUST_LOG` is set; `--quiet` pins it to `warn`. Acquisition metrics
//! (`daq_*`) are recorded through the helpers in [`metrics`] and reach
//! Prometheus only once an exporter is installed.
//!
//! ## Example
//!
//! ```ignore
//! observability::init_with_config(
//!     ObservabilityConfig::from_verbosity(1, false).with_metrics_port(9000),
//! )?;
//!
//! let table = process.read(true)?;
//! println!("{}", observability::TableSummary::from_table(&table));
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_row_put, record_sensor_failure, record_state, record_store_failure, record_store_flush,
    record_store_memory_rows, record_store_queue_len, record_tick, RunningStats, StatsSummary,
    TableSummary,
};

/// Port of the Prometheus endpoint when none is given
pub const DEFAULT_METRICS_PORT: u16 = 9000;

/// Structured JSON logs, `info` level, metrics on [`DEFAULT_METRICS_PORT`]
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default().with_metrics_port(DEFAULT_METRICS_PORT))
}

/// Log format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON
    #[default]
    Json,
    /// Multi-line, human readable
    Pretty,
    /// Single line
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => anyhow::bail!("unknown log format: {other}"),
        }
    }
}

/// Logging and metrics setup for one binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    /// Ignore `RUST_LOG` and always use `log_level`
    pub pin_level: bool,
    /// Prometheus port, `None` leaves metrics unexported
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            log_level: "info".to_string(),
            pin_level: false,
            metrics_port: None,
        }
    }
}

impl ObservabilityConfig {
    /// Map `-v` counts to a level: 0 → info, 1 → debug, more → trace.
    /// `quiet` pins the level to `warn`.
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        let (level, pin_level) = match (quiet, verbose) {
            (true, _) => ("warn", true),
            (false, 0) => ("info", false),
            (false, 1) => ("debug", false),
            (false, _) => ("trace", false),
        };
        Self {
            log_level: level.to_string(),
            pin_level,
            ..Self::default()
        }
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn with_metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = Some(port);
        self
    }

    fn env_filter(&self) -> EnvFilter {
        if self.pin_level {
            return EnvFilter::new(&self.log_level);
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
    }
}

/// Formatting layer for `format`
pub fn log_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    }
}

/// Install the global subscriber, then the exporter if a port is set
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(log_layer(config.log_format))
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        log_level = %config.log_level,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// Install only the Prometheus exporter on `0.0.0.0:port`
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus exporter on port {port}"))?;

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.metrics_port, None);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(ObservabilityConfig::from_verbosity(0, false).log_level, "info");
        assert_eq!(ObservabilityConfig::from_verbosity(1, false).log_level, "debug");
        assert_eq!(ObservabilityConfig::from_verbosity(4, false).log_level, "trace");

        let quiet = ObservabilityConfig::from_verbosity(0, true);
        assert_eq!(quiet.log_level, "warn");
        assert!(quiet.pin_level);
    }

    #[test]
    fn test_builders() {
        let config = ObservabilityConfig::from_verbosity(0, false)
            .with_log_format(LogFormat::Compact)
            .with_metrics_port(9100);
        assert_eq!(config.log_format, LogFormat::Compact);
        assert_eq!(config.metrics_port, Some(9100));
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("COMPACT".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
