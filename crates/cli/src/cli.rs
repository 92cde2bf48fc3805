//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// DAQ Recorder - sample configured sensors at a fixed rate into a buffered store
#[derive(Parser, Debug)]
#[command(
    name = "daq-recorder",
    author,
    version,
    about = "Fixed-rate multi-sensor data acquisition",
    long_about = "Samples the sensors described in a configuration file on a dedicated \n\
                  thread, merges every tick into one row and buffers the rows in a \n\
                  store with a memory or JSON-lines cache."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "DAQ_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "DAQ_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a session
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "acquisition.toml", env = "DAQ_CONFIG")]
    pub config: PathBuf,

    /// Recording duration in seconds
    #[arg(short, long, default_value = "5", env = "DAQ_DURATION")]
    pub duration: f64,

    /// Pause sampling after this many seconds of recording
    #[arg(long, requires = "pause_for")]
    pub pause_after: Option<f64>,

    /// Length of the pause in seconds
    #[arg(long)]
    pub pause_for: Option<f64>,

    /// Plug the built-in dummy torque sensor in addition to the configured ones
    #[arg(long)]
    pub dummy: bool,

    /// Override the sampling period from configuration (milliseconds)
    #[arg(long, env = "DAQ_SAMPLING_PERIOD_MS")]
    pub sampling_period_ms: Option<u64>,

    /// Override the cache file from configuration
    #[arg(long, env = "DAQ_CACHE_PATH")]
    pub cache_path: Option<PathBuf>,

    /// Write the recorded table and loop report to this JSON file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only report rows still held in memory
    #[arg(long)]
    pub memory_only: bool,

    /// Keep the cache after the session instead of deleting it
    #[arg(long)]
    pub keep_cache: bool,

    /// Validate configuration and exit without recording
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "DAQ_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "acquisition.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "acquisition.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show detailed sensor information
    #[arg(long)]
    pub sensors: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_pause_cycle() {
        let cli = Cli::try_parse_from([
            "daq-recorder",
            "run",
            "-c",
            "bench.toml",
            "--duration",
            "2.5",
            "--pause-after",
            "1",
            "--pause-for",
            "0.5",
            "--dummy",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.config, PathBuf::from("bench.toml"));
        assert_eq!(args.duration, 2.5);
        assert_eq!(args.pause_after, Some(1.0));
        assert_eq!(args.pause_for, Some(0.5));
        assert!(args.dummy);
        assert!(!args.memory_only);
    }

    #[test]
    fn test_pause_after_requires_pause_for() {
        let result = Cli::try_parse_from(["daq-recorder", "run", "--pause-after", "1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_format_maps_to_observability() {
        let cli = Cli::try_parse_from(["daq-recorder", "--log-format", "compact", "info"]).unwrap();
        let format: observability::LogFormat = cli.log_format.into();
        assert_eq!(format, observability::LogFormat::Compact);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["daq-recorder", "-q", "-v", "info"]);
        assert!(result.is_err());
    }
}
