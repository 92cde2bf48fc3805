//! # DAQ Recorder CLI
//!
//! `daq-recorder run` records a session from an acquisition config,
//! `validate` checks a config and `info` describes it.
//!
//! Environment variables prefixed with `DAQ_` (or a `.env` file) stand in
//! for the matching flags.

mod cli;
mod commands;
mod error;
mod session;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::{error, info};

use cli::{Cli, Commands};
use commands::{run_info, run_record, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    observability::init_with_config(
        ObservabilityConfig::from_verbosity(cli.verbose, cli.quiet)
            .with_log_format(cli.log_format.into()),
    )?;

    info!(version = env!("CARGO_PKG_VERSION"), "daq-recorder starting");

    let result = match &cli.command {
        Commands::Run(args) => run_record(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        error!(error = %e, "Command failed");
    }
    result
}
