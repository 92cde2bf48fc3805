//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::session::{Session, SessionPlan};

/// Execute the `run` command
pub async fn run_record(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(period_ms) = args.sampling_period_ms {
        if period_ms == 0 {
            return Err(CliError::invalid_argument("sampling-period-ms", "must be > 0").into());
        }
        info!(period_ms, "Overriding sampling period from CLI");
        blueprint.process.sampling_period_ms = period_ms;
    }
    if let Some(ref path) = args.cache_path {
        info!(path = %path.display(), "Overriding cache path from CLI");
        blueprint.store.cache_path = Some(path.clone());
    }

    let plan = build_plan(args)?;

    info!(
        process = %blueprint.process.name,
        sampling_period_ms = blueprint.process.sampling_period_ms,
        sensors = blueprint.sensors.len(),
        channels = blueprint.channel_count(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        println!(
            "Process '{}': {} sensors, {} channels, period {} ms",
            blueprint.process.name,
            blueprint.sensors.len(),
            blueprint.channel_count(),
            blueprint.process.sampling_period_ms,
        );
        for key in blueprint.channel_keys() {
            println!("  - {key}");
        }
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let session = Session::build(&blueprint, args.dummy)?;
    if session.process().sensors().is_empty() {
        warn!("No sensors configured - rows will be empty and nothing is recorded");
    }

    info!(
        recording_secs = plan.recording_time().as_secs_f64(),
        "Starting acquisition..."
    );
    let stats = session.record(&plan, shutdown_signal()).await?;

    info!(
        rows_put = stats.report.rows_put,
        rows = stats.table.len(),
        duration_secs = stats.duration.as_secs_f64(),
        rows_per_second = format!("{:.2}", stats.rows_per_second()),
        "Acquisition finished"
    );
    stats.print_summary();

    if let Some(ref output) = args.output {
        stats.write_json(output)?;
    }

    if let producer::LoopExit::Aborted { last_error, .. } = &stats.report.exit {
        return Err(CliError::acquisition_aborted(&stats.process, last_error.clone()).into());
    }

    info!("DAQ recorder finished");
    Ok(())
}

fn seconds(name: &'static str, value: f64) -> Result<Duration, CliError> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| CliError::invalid_argument(name, format!("{value}: {e}")))
}

fn build_plan(args: &RunArgs) -> Result<SessionPlan, CliError> {
    let duration = seconds("duration", args.duration)?;
    let pause = match (args.pause_after, args.pause_for) {
        (Some(after), Some(length)) => {
            Some((seconds("pause-after", after)?, seconds("pause-for", length)?))
        }
        _ => None,
    };

    let mut plan = SessionPlan::new(duration, pause);
    plan.include_cache = !args.memory_only;
    plan.keep_cache = args.keep_cache;
    Ok(plan)
}

/// Resolves on Ctrl+C or SIGTERM; never resolves if no handler can be installed
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn run_args(extra: &[&str]) -> RunArgs {
        let argv = ["daq-recorder", "run"].iter().chain(extra).copied();
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_build_plan_rejects_negative_duration() {
        let err = build_plan(&run_args(&["--duration=-1"])).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument { name: "duration", .. }));
    }

    #[test]
    fn test_build_plan_flags() {
        let plan = build_plan(&run_args(&["--memory-only", "--keep-cache"])).unwrap();
        assert!(!plan.include_cache);
        assert!(plan.keep_cache);
        assert_eq!(plan.recording_time(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_missing_config() {
        let err = run_record(&run_args(&["-c", "/nonexistent/acquisition.toml"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::ConfigNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acquisition.toml");
        std::fs::write(
            &path,
            "[process]\nname = \"dry\"\n\n[[sensors]]\nid = \"imada\"\nchannels = [{ name = \"torque\", unit = \"Nm\" }]\n",
        )
        .unwrap();

        let path = path.to_string_lossy().into_owned();
        run_record(&run_args(&["-c", path.as_str(), "--dry-run"]))
            .await
            .unwrap();
    }
}
