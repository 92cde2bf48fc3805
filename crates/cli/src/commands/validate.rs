//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{AcquisitionBlueprint, GeneratorConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    process: String,
    sampling_period_ms: u64,
    sensor_count: usize,
    channel_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    process: blueprint.process.name.clone(),
                    sampling_period_ms: blueprint.process.sampling_period_ms,
                    sensor_count: blueprint.sensors.len(),
                    channel_count: blueprint.channel_count(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &AcquisitionBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sensors.is_empty() {
        warnings.push("No sensors configured - recorded rows will be empty".to_string());
    }

    for sensor in &blueprint.sensors {
        if sensor.channels.is_empty() {
            warnings.push(format!(
                "Sensor '{}' has no channels and contributes nothing",
                sensor.id
            ));
        }
        if sensor.generator == GeneratorConfig::Nan && !sensor.channels.is_empty() {
            warnings.push(format!("Sensor '{}' only produces NaN values", sensor.id));
        }
    }

    if let Some(hz) = blueprint.store.resampling_frequency_hz {
        let sampling_hz = 1000.0 / blueprint.process.sampling_period_ms as f64;
        if hz > sampling_hz {
            warnings.push(format!(
                "resampling_frequency_hz ({hz}) exceeds the sampling rate ({sampling_hz:.1} Hz) - resampled reads will have gaps"
            ));
        }
    }

    if blueprint.store.queue_capacity < blueprint.store.buffer_length {
        warnings.push(format!(
            "queue_capacity ({}) is smaller than buffer_length ({}) - rows are dropped unless read often",
            blueprint.store.queue_capacity, blueprint.store.buffer_length
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Process: {}", summary.process);
            println!("  Sampling period: {} ms", summary.sampling_period_ms);
            println!("  Sensors: {}", summary.sensor_count);
            println!("  Channels: {}", summary.channel_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
