//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{AcquisitionBlueprint, GeneratorConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    process: ProcessInfo,
    store: StoreInfo,
    sensor_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sensors: Vec<SensorInfo>,
}

#[derive(Serialize)]
struct ProcessInfo {
    name: String,
    sampling_period_ms: u64,
    max_consecutive_store_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    join_timeout_ms: Option<u64>,
}

#[derive(Serialize)]
struct StoreInfo {
    buffer_length: usize,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    resampling_frequency_hz: Option<f64>,
    cache: String,
}

#[derive(Serialize)]
struct SensorInfo {
    id: String,
    generator: GeneratorConfig,
    channels: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn cache_description(blueprint: &AcquisitionBlueprint) -> String {
    match &blueprint.store.cache_path {
        Some(path) => format!("json-lines ({})", path.display()),
        None => "memory".to_string(),
    }
}

fn build_config_info(blueprint: &AcquisitionBlueprint, args: &InfoArgs) -> ConfigInfo {
    let sensors = if args.sensors {
        blueprint
            .sensors
            .iter()
            .map(|s| SensorInfo {
                id: s.id.clone(),
                generator: s.generator.clone(),
                channels: s.channels.iter().map(|c| c.key()).collect(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        process: ProcessInfo {
            name: blueprint.process.name.clone(),
            sampling_period_ms: blueprint.process.sampling_period_ms,
            max_consecutive_store_failures: blueprint.process.max_consecutive_store_failures,
            join_timeout_ms: blueprint.process.join_timeout_ms,
        },
        store: StoreInfo {
            buffer_length: blueprint.store.buffer_length,
            queue_capacity: blueprint.store.queue_capacity,
            resampling_frequency_hz: blueprint.store.resampling_frequency_hz,
            cache: cache_description(blueprint),
        },
        sensor_count: blueprint.sensors.len(),
        sensors,
    }
}

fn print_config_info(blueprint: &AcquisitionBlueprint, args: &InfoArgs) {
    println!("=== DAQ Configuration ===\n");

    let process = &blueprint.process;
    println!("Process");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Name: {}", process.name);
    println!("   ├─ Sampling period: {} ms", process.sampling_period_ms);
    println!(
        "   ├─ Max consecutive store failures: {}",
        process.max_consecutive_store_failures
    );
    match process.join_timeout_ms {
        Some(ms) => println!("   └─ Join timeout: {ms} ms"),
        None => println!("   └─ Join timeout: none"),
    }

    let store = &blueprint.store;
    println!("\nStore");
    println!("   ├─ Buffer length: {}", store.buffer_length);
    println!("   ├─ Queue capacity: {}", store.queue_capacity);
    match store.resampling_frequency_hz {
        Some(hz) => println!("   ├─ Resampling: {hz} Hz"),
        None => println!("   ├─ Resampling: off"),
    }
    println!("   └─ Cache: {}", cache_description(blueprint));

    println!("\nSensors ({})", blueprint.sensors.len());
    for (i, sensor) in blueprint.sensors.iter().enumerate() {
        let is_last = i == blueprint.sensors.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} ({:?})", prefix, sensor.id, sensor.generator);

        if args.sensors && !sensor.channels.is_empty() {
            for (j, channel) in sensor.channels.iter().enumerate() {
                let channel_prefix = if j == sensor.channels.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                println!("   {}  {} {}", child_prefix, channel_prefix, channel.key());
            }
        } else {
            println!("   {}  └─ {} channels", child_prefix, sensor.channels.len());
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_config_info_json() {
        let blueprint = ConfigLoader::load_from_str(
            r#"{
                "process": { "name": "torque" },
                "store": { "cache_path": "cache/torque.jsonl" },
                "sensors": [{
                    "id": "imada",
                    "generator": { "kind": "gaussian" },
                    "channels": [{ "name": "torque", "unit": "Nm" }]
                }]
            }"#,
            ConfigFormat::Json,
        )
        .unwrap();
        let args = InfoArgs {
            config: "unused.json".into(),
            json: true,
            sensors: true,
        };

        let value = serde_json::to_value(build_config_info(&blueprint, &args)).unwrap();
        assert_eq!(value["process"]["sampling_period_ms"], 10);
        assert_eq!(value["store"]["cache"], "json-lines (cache/torque.jsonl)");
        assert_eq!(value["sensors"][0]["channels"][0], "torque (Nm)");
        assert_eq!(value["sensors"][0]["generator"]["kind"], "gaussian");
    }
}
