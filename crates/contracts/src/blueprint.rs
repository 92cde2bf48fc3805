//! AcquisitionBlueprint - Config Loader output
//!
//! Describes a complete acquisition setup: process cadence, store sizing and
//! the sensors with their channels and value generators.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{ChannelInfo, ContractError};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete acquisition configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AcquisitionBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Sampling process settings
    #[validate(nested)]
    pub process: ProcessSettings,

    /// Buffered store settings
    #[serde(default)]
    #[validate(nested)]
    pub store: StoreSettings,

    /// Sensor definitions, sampled in this order
    #[serde(default)]
    #[validate(nested)]
    pub sensors: Vec<SensorConfig>,
}

/// Sampling process settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProcessSettings {
    /// Process name (used in logs)
    #[validate(length(min = 1, message = "process name cannot be empty"))]
    pub name: String,

    /// Fixed tick period in milliseconds
    #[serde(default = "default_sampling_period_ms")]
    #[validate(range(min = 1, message = "sampling_period_ms must be > 0"))]
    pub sampling_period_ms: u64,

    /// Consecutive store failures tolerated before the loop aborts
    #[serde(default = "default_max_store_failures")]
    #[validate(range(min = 1))]
    pub max_consecutive_store_failures: u32,

    /// Bounded join wait in milliseconds (None = wait indefinitely)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub join_timeout_ms: Option<u64>,
}

impl ProcessSettings {
    pub fn sampling_period(&self) -> Duration {
        Duration::from_millis(self.sampling_period_ms)
    }

    pub fn join_timeout(&self) -> Option<Duration> {
        self.join_timeout_ms.map(Duration::from_millis)
    }
}

fn default_sampling_period_ms() -> u64 {
    10
}

fn default_max_store_failures() -> u32 {
    10
}

/// Buffered store settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StoreSettings {
    /// Max in-memory rows before an implicit flush
    #[serde(default = "default_buffer_length")]
    #[validate(range(min = 1, message = "buffer_length must be >= 1"))]
    pub buffer_length: usize,

    /// Optional resampling frequency (Hz) applied on read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(exclusive_min = 0.0, message = "resampling_frequency_hz must be > 0"))]
    pub resampling_frequency_hz: Option<f64>,

    /// Put queue capacity
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1, message = "queue_capacity must be >= 1"))]
    pub queue_capacity: usize,

    /// JSON-lines cache file (None = in-memory cache)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            buffer_length: default_buffer_length(),
            resampling_frequency_hz: None,
            queue_capacity: default_queue_capacity(),
            cache_path: None,
        }
    }
}

fn default_buffer_length() -> usize {
    10
}

fn default_queue_capacity() -> usize {
    65_536
}

/// Sensor definition
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SensorConfig {
    /// Unique sensor identifier
    #[validate(length(min = 1, message = "sensor id cannot be empty"))]
    pub id: String,

    /// Value generation strategy
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Channels, sampled in this order
    #[serde(default)]
    #[validate(nested)]
    pub channels: Vec<ChannelConfig>,
}

/// Channel definition
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChannelConfig {
    #[validate(length(min = 1, message = "channel name cannot be empty"))]
    pub name: String,

    #[validate(length(min = 1, message = "channel unit cannot be empty"))]
    pub unit: String,
}

impl ChannelConfig {
    pub fn to_channel_info(&self) -> Result<ChannelInfo, ContractError> {
        ChannelInfo::new(self.name.clone(), self.unit.clone())
    }

    /// Column key, same form as [`ChannelInfo::display`]
    pub fn key(&self) -> String {
        format!("{} ({})", self.name, self.unit)
    }
}

/// Value generator selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorConfig {
    /// Always NaN (placeholder for unconnected channels)
    #[default]
    Nan,
    /// Fixed value
    Constant { value: f64 },
    /// Normally distributed noise
    Gaussian {
        #[serde(default)]
        mean: f64,
        #[serde(default = "default_std_dev")]
        std_dev: f64,
    },
    /// Sine wave over wall-clock time
    Sine {
        amplitude: f64,
        frequency_hz: f64,
        #[serde(default)]
        offset: f64,
    },
    /// Cycles through the listed values
    Sequence { values: Vec<f64> },
}

fn default_std_dev() -> f64 {
    1.0
}

impl AcquisitionBlueprint {
    /// All channel keys across sensors, in sampling order
    pub fn channel_keys(&self) -> Vec<String> {
        self.sensors
            .iter()
            .flat_map(|sensor| sensor.channels.iter().map(ChannelConfig::key))
            .collect()
    }

    /// Total channel count
    pub fn channel_count(&self) -> usize {
        self.sensors.iter().map(|s| s.channels.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blueprint() -> AcquisitionBlueprint {
        AcquisitionBlueprint {
            version: ConfigVersion::V1,
            process: ProcessSettings {
                name: "torque".into(),
                sampling_period_ms: 10,
                max_consecutive_store_failures: 10,
                join_timeout_ms: None,
            },
            store: StoreSettings::default(),
            sensors: vec![SensorConfig {
                id: "imada".into(),
                generator: GeneratorConfig::Gaussian {
                    mean: 0.0,
                    std_dev: 1.0,
                },
                channels: vec![
                    ChannelConfig {
                        name: "torque".into(),
                        unit: "Nm".into(),
                    },
                    ChannelConfig {
                        name: "load".into(),
                        unit: "N".into(),
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_channel_keys_in_order() {
        let bp = sample_blueprint();
        assert_eq!(bp.channel_keys(), vec!["torque (Nm)", "load (N)"]);
        assert_eq!(bp.channel_count(), 2);
    }

    #[test]
    fn test_derive_validation() {
        let mut bp = sample_blueprint();
        assert!(bp.validate().is_ok());

        bp.process.sampling_period_ms = 0;
        bp.sensors[0].channels[0].unit = String::new();
        let errors = bp.validate().unwrap_err().to_string();
        assert!(errors.contains("sampling_period_ms"), "got: {errors}");
        assert!(errors.contains("unit"), "got: {errors}");
    }

    #[test]
    fn test_generator_defaults_to_nan() {
        let sensor: SensorConfig = serde_json::from_str(r#"{ "id": "s" }"#).unwrap();
        assert_eq!(sensor.generator, GeneratorConfig::Nan);
        assert!(sensor.channels.is_empty());
    }

    #[test]
    fn test_durations() {
        let mut bp = sample_blueprint();
        bp.process.join_timeout_ms = Some(1500);
        assert_eq!(bp.process.sampling_period(), Duration::from_millis(10));
        assert_eq!(bp.process.join_timeout(), Some(Duration::from_millis(1500)));
    }
}
