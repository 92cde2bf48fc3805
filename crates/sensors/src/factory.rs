//! Build sensors from an AcquisitionBlueprint

use contracts::{AcquisitionBlueprint, SensorConfig};
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::generator;
use crate::sensor::{GeneratorSensor, Sensor};

/// Sensor factory
pub struct SensorFactory;

impl SensorFactory {
    /// Build a single sensor with its generator and channels
    #[instrument(
        name = "sensor_factory_build",
        skip(config),
        fields(sensor_id = %config.id, channel_count = config.channels.len())
    )]
    pub fn build(config: &SensorConfig) -> Result<GeneratorSensor> {
        let mut sensor = GeneratorSensor::with_boxed_generator(
            config.id.as_str(),
            generator::from_config(&config.generator),
        );
        for channel in &config.channels {
            sensor.add_channel(channel.to_channel_info()?)?;
        }
        Ok(sensor)
    }

    /// Build every sensor of a blueprint, in declaration order.
    ///
    /// Fails on the first sensor that cannot be built.
    #[instrument(
        name = "sensor_factory_build_all",
        skip(blueprint),
        fields(sensor_count = blueprint.sensors.len())
    )]
    pub fn build_all(blueprint: &AcquisitionBlueprint) -> Result<Vec<Box<dyn Sensor>>> {
        let mut sensors: Vec<Box<dyn Sensor>> = Vec::with_capacity(blueprint.sensors.len());
        for config in &blueprint.sensors {
            match Self::build(config) {
                Ok(sensor) => sensors.push(Box::new(sensor)),
                Err(e) => {
                    warn!(error = %e, sensor_id = %config.id, "sensor build failed");
                    return Err(e);
                }
            }
        }
        info!(sensors = sensors.len(), "sensors built");
        Ok(sensors)
    }
}
