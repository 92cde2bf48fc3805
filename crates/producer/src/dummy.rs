//! Placeholder sensor for rigs without hardware attached

use contracts::ChannelInfo;
use sensors::generator::GaussianGenerator;
use sensors::GeneratorSensor;

use crate::error::Result;
use crate::process::ProducerProcess;

/// Id of the sensor added by [`plug_dummy_sensor`]
pub const DUMMY_SENSOR_ID: &str = "dummy";

/// Build the dummy sensor: one `torque (Nm)` channel of standard normal noise
pub fn dummy_sensor() -> Result<GeneratorSensor> {
    let sensor = GeneratorSensor::with_generator(DUMMY_SENSOR_ID, GaussianGenerator::new(0.0, 1.0))
        .with_channels([ChannelInfo::new("torque", "Nm")?])?;
    Ok(sensor)
}

/// Add the dummy sensor to a process that is not running.
///
/// Returns `Ok(false)` if it is already plugged.
pub fn plug_dummy_sensor(process: &ProducerProcess) -> Result<bool> {
    process.add_sensor(Box::new(dummy_sensor()?))
}
