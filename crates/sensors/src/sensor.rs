//! Sensor abstraction and the generator-backed implementation

use chrono::Utc;
use contracts::{ChannelInfo, ContractError, Packet, SensorId};
use tracing::{debug, trace};

use crate::error::{Result, SensorError};
use crate::generator::{NanGenerator, ValueGenerator};

/// A data source exposing an ordered set of channels.
///
/// Implementations are driven from the sampling thread, so they must be
/// `Send`; they are never shared between threads.
pub trait Sensor: Send {
    /// Stable identifier
    fn id(&self) -> &SensorId;

    /// Channels in registration order
    fn channels(&self) -> &[ChannelInfo];

    /// Register a channel.
    ///
    /// # Errors
    /// [`ContractError::DuplicateChannel`] if a channel with the same display
    /// key is already registered.
    fn add_channel(&mut self, channel: ChannelInfo) -> Result<()>;

    /// Unregister a channel.
    ///
    /// # Errors
    /// [`SensorError::ChannelNotFound`] if the channel is not registered.
    fn remove_channel(&mut self, channel: &ChannelInfo) -> Result<()>;

    /// Acquire the underlying port
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release the underlying port
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Check that the sensor can be opened and closed.
    fn self_test(&mut self) -> bool {
        self.open().and_then(|_| self.close()).is_ok()
    }

    /// Sample every channel once.
    ///
    /// Returns `Ok(None)` when the sensor has no channels.
    fn read(&mut self) -> Result<Option<Packet>>;

    /// Column keys of this sensor, in channel order
    fn channel_keys(&self) -> Vec<String> {
        self.channels().iter().map(ChannelInfo::display).collect()
    }
}

/// Sensor whose channel values come from a [`ValueGenerator`].
///
/// Defaults to [`NanGenerator`], which is what a sensor without a real
/// backend reports.
pub struct GeneratorSensor {
    id: SensorId,
    channels: Vec<ChannelInfo>,
    generator: Box<dyn ValueGenerator>,
}

impl GeneratorSensor {
    /// Create a sensor with no channels and a NaN generator
    pub fn new(id: impl Into<SensorId>) -> Self {
        Self::with_generator(id, NanGenerator)
    }

    pub fn with_generator(id: impl Into<SensorId>, generator: impl ValueGenerator + 'static) -> Self {
        Self::with_boxed_generator(id, Box::new(generator))
    }

    pub fn with_boxed_generator(id: impl Into<SensorId>, generator: Box<dyn ValueGenerator>) -> Self {
        Self {
            id: id.into(),
            channels: Vec::new(),
            generator,
        }
    }

    /// Builder-style channel registration
    pub fn with_channels(mut self, channels: impl IntoIterator<Item = ChannelInfo>) -> Result<Self> {
        for channel in channels {
            self.add_channel(channel)?;
        }
        Ok(self)
    }

    /// Replace the value generator
    pub fn set_value_generator(&mut self, generator: impl ValueGenerator + 'static) {
        self.generator = Box::new(generator);
    }
}

impl Sensor for GeneratorSensor {
    fn id(&self) -> &SensorId {
        &self.id
    }

    fn channels(&self) -> &[ChannelInfo] {
        &self.channels
    }

    fn add_channel(&mut self, channel: ChannelInfo) -> Result<()> {
        if self.channels.iter().any(|c| c.display() == channel.display()) {
            return Err(ContractError::duplicate_channel(channel.display(), self.id.as_str()).into());
        }
        debug!(sensor_id = %self.id, channel = %channel, "Channel added");
        self.channels.push(channel);
        Ok(())
    }

    fn remove_channel(&mut self, channel: &ChannelInfo) -> Result<()> {
        let index = self
            .channels
            .iter()
            .position(|c| c.display() == channel.display())
            .ok_or_else(|| SensorError::channel_not_found(self.id.clone(), channel.display()))?;
        self.channels.remove(index);
        debug!(sensor_id = %self.id, channel = %channel, "Channel removed");
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Packet>> {
        if self.channels.is_empty() {
            return Ok(None);
        }

        let timestamp = Utc::now();
        let mut values = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let value = self
                .generator
                .generate()
                .map_err(|source| SensorError::ReadFailed {
                    sensor_id: self.id.clone(),
                    channel: channel.display(),
                    source,
                })?;
            values.push((channel.display(), value));
        }

        trace!(sensor_id = %self.id, channels = values.len(), "Sensor read");
        Ok(Some(Packet::new(self.id.clone(), timestamp, values)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeneratorError;
    use crate::generator::{ConstantGenerator, Fallible};

    fn channel(name: &str, unit: &str) -> ChannelInfo {
        ChannelInfo::new(name, unit).unwrap()
    }

    #[test]
    fn test_read_without_channels_is_none() {
        let mut sensor = GeneratorSensor::new("empty");
        assert!(sensor.read().unwrap().is_none());
    }

    #[test]
    fn test_default_generator_is_nan() {
        let mut sensor = GeneratorSensor::new("imada")
            .with_channels([channel("torque", "Nm")])
            .unwrap();
        let packet = sensor.read().unwrap().unwrap();
        assert!(packet.value("torque (Nm)").unwrap().is_nan());
    }

    #[test]
    fn test_read_follows_channel_order() {
        let mut n = 0.0;
        let mut sensor = GeneratorSensor::with_generator("counter", move || {
            n += 1.0;
            n
        })
        .with_channels([channel("b", "V"), channel("a", "V")])
        .unwrap();

        let packet = sensor.read().unwrap().unwrap();
        assert_eq!(packet.columns().collect::<Vec<_>>(), vec!["b (V)", "a (V)"]);
        assert_eq!(packet.value("b (V)"), Some(1.0));
        assert_eq!(packet.value("a (V)"), Some(2.0));
        assert_eq!(packet.sensor_id, "counter");
    }

    #[test]
    fn test_duplicate_channel_rejected() {
        let mut sensor = GeneratorSensor::new("s");
        sensor.add_channel(channel("torque", "Nm")).unwrap();
        let err = sensor.add_channel(channel("torque", "Nm")).unwrap_err();
        assert!(matches!(
            err,
            SensorError::Contract(ContractError::DuplicateChannel { .. })
        ));

        // same name, different unit is a different channel
        sensor.add_channel(channel("torque", "Ncm")).unwrap();
        assert_eq!(sensor.channel_keys(), vec!["torque (Nm)", "torque (Ncm)"]);
    }

    #[test]
    fn test_channels_with_same_key_are_duplicates() {
        let mut sensor = GeneratorSensor::with_generator("s", ConstantGenerator(1.0));
        sensor.add_channel(channel("a (b)", "c")).unwrap();
        // different fields, same "a (b) (c)" column
        let err = sensor.add_channel(channel("a", "b) (c")).unwrap_err();
        assert!(matches!(
            err,
            SensorError::Contract(ContractError::DuplicateChannel { .. })
        ));

        let packet = sensor.read().unwrap().unwrap();
        assert_eq!(packet.values.len(), 1);
    }

    #[test]
    fn test_remove_channel() {
        let mut sensor = GeneratorSensor::with_generator("s", ConstantGenerator(1.0))
            .with_channels([channel("torque", "Nm"), channel("angle", "deg")])
            .unwrap();
        sensor.remove_channel(&channel("torque", "Nm")).unwrap();
        assert_eq!(sensor.channel_keys(), vec!["angle (deg)"]);

        let err = sensor.remove_channel(&channel("torque", "Nm")).unwrap_err();
        assert!(matches!(err, SensorError::ChannelNotFound { .. }));
    }

    #[test]
    fn test_generator_failure_surfaces_as_read_error() {
        let timeout = || -> std::result::Result<f64, GeneratorError> {
            Err(GeneratorError::new("timeout"))
        };
        let mut sensor = GeneratorSensor::with_generator("flaky", Fallible(timeout))
            .with_channels([channel("load", "N")])
            .unwrap();
        let err = sensor.read().unwrap_err();
        assert!(matches!(err, SensorError::ReadFailed { .. }));
        assert!(err.to_string().contains("flaky"));
    }

    #[test]
    fn test_set_value_generator() {
        let mut sensor = GeneratorSensor::new("s").with_channels([channel("x", "m")]).unwrap();
        sensor.set_value_generator(ConstantGenerator(7.0));
        assert_eq!(sensor.read().unwrap().unwrap().value("x (m)"), Some(7.0));
    }

    #[test]
    fn test_default_self_test_passes() {
        let mut sensor = GeneratorSensor::new("s");
        assert!(sensor.self_test());
    }
}
