//! Producer - aggregates sensors into one row per tick

use std::panic::{self, AssertUnwindSafe};

use chrono::Utc;
use contracts::{ChannelInfo, ContractError, Row, SensorId};
use sensors::{Sensor, SensorError};
use tracing::{debug, instrument, warn};

use crate::error::{ProducerError, Result};

/// A sensor that failed during a sample
#[derive(Debug)]
pub struct SensorFailure {
    pub sensor_id: SensorId,
    pub error: SensorError,
}

/// Outcome of one producer sample
#[derive(Debug, Default)]
pub struct Sample {
    /// Merged row, `None` if no sensor contributed
    pub row: Option<Row>,
    /// Sensors whose read failed this tick
    pub failures: Vec<SensorFailure>,
}

/// Read-only description of a member sensor
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SensorSummary {
    pub id: SensorId,
    pub channels: Vec<String>,
}

/// Ordered set of sensors keyed by id.
///
/// Channel keys are unique across all member sensors, so every column of a
/// merged row has exactly one source.
#[derive(Default)]
pub struct Producer {
    sensors: Vec<Box<dyn Sensor>>,
}

impl Producer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sensor.
    ///
    /// Returns `Ok(false)` without touching the sensor if one with the same
    /// id is already a member.
    ///
    /// # Errors
    /// - [`ProducerError::SelfTestFailed`] if the sensor's self test fails
    /// - [`ContractError::DuplicateChannel`] if one of its channel keys is
    ///   already provided by another member
    #[instrument(name = "producer_add_sensor", skip(self, sensor), fields(sensor_id = %sensor.id()))]
    pub fn add_sensor(&mut self, mut sensor: Box<dyn Sensor>) -> Result<bool> {
        if self.contains(sensor.id()) {
            debug!("sensor already registered");
            return Ok(false);
        }

        for key in sensor.channel_keys() {
            if let Some(owner) = self.owner_of(&key) {
                return Err(ContractError::duplicate_channel(key, owner.as_str()).into());
            }
        }

        if !sensor.self_test() {
            warn!("sensor self test failed, not added");
            return Err(ProducerError::SelfTestFailed {
                sensor_id: sensor.id().clone(),
            });
        }

        debug!(channels = sensor.channels().len(), "sensor added");
        self.sensors.push(sensor);
        Ok(true)
    }

    /// Remove a sensor by id; absent ids are a no-op
    pub fn remove_sensor(&mut self, sensor_id: &SensorId) -> Option<Box<dyn Sensor>> {
        let index = self.sensors.iter().position(|s| s.id() == sensor_id)?;
        debug!(sensor_id = %sensor_id, "sensor removed");
        Some(self.sensors.remove(index))
    }

    /// Add a channel to a member sensor, keeping keys unique producer-wide
    pub fn add_channel(&mut self, sensor_id: &SensorId, channel: ChannelInfo) -> Result<()> {
        let key = channel.display();
        if let Some(owner) = self.owner_of(&key) {
            if owner != sensor_id {
                return Err(ContractError::duplicate_channel(key, owner.as_str()).into());
            }
        }
        self.sensor_mut(sensor_id)?.add_channel(channel)?;
        Ok(())
    }

    /// Remove a channel from a member sensor
    pub fn remove_channel(&mut self, sensor_id: &SensorId, channel: &ChannelInfo) -> Result<()> {
        self.sensor_mut(sensor_id)?.remove_channel(channel)?;
        Ok(())
    }

    pub fn contains(&self, sensor_id: &SensorId) -> bool {
        self.sensors.iter().any(|s| s.id() == sensor_id)
    }

    pub fn sensor(&self, sensor_id: &SensorId) -> Option<&dyn Sensor> {
        self.sensors
            .iter()
            .find(|s| s.id() == sensor_id)
            .map(|s| s.as_ref())
    }

    /// Member sensors in insertion order
    pub fn sensors(&self) -> &[Box<dyn Sensor>] {
        &self.sensors
    }

    pub fn summaries(&self) -> Vec<SensorSummary> {
        self.sensors
            .iter()
            .map(|s| SensorSummary {
                id: s.id().clone(),
                channels: s.channel_keys(),
            })
            .collect()
    }

    /// Column keys of every member, sensor order then channel order
    pub fn channel_keys(&self) -> Vec<String> {
        self.sensors.iter().flat_map(|s| s.channel_keys()).collect()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Open every sensor; failures are logged and returned
    pub fn open_all(&mut self) -> Vec<SensorFailure> {
        self.for_each_port(|s| s.open(), "open")
    }

    /// Close every sensor; failures are logged and returned
    pub fn close_all(&mut self) -> Vec<SensorFailure> {
        self.for_each_port(|s| s.close(), "close")
    }

    /// Read every sensor once and merge into one row.
    ///
    /// A failing sensor contributes nothing to this tick.
    pub fn read(&mut self) -> Option<Row> {
        self.sample().row
    }

    /// Like [`Producer::read`], also reporting which sensors failed
    pub fn sample(&mut self) -> Sample {
        let tick = Utc::now();
        let mut sample = Sample::default();
        for sensor in &mut self.sensors {
            // a panicking sensor fails this tick like any read error
            let result = panic::catch_unwind(AssertUnwindSafe(|| sensor.read()))
                .unwrap_or_else(|payload| Err(SensorError::panicked(sensor.id().clone(), &*payload)));
            match result {
                Ok(Some(packet)) => {
                    let row = match sample.row.take() {
                        Some(mut row) => {
                            row.merge(packet);
                            row
                        }
                        None => Row::from(packet),
                    };
                    sample.row = Some(row);
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(sensor_id = %sensor.id(), tick = %tick, error = %error, "sensor read failed");
                    sample.failures.push(SensorFailure {
                        sensor_id: sensor.id().clone(),
                        error,
                    });
                }
            }
        }
        sample
    }

    fn sensor_mut(&mut self, sensor_id: &SensorId) -> Result<&mut Box<dyn Sensor>> {
        self.sensors
            .iter_mut()
            .find(|s| s.id() == sensor_id)
            .ok_or_else(|| ProducerError::SensorNotFound {
                sensor_id: sensor_id.clone(),
            })
    }

    fn owner_of(&self, key: &str) -> Option<&SensorId> {
        self.sensors
            .iter()
            .find(|s| s.channels().iter().any(|c| c.display() == key))
            .map(|s| s.id())
    }

    fn for_each_port(
        &mut self,
        mut op: impl FnMut(&mut dyn Sensor) -> sensors::Result<()>,
        action: &str,
    ) -> Vec<SensorFailure> {
        let mut failures = Vec::new();
        for sensor in &mut self.sensors {
            if let Err(error) = op(sensor.as_mut()) {
                warn!(sensor_id = %sensor.id(), error = %error, action, "sensor port failure");
                failures.push(SensorFailure {
                    sensor_id: sensor.id().clone(),
                    error,
                });
            }
        }
        failures
    }
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("sensors", &self.summaries())
            .finish()
    }
}
