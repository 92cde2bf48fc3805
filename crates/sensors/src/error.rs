//! Sensor error types

use contracts::{ContractError, SensorId};
use thiserror::Error;

/// Sensor specific error
#[derive(Debug, Error)]
pub enum SensorError {
    /// Sampling a channel failed
    #[error("sensor '{sensor_id}' read failed on '{channel}': {source}")]
    ReadFailed {
        sensor_id: SensorId,
        channel: String,
        #[source]
        source: GeneratorError,
    },

    /// Port open/close failure
    #[error("sensor '{sensor_id}' port error: {message}")]
    Port { sensor_id: SensorId, message: String },

    /// Channel not registered on this sensor
    #[error("channel '{channel}' is not registered on sensor '{sensor_id}'")]
    ChannelNotFound { sensor_id: SensorId, channel: String },

    /// The sensor panicked while being read
    #[error("sensor '{sensor_id}' panicked: {message}")]
    Panicked { sensor_id: SensorId, message: String },

    /// Wrapped ContractError (invalid or duplicate channel)
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl SensorError {
    /// Create port error
    pub fn port(sensor_id: SensorId, message: impl Into<String>) -> Self {
        Self::Port {
            sensor_id,
            message: message.into(),
        }
    }

    /// Create panic error from a caught panic payload
    pub fn panicked(sensor_id: SensorId, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::Panicked { sensor_id, message }
    }

    /// Create channel-not-found error
    pub fn channel_not_found(sensor_id: SensorId, channel: impl Into<String>) -> Self {
        Self::ChannelNotFound {
            sensor_id,
            channel: channel.into(),
        }
    }
}

/// Failure raised by a value generator
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct GeneratorError {
    message: String,
}

impl GeneratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, SensorError>;
