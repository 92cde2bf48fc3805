//! Producer error types

use std::time::Duration;

use contracts::{ContractError, SensorId};
use sensors::SensorError;
use thiserror::Error;

use crate::process::ProcessState;

/// Producer / process error
#[derive(Debug, Error)]
pub enum ProducerError {
    /// Lifecycle operation not allowed in the current state
    #[error("process '{process}': cannot {operation} while {state}")]
    InvalidState {
        process: String,
        state: ProcessState,
        operation: &'static str,
    },

    /// Sensor refused to join the active set
    #[error("sensor '{sensor_id}' failed its self test")]
    SelfTestFailed { sensor_id: SensorId },

    /// Sensor is not a member of the producer
    #[error("sensor '{sensor_id}' is not registered")]
    SensorNotFound { sensor_id: SensorId },

    /// Worker did not exit within the join timeout; it has been detached
    #[error("process '{process}' did not stop within {timeout:?}")]
    Unresponsive { process: String, timeout: Duration },

    /// Worker thread panicked
    #[error("process '{process}' worker panicked")]
    WorkerPanicked { process: String },

    /// Worker thread could not be spawned
    #[error("failed to spawn worker for '{process}': {source}")]
    Spawn {
        process: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl ProducerError {
    pub fn invalid_state(
        process: impl Into<String>,
        state: ProcessState,
        operation: &'static str,
    ) -> Self {
        Self::InvalidState {
            process: process.into(),
            state,
            operation,
        }
    }

    /// True for duplicate channel keys, whether raised by the sensor or the producer
    pub fn is_duplicate_channel(&self) -> bool {
        matches!(
            self,
            Self::Contract(ContractError::DuplicateChannel { .. })
                | Self::Sensor(SensorError::Contract(ContractError::DuplicateChannel { .. }))
        )
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ProducerError>;
