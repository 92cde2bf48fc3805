//! # Sensors
//!
//! Sensor abstraction and in-process sensor implementations.
//!
//! Responsibilities:
//! - [`Sensor`] trait: ordered channels, one packet per read
//! - [`GeneratorSensor`]: values drawn from a pluggable [`ValueGenerator`]
//! - [`SensorFactory`]: build sensors from an `AcquisitionBlueprint`

mod error;
mod factory;
pub mod generator;
mod sensor;

pub use error::{GeneratorError, Result, SensorError};
pub use factory::SensorFactory;
pub use generator::{Fallible, ValueGenerator};
pub use sensor::{GeneratorSensor, Sensor};
