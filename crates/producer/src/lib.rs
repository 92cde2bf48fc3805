//! # Producer
//!
//! Sampling core: aggregates sensors into rows and runs the sampling loop.
//!
//! Responsibilities:
//! - [`Producer`]: ordered sensor set, one merged row per read
//! - [`ProducerProcess`]: dedicated worker thread with a
//!   start/pause/join lifecycle, feeding a `DataStore`
//! - [`LoopReport`] and [`ProcessMetrics`] for run accounting
//!
//! # Example
//!
//! ```ignore
//! let process = ProducerProcess::new(ProcessConfig::new("torque"), store);
//! producer::plug_dummy_sensor(&process)?;
//! process.start()?;
//! std::thread::sleep(Duration::from_secs(1));
//! process.pause()?;
//! let report = process.join()?;
//! let table = process.read(true)?;
//! ```

mod config;
mod dummy;
mod error;
mod process;
mod producer;

pub use config::{MetricsSnapshot, ProcessConfig, ProcessMetrics};
pub use dummy::{dummy_sensor, plug_dummy_sensor, DUMMY_SENSOR_ID};
pub use error::{ProducerError, Result};
pub use process::{LoopExit, LoopReport, ProcessState, ProducerProcess};
pub use producer::{Producer, Sample, SensorFailure, SensorSummary};
