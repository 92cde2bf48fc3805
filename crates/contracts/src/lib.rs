//! # Contracts
//!
//! Frozen interface contracts shared by every acquisition crate.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Data Model
//! - [`ChannelInfo`] names one measurement stream; its display form
//!   `"{name} ({unit})"` is the column key used everywhere.
//! - [`Packet`] is one sensor sample, [`Row`] the merged sample of one tick,
//!   [`Table`] an ordered collection of rows with a stable column layout.
//! - [`DataStore`] is the buffered row sink fed by the sampling loop.
//!
//! ## Time Model
//! - Wall-clock UTC timestamps (`chrono::DateTime<Utc>`), captured once per
//!   sensor read.

mod blueprint;
mod channel;
mod error;
mod packet;
mod sensor_id;
mod store;
mod table;

pub use blueprint::*;
pub use channel::ChannelInfo;
pub use error::*;
pub use packet::{Packet, Row, Timestamp};
pub use sensor_id::SensorId;
pub use store::DataStore;
pub use table::Table;
