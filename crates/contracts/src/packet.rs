//! Packet and Row - sampled data units
//!
//! A `Packet` is what one sensor produces on one read. A `Row` is what one
//! sampling tick hands to the store: the union of every contributing packet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SensorId;

/// Wall-clock sample timestamp
pub type Timestamp = DateTime<Utc>;

/// One sensor sample
///
/// All values share a single timestamp captured when the read began.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Producing sensor
    pub sensor_id: SensorId,

    /// Sample instant
    pub timestamp: Timestamp,

    /// Channel key -> value, in channel registration order
    pub values: Vec<(String, f64)>,
}

impl Packet {
    pub fn new(sensor_id: SensorId, timestamp: Timestamp, values: Vec<(String, f64)>) -> Self {
        Self {
            sensor_id,
            timestamp,
            values,
        }
    }

    /// Column keys carried by this packet
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(key, _)| key.as_str())
    }

    /// Value for a channel key
    pub fn value(&self, key: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Tabular projection: exactly one row with this packet's columns
    pub fn to_row(&self) -> Row {
        Row {
            timestamp: self.timestamp,
            values: self.values.clone(),
        }
    }
}

/// One tick worth of merged samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Row instant (earliest contributing packet)
    pub timestamp: Timestamp,

    /// Channel key -> value, in sensor order then channel order
    pub values: Vec<(String, f64)>,
}

impl Row {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            values: Vec::new(),
        }
    }

    /// Merge a packet into this row.
    ///
    /// The row keeps the earliest timestamp. A key already present is
    /// overwritten in place, keeping its column position.
    pub fn merge(&mut self, packet: Packet) {
        if packet.timestamp < self.timestamp {
            self.timestamp = packet.timestamp;
        }
        for (key, value) in packet.values {
            self.insert(key, value);
        }
    }

    /// Set a column value
    pub fn insert(&mut self, key: String, value: f64) {
        match self.values.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.values.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Packet> for Row {
    fn from(packet: Packet) -> Self {
        Self {
            timestamp: packet.timestamp,
            values: packet.values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn packet(sensor: &str, at: Timestamp, values: &[(&str, f64)]) -> Packet {
        Packet::new(
            sensor.into(),
            at,
            values.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        )
    }

    #[test]
    fn test_packet_projection_keeps_channel_order() {
        let now = Utc::now();
        let p = packet("s1", now, &[("torque (Nm)", 1.0), ("load (N)", 2.0)]);
        let row = p.to_row();

        assert_eq!(row.timestamp, now);
        assert_eq!(
            row.columns().collect::<Vec<_>>(),
            vec!["torque (Nm)", "load (N)"]
        );
        assert_eq!(row.get("load (N)"), Some(2.0));
    }

    #[test]
    fn test_merge_unions_columns_and_keeps_earliest_timestamp() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::milliseconds(3);

        let mut row: Row = packet("a", t1, &[("torque (Nm)", 1.0)]).into();
        row.merge(packet("b", t0, &[("extension (mm)", 0.5)]));

        assert_eq!(row.timestamp, t0);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("extension (mm)"), Some(0.5));
    }

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut row = Row::new(Utc::now());
        row.insert("a (x)".into(), 1.0);
        row.insert("b (x)".into(), 2.0);
        row.insert("a (x)".into(), 3.0);

        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["a (x)", "b (x)"]);
        assert_eq!(row.get("a (x)"), Some(3.0));
    }
}
