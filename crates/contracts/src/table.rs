//! Table - ordered rows with a stable column layout

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Row, Timestamp};

/// Tabular view over sampled rows.
///
/// Columns are the union of row keys in first-seen order, so the layout is
/// deterministic for a given row sequence. Rows missing a column read as
/// `None` for that column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from rows, preserving their order
    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> Self {
        let mut table = Self::new();
        table.extend(rows);
        table
    }

    /// Append a row, registering any new columns
    pub fn push(&mut self, row: Row) {
        for key in row.columns() {
            if !self.columns.iter().any(|c| c == key) {
                self.columns.push(key.to_string());
            }
        }
        self.rows.push(row);
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = Row>) {
        for row in rows {
            self.push(row);
        }
    }

    /// Append all rows of `other` after the rows of `self`
    pub fn append(&mut self, other: Table) {
        self.extend(other.rows);
    }

    /// Concatenate tables in order
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Self {
        let mut out = Self::new();
        for table in tables {
            out.append(table);
        }
        out
    }

    /// True when the table holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row count
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn contains_column(&self, key: &str) -> bool {
        self.columns.iter().any(|c| c == key)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Values of one column, `None` where a row lacks it
    pub fn column(&self, key: &str) -> Vec<Option<f64>> {
        self.rows.iter().map(|row| row.get(key)).collect()
    }

    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.rows.iter().map(|row| row.timestamp).collect()
    }

    /// Seconds elapsed between `t0` and each row timestamp
    pub fn elapsed_seconds(&self, t0: Timestamp) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| seconds_between(t0, row.timestamp))
            .collect()
    }

    pub fn clear(&mut self) {
        self.columns.clear();
        self.rows.clear();
    }

    /// Downsample into fixed `period` buckets aligned to the Unix epoch.
    ///
    /// Each bucket becomes one row stamped with the bucket start; every column
    /// is the mean of its non-NaN values in the bucket (NaN if it had none).
    /// A zero period returns the table unchanged. Rows whose timestamp does
    /// not fit in i64 nanoseconds are left out.
    pub fn resample(&self, period: Duration) -> Table {
        let period_ns = i64::try_from(period.as_nanos()).unwrap_or(i64::MAX);
        if period_ns <= 0 || self.rows.is_empty() {
            return self.clone();
        }

        // bucket index -> (key, sum, count) in first-seen order
        let mut buckets: BTreeMap<i64, Vec<(String, f64, u32)>> = BTreeMap::new();
        for row in &self.rows {
            let Some(ns) = row.timestamp.timestamp_nanos_opt() else {
                continue;
            };
            let bucket = buckets.entry(ns.div_euclid(period_ns)).or_default();
            for (key, value) in &row.values {
                let idx = match bucket.iter().position(|(k, ..)| k == key) {
                    Some(idx) => idx,
                    None => {
                        bucket.push((key.clone(), 0.0, 0));
                        bucket.len() - 1
                    }
                };
                if !value.is_nan() {
                    bucket[idx].1 += value;
                    bucket[idx].2 += 1;
                }
            }
        }

        let mut out = Table::new();
        for (index, accumulators) in buckets {
            // first bucket may start before the representable range
            let Some(start) = index.checked_mul(period_ns) else {
                continue;
            };
            let mut row = Row::new(DateTime::<Utc>::from_timestamp_nanos(start));
            for (key, sum, count) in accumulators {
                let mean = if count > 0 { sum / count as f64 } else { f64::NAN };
                row.insert(key, mean);
            }
            out.push(row);
        }
        // keep the original column order
        out.columns = self.columns.clone();
        out
    }
}

fn seconds_between(t0: Timestamp, t: Timestamp) -> f64 {
    let delta = t - t0;
    match delta.num_nanoseconds() {
        Some(ns) => ns as f64 / 1e9,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}
