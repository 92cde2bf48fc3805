//! Acquisition metrics
//!
//! `record_*` helpers publish through the `metrics` facade; without an
//! installed recorder they are no-ops. [`TableSummary`] aggregates a read
//! table into per-channel statistics for reporting.

use std::collections::BTreeMap;

use contracts::Table;
use metrics::{counter, gauge, histogram};

/// One sampling tick completed
pub fn record_tick(process: &str, duration_ms: f64) {
    counter!("daq_producer_ticks_total", "process" => process.to_string()).increment(1);
    histogram!("daq_producer_tick_duration_ms", "process" => process.to_string())
        .record(duration_ms);
}

/// One row accepted by the store
pub fn record_row_put(process: &str) {
    counter!("daq_producer_rows_put_total", "process" => process.to_string()).increment(1);
}

/// Sensor read failed and was isolated
pub fn record_sensor_failure(process: &str, sensor_id: &str) {
    counter!(
        "daq_producer_sensor_failures_total",
        "process" => process.to_string(),
        "sensor_id" => sensor_id.to_string()
    )
    .increment(1);
}

/// Store rejected a row
pub fn record_store_failure(process: &str) {
    counter!("daq_producer_store_failures_total", "process" => process.to_string()).increment(1);
}

/// Process lifecycle transition
pub fn record_state(process: &str, state: &str) {
    counter!(
        "daq_producer_transitions_total",
        "process" => process.to_string(),
        "state" => state.to_string()
    )
    .increment(1);
}

/// Rows waiting in the store queue
pub fn record_store_queue_len(len: usize) {
    gauge!("daq_store_queue_len").set(len as f64);
}

/// Rows held in the store's in-memory table
pub fn record_store_memory_rows(rows: usize) {
    gauge!("daq_store_memory_rows").set(rows as f64);
}

/// Rows committed to the cache by a flush
pub fn record_store_flush(rows: usize) {
    counter!("daq_store_flushes_total").increment(1);
    counter!("daq_store_rows_flushed_total").increment(rows as u64);
}

/// Per-channel statistics of a table
#[derive(Debug, Clone, Default)]
pub struct TableSummary {
    pub rows: usize,
    /// Seconds between first and last row
    pub span_seconds: f64,
    /// Intervals between consecutive rows (ms)
    pub interval_ms: StatsSummary,
    /// Column key -> statistics over finite values
    pub channels: BTreeMap<String, StatsSummary>,
    /// Column key -> NaN or missing cells
    pub missing: BTreeMap<String, u64>,
}

impl TableSummary {
    pub fn from_table(table: &Table) -> Self {
        let elapsed = match table.timestamps().first() {
            Some(t0) => table.elapsed_seconds(*t0),
            None => Vec::new(),
        };
        let span_seconds = elapsed.last().copied().unwrap_or(0.0);

        let mut intervals = RunningStats::default();
        for pair in elapsed.windows(2) {
            intervals.push((pair[1] - pair[0]) * 1000.0);
        }

        let mut channels = BTreeMap::new();
        let mut missing = BTreeMap::new();
        for key in table.columns() {
            let mut stats = RunningStats::default();
            let mut gaps = 0;
            for value in table.column(key) {
                match value {
                    Some(v) if v.is_finite() => stats.push(v),
                    _ => gaps += 1,
                }
            }
            channels.insert(key.clone(), StatsSummary::from(&stats));
            missing.insert(key.clone(), gaps);
        }

        Self {
            rows: table.len(),
            span_seconds,
            interval_ms: StatsSummary::from(&intervals),
            channels,
            missing,
        }
    }
}

impl std::fmt::Display for TableSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Acquisition Summary ===")?;
        writeln!(f, "Rows: {} over {:.3}s", self.rows, self.span_seconds)?;
        writeln!(f, "Row interval (ms): {}", self.interval_ms)?;
        for (key, stats) in &self.channels {
            let gaps = self.missing.get(key).copied().unwrap_or(0);
            writeln!(f, "  {key}: {stats} missing={gaps}")?;
        }
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
