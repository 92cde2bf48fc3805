//! Process configuration and metrics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use contracts::ProcessSettings;
use serde::Serialize;

/// Sampling process configuration
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Process name (log and metric label)
    pub name: String,

    /// Fixed tick period
    pub sampling_period: Duration,

    /// Consecutive store failures before the loop aborts
    pub max_consecutive_store_failures: u32,

    /// Bounded wait used by callers that prefer `join_timeout`
    pub join_timeout: Option<Duration>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            name: "producer".to_string(),
            sampling_period: Duration::from_millis(10),
            max_consecutive_store_failures: 10,
            join_timeout: None,
        }
    }
}

impl ProcessConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_sampling_period(mut self, period: Duration) -> Self {
        self.sampling_period = period;
        self
    }

    pub fn with_max_consecutive_store_failures(mut self, max: u32) -> Self {
        self.max_consecutive_store_failures = max;
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = Some(timeout);
        self
    }
}

impl From<&ProcessSettings> for ProcessConfig {
    fn from(settings: &ProcessSettings) -> Self {
        Self {
            name: settings.name.clone(),
            sampling_period: settings.sampling_period(),
            max_consecutive_store_failures: settings.max_consecutive_store_failures,
            join_timeout: settings.join_timeout(),
        }
    }
}

/// Sampling loop counters, shared between worker and controller
#[derive(Debug, Default)]
pub struct ProcessMetrics {
    ticks: AtomicU64,
    rows_put: AtomicU64,
    sensor_failures: AtomicU64,
    store_failures: AtomicU64,
}

impl ProcessMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_row_put(&self) {
        self.rows_put.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sensor_failure(&self) {
        self.sensor_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            rows_put: self.rows_put.load(Ordering::Relaxed),
            sensor_failures: self.sensor_failures.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub rows_put: u64,
    pub sensor_failures: u64,
    pub store_failures: u64,
}
