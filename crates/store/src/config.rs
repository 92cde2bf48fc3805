//! Store configuration

use std::path::PathBuf;
use std::time::Duration;

use contracts::StoreSettings;

/// BufferedStore configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Rows kept in memory before older rows move to the cache
    pub buffer_length: usize,

    /// Resample reads to this frequency (None = raw rows)
    pub resampling_frequency_hz: Option<f64>,

    /// Bounded queue capacity between `put` and `read`
    pub queue_capacity: usize,

    /// JSON-lines cache file (None = in-memory cache)
    pub cache_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            buffer_length: 10,
            resampling_frequency_hz: None,
            queue_capacity: 65_536,
            cache_path: None,
        }
    }
}

impl StoreConfig {
    pub fn new(buffer_length: usize, resampling_frequency_hz: Option<f64>) -> Self {
        Self {
            buffer_length,
            resampling_frequency_hz,
            ..Default::default()
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    /// Resampling bucket width, if resampling is enabled
    pub fn resampling_period(&self) -> Option<Duration> {
        self.resampling_frequency_hz
            .filter(|hz| hz.is_finite() && *hz > 0.0)
            .map(|hz| Duration::from_secs_f64(1.0 / hz))
    }
}

impl From<&StoreSettings> for StoreConfig {
    fn from(settings: &StoreSettings) -> Self {
        Self {
            buffer_length: settings.buffer_length,
            resampling_frequency_hz: settings.resampling_frequency_hz,
            queue_capacity: settings.queue_capacity,
            cache_path: settings.cache_path.clone(),
        }
    }
}
