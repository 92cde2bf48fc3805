//! # Store
//!
//! [`BufferedStore`]: the `DataStore` fed by the sampling loop.
//!
//! - non-blocking `put` through a bounded queue
//! - rolling in-memory table of `buffer_length` rows
//! - memory or JSON-lines cache for older rows
//! - optional resampling of reads

mod buffered;
mod cache;
mod config;
mod metrics;

pub use buffered::BufferedStore;
pub use cache::{CacheBackend, JsonLinesCache, MemoryCache};
pub use config::StoreConfig;
pub use metrics::{StoreMetrics, StoreMetricsSnapshot};
