//! Store metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for one store
#[derive(Debug, Default)]
pub struct StoreMetrics {
    /// Rows waiting in the queue
    queue_len: AtomicUsize,
    /// Rows accepted by `put`
    rows_enqueued: AtomicU64,
    /// Rows rejected because the queue was full
    rows_dropped: AtomicU64,
    /// Commits to the cache (explicit and implicit)
    flushes: AtomicU64,
    /// Rows committed to the cache
    rows_flushed: AtomicU64,
}

impl StoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
        observability::record_store_queue_len(len);
    }

    pub fn inc_enqueued(&self) {
        self.rows_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dropped(&self) {
        self.rows_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self, rows: usize) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.rows_flushed.fetch_add(rows as u64, Ordering::Relaxed);
        observability::record_store_flush(rows);
    }

    pub fn snapshot(&self) -> StoreMetricsSnapshot {
        StoreMetricsSnapshot {
            queue_len: self.queue_len(),
            rows_enqueued: self.rows_enqueued.load(Ordering::Relaxed),
            rows_dropped: self.rows_dropped.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            rows_flushed: self.rows_flushed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of store metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreMetricsSnapshot {
    pub queue_len: usize,
    pub rows_enqueued: u64,
    pub rows_dropped: u64,
    pub flushes: u64,
    pub rows_flushed: u64,
}
