//! BufferedStore - bounded queue in front of a rolling in-memory table
//!
//! `put` never blocks: rows go through a bounded queue and a full queue
//! rejects the row. `read` drains the queue into memory. Memory holds at most
//! `buffer_length` rows after a read; older rows move to the cache.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use contracts::{ContractError, DataStore, Row, Table};
use tracing::{debug, instrument, warn};

use crate::cache::{CacheBackend, JsonLinesCache, MemoryCache};
use crate::config::StoreConfig;
use crate::metrics::StoreMetrics;

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Queue-backed [`DataStore`] with a memory or JSON-lines cache
pub struct BufferedStore {
    config: StoreConfig,
    tx: Sender<Row>,
    rx: Receiver<Row>,
    memory: Mutex<Table>,
    cache: Mutex<Box<dyn CacheBackend>>,
    metrics: Arc<StoreMetrics>,
}

impl BufferedStore {
    /// Create a store; the cache backend follows `config.cache_path`
    pub fn new(config: StoreConfig) -> Self {
        let cache: Box<dyn CacheBackend> = match &config.cache_path {
            Some(path) => Box::new(JsonLinesCache::new(path)),
            None => Box::new(MemoryCache::new()),
        };
        Self::with_cache(config, cache)
    }

    pub fn with_cache(config: StoreConfig, cache: Box<dyn CacheBackend>) -> Self {
        let (tx, rx) = bounded(config.queue_capacity.max(1));
        Self {
            config,
            tx,
            rx,
            memory: Mutex::new(Table::new()),
            cache: Mutex::new(cache),
            metrics: Arc::new(StoreMetrics::new()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<StoreMetrics> {
        &self.metrics
    }

    /// Move queued rows into memory; caller holds the memory lock
    fn drain_queue(&self, memory: &mut Table) -> Result<usize, ContractError> {
        let mut drained = 0;
        loop {
            match self.rx.try_recv() {
                Ok(row) => {
                    memory.push(row);
                    drained += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Closed) => return Err(ContractError::StoreClosed),
            }
        }
        self.metrics.set_queue_len(self.rx.len());
        Ok(drained)
    }

    /// Commit the oldest rows so that at most `keep` remain in memory
    fn commit_overflow(&self, memory: &mut Table, keep: usize) -> Result<(), ContractError> {
        if memory.len() <= keep {
            return Ok(());
        }
        // memory stays intact until the cache accepted the rows
        let split = memory.len() - keep;
        lock(&self.cache).append(&memory.rows()[..split])?;
        self.metrics.record_flush(split);
        debug!(committed = split, retained = keep, "rows committed to cache");

        let retained = std::mem::take(memory).into_rows().split_off(split);
        *memory = Table::from_rows(retained);
        Ok(())
    }

    fn view(&self, table: Table) -> Table {
        match self.config.resampling_period() {
            Some(period) => table.resample(period),
            None => table,
        }
    }
}

impl DataStore for BufferedStore {
    fn put(&self, row: Row) -> Result<(), ContractError> {
        match self.tx.try_send(row) {
            Ok(()) => {
                self.metrics.inc_enqueued();
                self.metrics.set_queue_len(self.tx.len());
                Ok(())
            }
            Err(TrySendError::Full(row)) => {
                self.metrics.inc_dropped();
                warn!(timestamp = %row.timestamp, capacity = self.config.queue_capacity, "store queue full, row dropped");
                Err(ContractError::StoreQueueFull {
                    capacity: self.config.queue_capacity,
                })
            }
            Err(TrySendError::Closed(_)) => Err(ContractError::StoreClosed),
        }
    }

    #[instrument(name = "store_read", skip(self))]
    fn read(&self) -> Result<Table, ContractError> {
        let mut memory = lock(&self.memory);
        self.drain_queue(&mut memory)?;
        self.commit_overflow(&mut memory, self.config.buffer_length)?;
        observability::record_store_memory_rows(memory.len());
        Ok(self.view(memory.clone()))
    }

    #[instrument(name = "store_flush", skip(self))]
    fn flush(&self) -> Result<(), ContractError> {
        let mut memory = lock(&self.memory);
        self.drain_queue(&mut memory)?;
        self.commit_overflow(&mut memory, 0)?;
        observability::record_store_memory_rows(0);
        Ok(())
    }

    fn cached(&self) -> Result<Table, ContractError> {
        let table = lock(&self.cache).load()?;
        Ok(self.view(table))
    }

    #[instrument(name = "store_delete_cache", skip(self))]
    fn delete_cache(&self) -> Result<(), ContractError> {
        lock(&self.cache).delete()
    }
}

impl std::fmt::Debug for BufferedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedStore")
            .field("config", &self.config)
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::thread;

    fn row(ms: i64, value: f64) -> Row {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut row = Row::new(t0 + Duration::milliseconds(ms));
        row.insert("torque (Nm)".into(), value);
        row
    }

    fn values(table: &Table) -> Vec<f64> {
        table.column("torque (Nm)").into_iter().flatten().collect()
    }

    #[test]
    fn test_put_then_read() {
        let store = BufferedStore::new(StoreConfig::new(10, None));
        assert!(store.read().unwrap().is_empty());

        store.put(row(0, 1.0)).unwrap();
        store.put(row(10, 2.0)).unwrap();
        assert_eq!(store.metrics().queue_len(), 2);

        let table = store.read().unwrap();
        assert_eq!(values(&table), vec![1.0, 2.0]);
        assert_eq!(store.metrics().queue_len(), 0);

        // reading again returns the same in-memory rows
        assert_eq!(store.read().unwrap().len(), 2);
    }

    #[test]
    fn test_full_queue_rejects_row() {
        let store = BufferedStore::new(StoreConfig::new(10, None).with_queue_capacity(2));
        store.put(row(0, 1.0)).unwrap();
        store.put(row(1, 2.0)).unwrap();

        let err = store.put(row(2, 3.0)).unwrap_err();
        assert!(matches!(err, ContractError::StoreQueueFull { capacity: 2 }));
        assert!(err.is_store_failure());
        assert_eq!(store.metrics().snapshot().rows_dropped, 1);

        // draining frees capacity
        store.read().unwrap();
        store.put(row(3, 4.0)).unwrap();
    }

    #[test]
    fn test_overflow_moves_oldest_rows_to_cache() {
        let store = BufferedStore::new(StoreConfig::new(3, None));
        for i in 0..5 {
            store.put(row(i * 10, i as f64)).unwrap();
        }

        let memory = store.read().unwrap();
        assert_eq!(values(&memory), vec![2.0, 3.0, 4.0]);
        assert_eq!(values(&store.cached().unwrap()), vec![0.0, 1.0]);
        assert_eq!(store.metrics().snapshot().rows_flushed, 2);
    }

    #[test]
    fn test_flush_commits_everything() {
        let store = BufferedStore::new(StoreConfig::new(10, None));
        store.put(row(0, 1.0)).unwrap();
        store.read().unwrap();
        store.put(row(10, 2.0)).unwrap();

        store.flush().unwrap();
        assert!(store.read().unwrap().is_empty());
        assert_eq!(values(&store.cached().unwrap()), vec![1.0, 2.0]);

        store.delete_cache().unwrap();
        assert!(store.cached().unwrap().is_empty());
    }

    #[test]
    fn test_resampled_reads() {
        let store = BufferedStore::new(StoreConfig::new(100, Some(10.0)));
        // two rows per 100 ms bucket
        for (ms, v) in [(0, 1.0), (50, 3.0), (100, 10.0), (150, f64::NAN)] {
            store.put(row(ms, v)).unwrap();
        }

        let table = store.read().unwrap();
        assert_eq!(values(&table), vec![2.0, 10.0]);
    }

    #[test]
    fn test_json_lines_cache_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.jsonl");
        let store = BufferedStore::new(StoreConfig::new(2, None).with_cache_path(&path));

        for i in 0..4 {
            store.put(row(i, i as f64)).unwrap();
        }
        store.read().unwrap();
        assert!(path.exists());
        assert_eq!(values(&store.cached().unwrap()), vec![0.0, 1.0]);

        store.delete_cache().unwrap();
        assert!(!path.exists());
    }

    /// Cache that rejects appends while `failing` is set
    struct SwitchableCache {
        failing: Arc<std::sync::atomic::AtomicBool>,
        inner: MemoryCache,
    }

    impl CacheBackend for SwitchableCache {
        fn append(&mut self, rows: &[Row]) -> Result<(), ContractError> {
            if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(ContractError::store_cache("disk full"));
            }
            self.inner.append(rows)
        }

        fn load(&self) -> Result<Table, ContractError> {
            self.inner.load()
        }

        fn delete(&mut self) -> Result<(), ContractError> {
            self.inner.delete()
        }
    }

    #[test]
    fn test_failed_commit_keeps_rows_in_memory() {
        let failing = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let cache = SwitchableCache {
            failing: Arc::clone(&failing),
            inner: MemoryCache::new(),
        };
        let store = BufferedStore::with_cache(StoreConfig::new(2, None), Box::new(cache));
        for i in 0..5 {
            store.put(row(i * 10, i as f64)).unwrap();
        }

        assert!(store.read().is_err());
        assert!(store.flush().is_err());
        assert_eq!(store.metrics().snapshot().rows_flushed, 0);

        // once the cache recovers nothing is missing
        failing.store(false, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(values(&store.read().unwrap()), vec![3.0, 4.0]);
        assert_eq!(values(&store.cached().unwrap()), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_unwritable_cache_path_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, "").unwrap();
        let store =
            BufferedStore::new(StoreConfig::new(2, None).with_cache_path(file.join("cache.jsonl")));
        for i in 0..5 {
            store.put(row(i, i as f64)).unwrap();
        }

        assert!(store.read().is_err());
        // the rows are retried on the next read instead of being dropped
        assert!(store.read().is_err());
        assert_eq!(store.metrics().snapshot().rows_flushed, 0);
    }

    #[test]
    fn test_concurrent_put_and_read() {
        let store = Arc::new(BufferedStore::new(StoreConfig::new(50, None)));
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..500 {
                    store.put(row(i, i as f64)).unwrap();
                }
            })
        };
        for _ in 0..20 {
            store.read().unwrap();
        }
        writer.join().unwrap();

        let all = Table::concat([store.cached().unwrap(), store.read().unwrap()]);
        let expected: Vec<f64> = (0..500).map(|i| i as f64).collect();
        assert_eq!(values(&all), expected);
    }
}
