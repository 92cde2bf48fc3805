//! DataStore trait - buffered row sink
//!
//! The sampling loop only ever calls `put`; the controlling side reads,
//! flushes and tears the cache down. Implementations provide their own
//! internal synchronization since both sides share one handle.

use crate::{ContractError, Row, Table};

/// Buffered, cached store of sampled rows
pub trait DataStore: Send + Sync {
    /// Enqueue one row.
    ///
    /// Must not block indefinitely; a full queue is reported as
    /// [`ContractError::StoreQueueFull`] and the row is dropped.
    fn put(&self, row: Row) -> Result<(), ContractError>;

    /// Drain newly enqueued rows into the in-memory table and return it
    fn read(&self) -> Result<Table, ContractError>;

    /// Commit the in-memory table to the cache and clear memory
    fn flush(&self) -> Result<(), ContractError>;

    /// Rows committed to the cache so far
    fn cached(&self) -> Result<Table, ContractError>;

    /// Release the cache
    fn delete_cache(&self) -> Result<(), ContractError>;
}
