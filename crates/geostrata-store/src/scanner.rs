//! The batch-scanner seam to the underlying sorted key-value store.
//!
//! The store internally parallelizes a batch scan across tablet servers;
//! this interface exposes a single-consumer blocking pull. Within one range
//! keys arrive in ascending byte order; across ranges no ordering is
//! promised.

use bytes::Bytes;

use geostrata_query::{ByteRange, IteratorStage};

use crate::error::Result;

/// A store key: row, column family, column qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub row: Bytes,
    pub column_family: Bytes,
    pub column_qualifier: Bytes,
}

/// One `(key, value)` pair yielded by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Key,
    pub value: Bytes,
}

/// A handle to the store's table namespace.
pub trait TabletStore: Send + Sync {
    /// Opens a batch scanner over one table.
    fn create_batch_scanner(&self, table: &str) -> Result<Box<dyn BatchScanner>>;
}

/// A live batch scan being configured and consumed.
///
/// `close` is idempotent and must release server-side resources; after it,
/// `next_entry` yields nothing.
pub trait BatchScanner: Send {
    /// Restricts the scan to the given row ranges.
    fn set_ranges(&mut self, ranges: &[ByteRange]);

    /// Fetches only the named column family (repeatable).
    fn fetch_column_family(&mut self, family: &[u8]);

    /// Installs one server-side iterator stage.
    fn add_scan_iterator(&mut self, stage: &IteratorStage);

    /// Pulls the next entry; `None` when exhausted or closed. This is the
    /// only call besides `close` that may block.
    fn next_entry(&mut self) -> Option<Result<Entry>>;

    /// Releases the scanner.
    fn close(&mut self);
}
