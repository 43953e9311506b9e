//! In-memory store backend for testing.
//!
//! Tables are `BTreeMap`s keyed by `(row, family, qualifier)`, so scans see
//! ascending key order the way a real tablet server would surface it. The
//! backend honors ranges and fetched column families and records installed
//! iterator stages into a scan log for assertions; it does not execute
//! server-side iterator semantics.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

use geostrata_query::{ByteRange, IteratorStage};

use crate::error::{Error, Result};
use crate::scanner::{BatchScanner, Entry, Key, TabletStore};

type EntryKey = (Bytes, Bytes, Bytes);
type Table = BTreeMap<EntryKey, Bytes>;

/// One configured scan, as seen by the backend.
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub table: String,
    pub ranges: Vec<ByteRange>,
    pub column_families: Vec<Bytes>,
    /// `(priority, class name)` of each installed stage, in install order.
    pub iterators: Vec<(u16, String)>,
}

/// In-memory store backend (for testing).
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, Table>>>,
    scan_log: Arc<Mutex<Vec<ScanRecord>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table.
    pub fn create_table(&self, name: impl Into<String>) {
        self.tables.write().entry(name.into()).or_default();
    }

    /// Writes one entry, creating the table if needed.
    pub fn put(
        &self,
        table: &str,
        row: impl Into<Bytes>,
        family: impl Into<Bytes>,
        qualifier: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) {
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .insert((row.into(), family.into(), qualifier.into()), value.into());
    }

    /// Every scan configured so far.
    #[must_use]
    pub fn scan_log(&self) -> Vec<ScanRecord> {
        self.scan_log.lock().clone()
    }
}

impl TabletStore for MemoryStore {
    fn create_batch_scanner(&self, table: &str) -> Result<Box<dyn BatchScanner>> {
        if !self.tables.read().contains_key(table) {
            return Err(Error::store(format!("table `{table}` does not exist")));
        }
        Ok(Box::new(MemoryScanner {
            tables: Arc::clone(&self.tables),
            scan_log: Arc::clone(&self.scan_log),
            table: table.to_string(),
            ranges: vec![ByteRange::all()],
            families: Vec::new(),
            stages: Vec::new(),
            drained: None,
            closed: false,
        }))
    }
}

struct MemoryScanner {
    tables: Arc<RwLock<HashMap<String, Table>>>,
    scan_log: Arc<Mutex<Vec<ScanRecord>>>,
    table: String,
    ranges: Vec<ByteRange>,
    families: Vec<Bytes>,
    stages: Vec<IteratorStage>,
    drained: Option<std::vec::IntoIter<Entry>>,
    closed: bool,
}

impl MemoryScanner {
    fn materialize(&self) -> Vec<Entry> {
        let tables = self.tables.read();
        let Some(table) = tables.get(&self.table) else {
            return Vec::new();
        };
        table
            .iter()
            .filter(|((row, family, _), _)| {
                self.ranges.iter().any(|r| r.contains_row(row))
                    && (self.families.is_empty() || self.families.contains(family))
            })
            .map(|((row, family, qualifier), value)| Entry {
                key: Key {
                    row: row.clone(),
                    column_family: family.clone(),
                    column_qualifier: qualifier.clone(),
                },
                value: value.clone(),
            })
            .collect()
    }
}

impl BatchScanner for MemoryScanner {
    fn set_ranges(&mut self, ranges: &[ByteRange]) {
        self.ranges = ranges.to_vec();
    }

    fn fetch_column_family(&mut self, family: &[u8]) {
        self.families.push(Bytes::copy_from_slice(family));
    }

    fn add_scan_iterator(&mut self, stage: &IteratorStage) {
        self.stages.push(stage.clone());
    }

    fn next_entry(&mut self) -> Option<Result<Entry>> {
        if self.closed {
            return None;
        }
        if self.drained.is_none() {
            self.scan_log.lock().push(ScanRecord {
                table: self.table.clone(),
                ranges: self.ranges.clone(),
                column_families: self.families.clone(),
                iterators: self
                    .stages
                    .iter()
                    .map(|s| (s.priority, s.class_name.clone()))
                    .collect(),
            });
            self.drained = Some(self.materialize().into_iter());
        }
        self.drained.as_mut()?.next().map(Ok)
    }

    fn close(&mut self) {
        self.closed = true;
        self.drained = None;
    }
}
