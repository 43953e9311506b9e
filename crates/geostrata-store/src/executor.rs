//! Binds compiled plans onto live scanners.
//!
//! Single-phase plans configure one scanner. Two-phase plans first drain the
//! attribute index scan, materializing the record ids carried in its column
//! families, then scan the record table with one exact range per id. All
//! scanners are released on every exit path of the result stream.

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use geostrata_core::config::TableCatalog;
use geostrata_query::{ByteRange, ColumnFamilyPlan, QueryPlan, TableRole};

use crate::error::Result;
use crate::scanner::{BatchScanner, Entry, TabletStore};

/// Executes query plans against a store.
pub struct PlanExecutor {
    store: Arc<dyn TabletStore>,
    catalog: TableCatalog,
}

impl PlanExecutor {
    /// Creates an executor over a store and a resolved table catalog.
    #[must_use]
    pub fn new(store: Arc<dyn TabletStore>, catalog: TableCatalog) -> Self {
        Self { store, catalog }
    }

    fn table_name(&self, role: TableRole) -> &str {
        match role {
            TableRole::SpatioTemporal => &self.catalog.spatio_temporal,
            TableRole::AttributeIndex => &self.catalog.attribute_index,
            TableRole::Records => &self.catalog.records,
        }
    }

    /// Binds a plan and returns the lazy entry stream.
    ///
    /// A plan with no ranges yields an already-exhausted stream without
    /// touching the store.
    pub fn execute(&self, plan: &QueryPlan) -> Result<EntryStream> {
        if plan.is_empty() {
            return Ok(EntryStream::empty());
        }

        let ranges = match &plan.join {
            None => plan.ranges.clone(),
            Some(_) => {
                let Some(ranges) = self.collect_join_ranges(plan)? else {
                    return Ok(EntryStream::empty());
                };
                ranges
            }
        };

        let table = plan
            .join
            .map_or(plan.table, |join| join.table);
        let mut scanner = self.store.create_batch_scanner(self.table_name(table))?;
        scanner.set_ranges(&ranges);
        if let ColumnFamilyPlan::List(families) = &plan.column_families {
            for family in families {
                scanner.fetch_column_family(family);
            }
        }
        for stage in plan.ordered_iterators() {
            scanner.add_scan_iterator(stage);
        }

        debug!(
            strategy = ?plan.strategy,
            ranges = ranges.len(),
            iterators = plan.iterators.len(),
            "bound query plan"
        );

        Ok(EntryStream::new(scanner))
    }

    /// Runs the first phase of a two-phase plan, returning one exact range
    /// per distinct record id, or `None` when the index scan matched
    /// nothing.
    fn collect_join_ranges(&self, plan: &QueryPlan) -> Result<Option<Vec<ByteRange>>> {
        let mut scanner = self.store.create_batch_scanner(self.table_name(plan.table))?;
        scanner.set_ranges(&plan.ranges);

        let mut ids: BTreeSet<Bytes> = BTreeSet::new();
        let mut failure = None;
        while let Some(entry) = scanner.next_entry() {
            match entry {
                Ok(entry) => {
                    ids.insert(entry.key.column_family);
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }
        scanner.close();
        if let Some(err) = failure {
            return Err(err);
        }

        debug!(ids = ids.len(), "materialized attribute index matches");
        if ids.is_empty() {
            return Ok(None);
        }
        Ok(Some(ids.into_iter().map(ByteRange::exact_row).collect()))
    }
}

/// A lazy, closeable sequence of scan entries.
///
/// Dropping the stream releases the underlying scanner; `close` may also be
/// called explicitly and is idempotent.
pub struct EntryStream {
    scanner: Option<Box<dyn BatchScanner>>,
}

impl EntryStream {
    fn new(scanner: Box<dyn BatchScanner>) -> Self {
        Self {
            scanner: Some(scanner),
        }
    }

    /// A stream that yields nothing and holds no resources.
    #[must_use]
    pub fn empty() -> Self {
        Self { scanner: None }
    }

    /// Releases the underlying scanner. Safe to call more than once, and
    /// safe after an error from the scan.
    pub fn close(&mut self) {
        if let Some(mut scanner) = self.scanner.take() {
            scanner.close();
        }
    }
}

impl Iterator for EntryStream {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        let scanner = self.scanner.as_mut()?;
        match scanner.next_entry() {
            Some(entry) => Some(entry),
            None => {
                self.close();
                None
            }
        }
    }
}

impl Drop for EntryStream {
    fn drop(&mut self) {
        self.close();
    }
}
