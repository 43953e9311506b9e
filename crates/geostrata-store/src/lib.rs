//! Store bindings for GeoStrata: the batch-scanner seam, the plan executor
//! adapter, and an in-memory backend for testing.

pub mod error;
pub mod executor;
pub mod memory;
pub mod scanner;

pub use error::{Error, Result};
pub use executor::{EntryStream, PlanExecutor};
pub use memory::{MemoryStore, ScanRecord};
pub use scanner::{BatchScanner, Entry, Key, TabletStore};
