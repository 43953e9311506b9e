//! Physical query plans: scan ranges, column families, and the server-side
//! iterator stack.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::keyplan::{ByteRange, ColumnFamilyPlan};
use crate::strategy::Strategy;

/// Priority bands for the iterator stack. Smaller priorities run first.
pub mod band {
    /// Row regex prefilter.
    pub const ROW_REGEX: u16 = 0;
    /// Column-family regex prefilter.
    pub const CF_REGEX: u16 = 100;
    /// Spatio-temporal coarse intersect.
    pub const ST_INTERSECT: u16 = 200;
    /// Simple-feature fine filter / projection.
    pub const FINE_FILTER: u16 = 300;
    /// Aggregation / density / temporal density.
    pub const AGGREGATION: u16 = 400;
}

/// Option keys the compilers emit. The iterator implementations live
/// elsewhere; this module owns the vocabulary.
pub mod option_key {
    pub const FEATURE_ENCODING: &str = "FEATURE_ENCODING";
    pub const ST_FILTER: &str = "ST_FILTER";
    pub const SFT: &str = "SFT";
    pub const SFT_NAME: &str = "SFT_NAME";
    pub const SFT_INDEX_VALUE: &str = "SFT_INDEX_VALUE";
    pub const ATTR_NAME: &str = "ATTR_NAME";
    pub const ECQL_FILTER: &str = "ECQL_FILTER";
    pub const TRANSFORMS: &str = "TRANSFORMS";
    pub const TRANSFORM_SCHEMA: &str = "TRANSFORM_SCHEMA";
    pub const DEFAULT_SCHEMA: &str = "DEFAULT_SCHEMA";
    pub const REGEX: &str = "regex";
    // Density-specific keys.
    pub const POLYGON: &str = "POLYGON";
    pub const WIDTH: &str = "WIDTH";
    pub const HEIGHT: &str = "HEIGHT";
    pub const INTERVAL: &str = "INTERVAL";
    pub const BUCKETS: &str = "BUCKETS";
}

/// Class names of the server-side iterators the compilers configure.
pub mod iterator_class {
    pub const ROW_REGEX: &str = "geostrata.iter.RowRegexFilter";
    pub const ST_INTERSECT: &str = "geostrata.iter.SpatioTemporalIntersect";
    pub const FINE_FILTER: &str = "geostrata.iter.SimpleFeatureFilter";
    pub const DENSITY: &str = "geostrata.iter.DensityAggregate";
    pub const TEMPORAL_DENSITY: &str = "geostrata.iter.TemporalDensityAggregate";
}

/// One configured server-side iterator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IteratorStage {
    /// Install priority; smaller runs first.
    pub priority: u16,
    /// Stage name, unique within one plan.
    pub name: String,
    /// Opaque class identifier resolved by the store.
    pub class_name: String,
    /// Pre-encoded option values (WKT, ECQL, integer text, schema strings).
    pub options: BTreeMap<String, String>,
}

/// Allocates stage names unique within one plan.
///
/// A plain counter keeps plans deterministic; uniqueness matters only within
/// a single plan.
#[derive(Debug, Default)]
pub struct StageNamer {
    next: u32,
}

impl StageNamer {
    /// Creates a namer starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produces the next name for the given stage base.
    pub fn name(&mut self, base: &str) -> String {
        let seq = self.next;
        self.next += 1;
        format!("{base}-{seq}")
    }
}

/// Which store table a scan targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableRole {
    /// The spatio-temporal index table.
    SpatioTemporal,
    /// The inverted attribute index table.
    AttributeIndex,
    /// The record table keyed by feature id.
    Records,
}

/// The follow-up scan of a two-phase plan: the first scan yields record ids
/// (in the column family), the join scan fetches them from this table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPlan {
    pub table: TableRole,
}

/// A compiled physical plan, consumed exactly once by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    /// The strategy that produced the plan.
    pub strategy: Strategy,
    /// Table the first scan targets.
    pub table: TableRole,
    /// Row ranges of the first scan. Empty means the plan matches nothing.
    pub ranges: Vec<ByteRange>,
    /// Present for two-phase (attribute index) plans.
    pub join: Option<JoinPlan>,
    /// Column families fetched by the final scan.
    pub column_families: ColumnFamilyPlan,
    /// Iterator stack installed on the final scan, in priority order.
    pub iterators: Vec<IteratorStage>,
}

impl QueryPlan {
    /// A plan that matches nothing: no ranges, no iterators.
    #[must_use]
    pub fn empty(strategy: Strategy, table: TableRole) -> Self {
        Self {
            strategy,
            table,
            ranges: Vec::new(),
            join: None,
            column_families: ColumnFamilyPlan::All,
            iterators: Vec::new(),
        }
    }

    /// True when execution can only yield zero entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Iterator stages sorted by install priority.
    #[must_use]
    pub fn ordered_iterators(&self) -> Vec<&IteratorStage> {
        let mut stages: Vec<&IteratorStage> = self.iterators.iter().collect();
        stages.sort_by_key(|s| s.priority);
        stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_namer_is_deterministic() {
        let mut namer = StageNamer::new();
        assert_eq!(namer.name("fine"), "fine-0");
        assert_eq!(namer.name("density"), "density-1");

        let mut other = StageNamer::new();
        assert_eq!(other.name("fine"), "fine-0");
    }

    #[test]
    fn test_ordered_iterators() {
        let stage = |priority: u16| IteratorStage {
            priority,
            name: format!("s{priority}"),
            class_name: "c".into(),
            options: BTreeMap::new(),
        };
        let plan = QueryPlan {
            strategy: Strategy::StIdx,
            table: TableRole::SpatioTemporal,
            ranges: vec![ByteRange::all()],
            join: None,
            column_families: ColumnFamilyPlan::All,
            iterators: vec![stage(band::FINE_FILTER), stage(band::ROW_REGEX)],
        };
        let ordered = plan.ordered_iterators();
        assert_eq!(ordered[0].priority, band::ROW_REGEX);
        assert_eq!(ordered[1].priority, band::FINE_FILTER);
    }

    #[test]
    fn test_empty_plan() {
        let plan = QueryPlan::empty(Strategy::AttrEq, TableRole::AttributeIndex);
        assert!(plan.is_empty());
        assert!(plan.iterators.is_empty());
    }
}
