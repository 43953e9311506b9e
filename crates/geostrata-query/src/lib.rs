//! Strategy decision and plan compilation for GeoStrata queries.
//!
//! Given a logical filter over a typed feature schema, the planner picks one
//! physical access strategy, compiles it into scan ranges, column families,
//! and a prioritized server-side iterator stack, and hands the resulting
//! plan to the executor in `geostrata-store`.

pub mod cardinality;
pub mod decide;
pub mod extract;
pub mod grammar;
pub mod hints;
pub mod keyplan;
pub mod normalize;
pub mod plan;
pub mod planner;
pub mod strategy;

pub use decide::{canonicalize, choose_strategy};
pub use extract::{extract, net_interval, net_polygon, SpaceTimeQuery};
pub use grammar::{GridGrammar, IndexGrammar};
pub use hints::{DensityParams, QueryHints, TemporalDensityParams, TransformHints};
pub use keyplan::{
    planning_filter, ByteRange, ColumnFamilyPlan, KeyPlan, KeyPlanner, KeyPlanningFilter,
    KeySpacePlan,
};
pub use plan::{IteratorStage, JoinPlan, QueryPlan, StageNamer, TableRole};
pub use planner::{StrategyPlanner, CURRENT_INDEX_VERSION};
pub use strategy::{CompileRequest, Strategy};
