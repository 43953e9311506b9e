//! The planner facade: normalize, decide, compile.

use tracing::info;

use geostrata_core::error::{Error, Result};
use geostrata_core::filter::Filter;
use geostrata_core::schema::SchemaDescriptor;

use crate::decide::{canonicalize, choose_strategy};
use crate::grammar::IndexGrammar;
use crate::hints::QueryHints;
use crate::normalize;
use crate::plan::QueryPlan;
use crate::strategy::{CompileRequest, Strategy};

/// Current layout version of the index tables. Versions at or below zero
/// predate the attribute index.
pub const CURRENT_INDEX_VERSION: i32 = 2;

const DEFAULT_FEATURE_ENCODING: &str = "avro";
const DEFAULT_MAX_FILTER_DEPTH: usize = 32;

/// Turns logical filters into physical plans for one feature schema.
///
/// The planner is pure: it does no I/O and holds no mutable state, so a
/// single instance can serve any number of concurrent queries.
pub struct StrategyPlanner<'a> {
    schema: &'a SchemaDescriptor,
    grammar: &'a dyn IndexGrammar,
    feature_encoding: String,
    index_version: i32,
    max_filter_depth: usize,
}

impl<'a> StrategyPlanner<'a> {
    /// Creates a planner over a schema and index grammar.
    #[must_use]
    pub fn new(schema: &'a SchemaDescriptor, grammar: &'a dyn IndexGrammar) -> Self {
        Self {
            schema,
            grammar,
            feature_encoding: DEFAULT_FEATURE_ENCODING.to_string(),
            index_version: CURRENT_INDEX_VERSION,
            max_filter_depth: DEFAULT_MAX_FILTER_DEPTH,
        }
    }

    /// Overrides the feature encoding advertised to the fine filter.
    #[must_use]
    pub fn with_feature_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.feature_encoding = encoding.into();
        self
    }

    /// Plans against an older index layout version.
    #[must_use]
    pub fn with_index_version(mut self, version: i32) -> Self {
        self.index_version = version;
        self
    }

    /// Overrides the filter nesting limit.
    #[must_use]
    pub fn with_max_filter_depth(mut self, depth: usize) -> Self {
        self.max_filter_depth = depth;
        self
    }

    /// Selects the strategy for a filter without compiling a plan.
    pub fn strategy_for(&self, filter: &Filter, hints: &QueryHints) -> Result<Strategy> {
        let conjuncts = self.conjuncts_of(filter)?;
        Ok(choose_strategy(
            self.schema,
            &conjuncts,
            hints,
            self.index_version,
        ))
    }

    /// Compiles a filter into a physical plan.
    pub fn plan(&self, filter: &Filter, hints: &QueryHints) -> Result<QueryPlan> {
        let conjuncts = self.conjuncts_of(filter)?;
        let strategy = choose_strategy(self.schema, &conjuncts, hints, self.index_version);
        info!(strategy = ?strategy, type_name = self.schema.type_name(), "selected strategy");
        let request = CompileRequest {
            schema: self.schema,
            conjuncts: &conjuncts,
            hints,
            grammar: self.grammar,
            feature_encoding: &self.feature_encoding,
        };
        strategy.compile(&request)
    }

    fn conjuncts_of(&self, filter: &Filter) -> Result<Vec<Filter>> {
        if depth_of(filter) > self.max_filter_depth {
            return Err(Error::unsupported(format!(
                "filter nesting exceeds maximum depth of {}",
                self.max_filter_depth
            )));
        }
        let normalized = normalize::normalize(filter.clone());
        Ok(canonicalize(normalize::conjuncts(normalized)))
    }
}

fn depth_of(filter: &Filter) -> usize {
    match filter {
        Filter::And(children) | Filter::Or(children) => {
            1 + children.iter().map(depth_of).max().unwrap_or(0)
        }
        Filter::Not(child) => 1 + depth_of(child),
        _ => 1,
    }
}
