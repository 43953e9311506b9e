//! Attribute-prefix (`LIKE 'literal%'`) strategy.
//!
//! Only trailing-wildcard patterns reach this compiler; everything else is
//! routed to the spatio-temporal index by the decider.

use tracing::debug;

use geostrata_core::error::{Error, Result};
use geostrata_core::filter::Filter;

use crate::decide::{is_indexed_prefix_like, like_literal_prefix};
use crate::keyplan::ColumnFamilyPlan;
use crate::plan::{JoinPlan, QueryPlan, StageNamer, TableRole};

use super::{fine_filter_stage, like_prefix_range, residual_of, CompileRequest, Strategy};

pub(crate) fn compile(req: &CompileRequest<'_>) -> Result<QueryPlan> {
    let (target, property, pattern, case_insensitive) = req
        .conjuncts
        .iter()
        .enumerate()
        .find(|(_, c)| is_indexed_prefix_like(req.schema, c))
        .and_then(|(i, c)| match c {
            Filter::Like {
                property,
                pattern,
                case_insensitive,
            } => Some((i, property.as_str(), pattern.as_str(), *case_insensitive)),
            _ => None,
        })
        .ok_or_else(|| Error::unsupported("no prefix pattern on an indexed attribute"))?;

    let prefix = like_literal_prefix(pattern)
        .ok_or_else(|| Error::unsupported(format!("pattern `{pattern}` has no literal prefix")))?;
    let prefix = if case_insensitive {
        prefix.to_lowercase()
    } else {
        prefix.to_string()
    };

    let range = like_prefix_range(property, &prefix);

    // A case-insensitive match is wider than its planned prefix range, so
    // the predicate is re-checked by the fine filter.
    let absorbed: Vec<usize> = if case_insensitive { Vec::new() } else { vec![target] };
    let residual = residual_of(req.conjuncts, &absorbed);

    let mut namer = StageNamer::new();
    let iterators = vec![fine_filter_stage(
        &mut namer,
        req,
        &residual,
        Some(property),
    )];

    debug!(attribute = %property, prefix = %prefix, "compiled attribute-prefix plan");

    Ok(QueryPlan {
        strategy: Strategy::AttrLike,
        table: TableRole::AttributeIndex,
        ranges: vec![range],
        join: Some(JoinPlan {
            table: TableRole::Records,
        }),
        column_families: ColumnFamilyPlan::All,
        iterators,
    })
}
