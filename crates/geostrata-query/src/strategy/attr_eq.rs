//! Attribute-equality strategy: a two-phase scan through the attribute
//! index into the record table.

use tracing::debug;

use geostrata_core::error::{Error, Result};
use geostrata_core::filter::{Filter, Literal};
use geostrata_core::schema::Cardinality;

use crate::cardinality::cardinality;
use crate::decide::is_indexed_equality;
use crate::keyplan::ColumnFamilyPlan;
use crate::plan::{JoinPlan, QueryPlan, StageNamer, TableRole};

use super::{equality_range, fine_filter_stage, residual_of, CompileRequest, Strategy};

pub(crate) fn compile(req: &CompileRequest<'_>) -> Result<QueryPlan> {
    let (target, property, value) = pick_target(req).ok_or_else(|| {
        Error::unsupported("no equality predicate on an indexed attribute")
    })?;

    let range = equality_range(property, value);
    let residual = residual_of(req.conjuncts, &[target]);

    let mut namer = StageNamer::new();
    let iterators = vec![fine_filter_stage(
        &mut namer,
        req,
        &residual,
        Some(property),
    )];

    debug!(attribute = %property, "compiled attribute-equality plan");

    Ok(QueryPlan {
        strategy: Strategy::AttrEq,
        table: TableRole::AttributeIndex,
        ranges: vec![range],
        join: Some(JoinPlan {
            table: TableRole::Records,
        }),
        column_families: ColumnFamilyPlan::All,
        iterators,
    })
}

/// The conjunct to drive the index scan: the first high-cardinality indexed
/// equality in canonical order, or the first indexed equality otherwise.
fn pick_target<'a>(req: &'a CompileRequest<'_>) -> Option<(usize, &'a str, &'a Literal)> {
    let equalities: Vec<(usize, &str, &Literal)> = req
        .conjuncts
        .iter()
        .enumerate()
        .filter(|(_, c)| is_indexed_equality(req.schema, c))
        .filter_map(|(i, c)| match c {
            Filter::Eq { property, value } => Some((i, property.as_str(), value)),
            _ => None,
        })
        .collect();
    equalities
        .iter()
        .find(|(_, property, _)| cardinality(req.schema, property) == Cardinality::High)
        .or_else(|| equalities.first())
        .copied()
}
