//! Attribute-range strategy: bounds extracted from every range-like
//! conjunct on the driving attribute are folded into one scan of the
//! attribute index, followed by the record table.

use tracing::debug;

use geostrata_core::encoding::lexicode;
use geostrata_core::error::{Error, Result};
use geostrata_core::filter::{CompareOp, Filter, Literal, TemporalRelation};
use geostrata_core::time::Interval;

use crate::decide::is_indexed_range;
use crate::keyplan::{ByteRange, ColumnFamilyPlan};
use crate::plan::{JoinPlan, QueryPlan, StageNamer, TableRole};

use super::{attribute_range, fine_filter_stage, residual_of, CompileRequest, Strategy, ValueBound};

pub(crate) fn compile(req: &CompileRequest<'_>) -> Result<QueryPlan> {
    let property = req
        .conjuncts
        .iter()
        .find(|c| is_indexed_range(req.schema, c))
        .and_then(Filter::property)
        .map(str::to_string)
        .ok_or_else(|| Error::unsupported("no range predicate on an indexed attribute"))?;

    // Fold every range conjunct on the driving attribute into one pair of
    // bounds; `a >= 11 AND a < 20` becomes a single closed-open range.
    let mut lo: Option<(Literal, bool)> = None;
    let mut hi: Option<(Literal, bool)> = None;
    let mut absorbed = Vec::new();
    for (i, conjunct) in req.conjuncts.iter().enumerate() {
        if conjunct.property() != Some(property.as_str()) {
            continue;
        }
        match conjunct {
            Filter::Compare {
                op, value, flipped, ..
            } => {
                match Filter::effective_op(*op, *flipped) {
                    CompareOp::Gt => tighten_lower(&mut lo, value.clone(), false),
                    CompareOp::GtEq => tighten_lower(&mut lo, value.clone(), true),
                    CompareOp::Lt => tighten_upper(&mut hi, value.clone(), false),
                    CompareOp::LtEq => tighten_upper(&mut hi, value.clone(), true),
                }
                absorbed.push(i);
            }
            Filter::Between {
                lo: between_lo,
                hi: between_hi,
                ..
            } => {
                tighten_lower(&mut lo, between_lo.clone(), true);
                tighten_upper(&mut hi, between_hi.clone(), true);
                absorbed.push(i);
            }
            Filter::Temporal {
                relation, interval, ..
            } => {
                apply_temporal(&mut lo, &mut hi, *relation, interval);
                absorbed.push(i);
            }
            _ => {}
        }
    }

    if lo.is_none() && hi.is_none() {
        return Err(Error::unsupported(format!(
            "no usable bounds on attribute `{property}`"
        )));
    }

    let range = attribute_range(
        &property,
        lo.as_ref().map(|(value, inclusive)| ValueBound {
            value,
            inclusive: *inclusive,
        }),
        hi.as_ref().map(|(value, inclusive)| ValueBound {
            value,
            inclusive: *inclusive,
        }),
    );
    if range_is_empty(&range) {
        return Ok(QueryPlan::empty(
            Strategy::AttrRange,
            TableRole::AttributeIndex,
        ));
    }

    let residual = residual_of(req.conjuncts, &absorbed);
    let mut namer = StageNamer::new();
    let iterators = vec![fine_filter_stage(
        &mut namer,
        req,
        &residual,
        Some(&property),
    )];

    debug!(attribute = %property, "compiled attribute-range plan");

    Ok(QueryPlan {
        strategy: Strategy::AttrRange,
        table: TableRole::AttributeIndex,
        ranges: vec![range],
        join: Some(JoinPlan {
            table: TableRole::Records,
        }),
        column_families: ColumnFamilyPlan::All,
        iterators,
    })
}

/// `BETWEEN` and `DURING` expand to closed ranges; `AFTER`/`BEFORE` to
/// half-open ranges against the attribute's encoding extremes.
fn apply_temporal(
    lo: &mut Option<(Literal, bool)>,
    hi: &mut Option<(Literal, bool)>,
    relation: TemporalRelation,
    interval: &Interval,
) {
    match relation {
        TemporalRelation::During => {
            tighten_lower(lo, Literal::Date(interval.start), true);
            tighten_upper(hi, Literal::Date(interval.end), true);
        }
        TemporalRelation::Equals => {
            tighten_lower(lo, Literal::Date(interval.start), true);
            tighten_upper(hi, Literal::Date(interval.start), true);
        }
        TemporalRelation::After => tighten_lower(lo, Literal::Date(interval.start), false),
        TemporalRelation::Before => tighten_upper(hi, Literal::Date(interval.start), false),
    }
}

fn tighten_lower(lo: &mut Option<(Literal, bool)>, value: Literal, inclusive: bool) {
    let replace = match lo {
        None => true,
        Some((existing, existing_inclusive)) => {
            let existing_key = lexicode(existing);
            let new_key = lexicode(&value);
            new_key > existing_key || (new_key == existing_key && *existing_inclusive && !inclusive)
        }
    };
    if replace {
        *lo = Some((value, inclusive));
    }
}

fn tighten_upper(hi: &mut Option<(Literal, bool)>, value: Literal, inclusive: bool) {
    let replace = match hi {
        None => true,
        Some((existing, existing_inclusive)) => {
            let existing_key = lexicode(existing);
            let new_key = lexicode(&value);
            new_key < existing_key || (new_key == existing_key && *existing_inclusive && !inclusive)
        }
    };
    if replace {
        *hi = Some((value, inclusive));
    }
}

fn range_is_empty(range: &ByteRange) -> bool {
    match &range.end {
        Some(end) => range.start.as_ref() >= end.as_ref(),
        None => false,
    }
}
