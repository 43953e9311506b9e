//! The five physical access strategies and their plan compilers.
//!
//! A strategy is a tag; compilation dispatches by match. All compilers are
//! pure: they read the schema, the canonicalized conjunct list, the hints,
//! and the index grammar, and produce an immutable [`QueryPlan`].

mod attr_eq;
mod attr_like;
mod attr_range;
mod record_id;
mod stidx;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use geostrata_core::encoding::{self, lexicode};
use geostrata_core::error::Result;
use geostrata_core::filter::{Filter, Literal};
use geostrata_core::schema::SchemaDescriptor;

use crate::grammar::IndexGrammar;
use crate::hints::QueryHints;
use crate::keyplan::ByteRange;
use crate::plan::{band, iterator_class, option_key, IteratorStage, QueryPlan, StageNamer};

/// The physical access strategy selected for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Scan the spatio-temporal index.
    StIdx,
    /// Equality lookup through the attribute index, then the record table.
    AttrEq,
    /// Range scan of the attribute index, then the record table.
    AttrRange,
    /// Prefix scan of the attribute index, then the record table.
    AttrLike,
    /// Direct record-table lookup by feature id.
    RecordId,
}

impl Strategy {
    /// Compiles the strategy into a physical plan.
    pub fn compile(self, req: &CompileRequest<'_>) -> Result<QueryPlan> {
        match self {
            Self::StIdx => stidx::compile(req),
            Self::AttrEq => attr_eq::compile(req),
            Self::AttrRange => attr_range::compile(req),
            Self::AttrLike => attr_like::compile(req),
            Self::RecordId => record_id::compile(req),
        }
    }
}

/// Everything a compiler needs to produce a plan.
pub struct CompileRequest<'a> {
    /// The feature schema.
    pub schema: &'a SchemaDescriptor,
    /// Canonicalized top-level conjuncts of the normalized filter.
    pub conjuncts: &'a [Filter],
    /// Caller-supplied hints.
    pub hints: &'a QueryHints,
    /// Key layout of the spatio-temporal index.
    pub grammar: &'a dyn IndexGrammar,
    /// Feature encoding name for the fine-filter iterator.
    pub feature_encoding: &'a str,
}

/// Attribute index row for one `(attribute, value)` pair:
/// `name || 0x00 || lexicode(value)`. The record id lives in the column
/// family of the entry.
#[must_use]
pub(crate) fn attribute_row(name: &str, value: &Literal) -> Vec<u8> {
    let mut row = Vec::with_capacity(name.len() + 1 + 16);
    row.extend_from_slice(name.as_bytes());
    row.push(0x00);
    row.extend_from_slice(&lexicode(value));
    row
}

/// The range holding every row of one attribute, `[name 0x00, name 0x01)`.
#[must_use]
pub(crate) fn attribute_scope(name: &str) -> ByteRange {
    let mut start = name.as_bytes().to_vec();
    start.push(0x00);
    let mut end = name.as_bytes().to_vec();
    end.push(0x01);
    ByteRange::new(start, Some(end.into()))
}

/// The range matching exactly one attribute value.
#[must_use]
pub(crate) fn equality_range(name: &str, value: &Literal) -> ByteRange {
    ByteRange::exact_row(attribute_row(name, value))
}

/// A bound on the attribute index row space.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ValueBound<'a> {
    pub value: &'a Literal,
    pub inclusive: bool,
}

/// The range over one attribute between two optional value bounds.
///
/// An inclusive bound keeps the value's own row; exclusivity is expressed by
/// stepping just past it (`row || 0x00`), which is exact because row order
/// follows value order under the lexicoding.
#[must_use]
pub(crate) fn attribute_range(
    name: &str,
    lo: Option<ValueBound<'_>>,
    hi: Option<ValueBound<'_>>,
) -> ByteRange {
    let scope = attribute_scope(name);
    let start = match lo {
        None => scope.start.clone(),
        Some(bound) => {
            let mut row = attribute_row(name, bound.value);
            if !bound.inclusive {
                row.push(0x00);
            }
            row.into()
        }
    };
    let end = match hi {
        None => scope.end.clone(),
        Some(bound) => {
            let mut row = attribute_row(name, bound.value);
            if bound.inclusive {
                row.push(0x00);
            }
            Some(row.into())
        }
    };
    ByteRange::new(start, end)
}

/// The range matching every string value with the given prefix: the floor is
/// the prefix row and the ceiling increments the prefix's last byte
/// (unbounded within the attribute when the prefix is all `0xFF`).
#[must_use]
pub(crate) fn like_prefix_range(name: &str, prefix: &str) -> ByteRange {
    let scope = attribute_scope(name);
    let start = attribute_row(name, &Literal::Str(prefix.to_string()));
    let end = match encoding::successor(prefix.as_bytes()) {
        Some(next) => {
            let mut row = name.as_bytes().to_vec();
            row.push(0x00);
            row.extend_from_slice(&next);
            Some(row.into())
        }
        None => scope.end.clone(),
    };
    ByteRange::new(start, end)
}

/// Assembles the residual filter from the conjuncts a compiler did not
/// absorb.
#[must_use]
pub(crate) fn residual_of(conjuncts: &[Filter], absorbed: &[usize]) -> Filter {
    let mut rest: Vec<Filter> = conjuncts
        .iter()
        .enumerate()
        .filter(|(i, _)| !absorbed.contains(i))
        .map(|(_, c)| c.clone())
        .collect();
    match rest.len() {
        0 => Filter::IncludeAll,
        1 => rest.pop().expect("rest has exactly 1 element"),
        _ => Filter::And(rest),
    }
}

/// Builds the fine-filter stage shared by every strategy: schema, encoding,
/// the residual as ECQL, and transforms unless an aggregation stage owns the
/// output schema.
pub(crate) fn fine_filter_stage(
    namer: &mut StageNamer,
    req: &CompileRequest<'_>,
    residual: &Filter,
    attribute: Option<&str>,
) -> IteratorStage {
    let mut options = BTreeMap::new();
    options.insert(
        option_key::SFT.to_string(),
        req.schema.to_spec_string(),
    );
    options.insert(
        option_key::SFT_NAME.to_string(),
        req.schema.type_name().to_string(),
    );
    options.insert(
        option_key::FEATURE_ENCODING.to_string(),
        req.hints
            .feature_encoding
            .clone()
            .unwrap_or_else(|| req.feature_encoding.to_string()),
    );
    if !matches!(residual, Filter::IncludeAll) {
        options.insert(option_key::ECQL_FILTER.to_string(), residual.to_ecql());
    }
    if let Some(attribute) = attribute {
        options.insert(option_key::ATTR_NAME.to_string(), attribute.to_string());
    }
    // Density composes its own output schema, so projection is dropped when
    // an aggregation stage is present.
    if !req.hints.aggregating() {
        if let Some(transform) = &req.hints.transform {
            options.insert(
                option_key::TRANSFORMS.to_string(),
                transform.definitions.join(";"),
            );
            options.insert(
                option_key::TRANSFORM_SCHEMA.to_string(),
                transform.schema.to_spec_string(),
            );
        }
    }
    IteratorStage {
        priority: band::FINE_FILTER,
        name: namer.name("fine-filter"),
        class_name: iterator_class::FINE_FILTER.to_string(),
        options,
    }
}

/// Builds the aggregation stages requested by the hints, validating their
/// parameters before any scanner is bound.
pub(crate) fn aggregation_stages(
    namer: &mut StageNamer,
    hints: &QueryHints,
) -> Result<Vec<IteratorStage>> {
    let mut stages = Vec::new();
    if let Some(params) = hints.density_params()? {
        let mut options = BTreeMap::new();
        options.insert(
            option_key::POLYGON.to_string(),
            params.envelope.to_polygon().to_wkt(),
        );
        options.insert(option_key::WIDTH.to_string(), params.width.to_string());
        options.insert(option_key::HEIGHT.to_string(), params.height.to_string());
        stages.push(IteratorStage {
            priority: band::AGGREGATION,
            name: namer.name("density"),
            class_name: iterator_class::DENSITY.to_string(),
            options,
        });
    }
    if let Some(params) = hints.temporal_density_params()? {
        let (start, end) = params.interval.epoch_millis();
        let mut options = BTreeMap::new();
        options.insert(option_key::INTERVAL.to_string(), format!("{start},{end}"));
        options.insert(option_key::BUCKETS.to_string(), params.buckets.to_string());
        stages.push(IteratorStage {
            priority: band::AGGREGATION,
            name: namer.name("temporal-density"),
            class_name: iterator_class::TEMPORAL_DENSITY.to_string(),
            options,
        });
    }
    Ok(stages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_row_layout() {
        let row = attribute_row("attr2", &Literal::Str("val56".into()));
        assert_eq!(row, b"attr2\x00val56");
    }

    #[test]
    fn test_equality_range_excludes_extensions() {
        let range = equality_range("attr2", &Literal::Str("val56".into()));
        assert!(range.contains_row(b"attr2\x00val56"));
        assert!(!range.contains_row(b"attr2\x00val567"));
        assert!(!range.contains_row(b"attr2\x00val55"));
    }

    #[test]
    fn test_attribute_range_inclusivity() {
        let lo = Literal::Int(11);
        let hi = Literal::Int(20);
        let range = attribute_range(
            "attr2",
            Some(ValueBound {
                value: &lo,
                inclusive: true,
            }),
            Some(ValueBound {
                value: &hi,
                inclusive: false,
            }),
        );
        assert!(range.contains_row(&attribute_row("attr2", &Literal::Int(11))));
        assert!(range.contains_row(&attribute_row("attr2", &Literal::Int(19))));
        assert!(!range.contains_row(&attribute_row("attr2", &Literal::Int(20))));
        assert!(!range.contains_row(&attribute_row("attr2", &Literal::Int(10))));
    }

    #[test]
    fn test_attribute_range_unbounded_ends() {
        let lo = Literal::Int(0);
        let range = attribute_range(
            "a",
            Some(ValueBound {
                value: &lo,
                inclusive: false,
            }),
            None,
        );
        assert!(range.contains_row(&attribute_row("a", &Literal::Int(1))));
        assert!(!range.contains_row(&attribute_row("a", &Literal::Int(0))));
        // Stays inside the attribute scope.
        assert!(!range.contains_row(b"b\x00whatever"));
    }

    #[test]
    fn test_like_prefix_range_increments_last_byte() {
        let range = like_prefix_range("attr2", "2nd1");
        assert_eq!(range.start.as_ref(), b"attr2\x002nd1");
        assert_eq!(range.end.as_ref().unwrap().as_ref(), b"attr2\x002nd2");
        assert!(range.contains_row(b"attr2\x002nd1zzz"));
        assert!(!range.contains_row(b"attr2\x002nd2"));
    }
}
