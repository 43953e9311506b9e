//! Strategy selection.
//!
//! A rule table evaluated in order over the canonicalized conjunct list; the
//! first matching rule wins. The rules encode relative access costs: id
//! lookups are constant per id, equality on a high-cardinality attribute
//! touches few rows, range and prefix scans of the attribute index beat a
//! full space-time scan, and low-cardinality equality fans out too widely to
//! beat a spatial predicate.

use tracing::debug;

use geostrata_core::filter::Filter;
use geostrata_core::schema::{AttributeType, Cardinality, SchemaDescriptor};

use crate::cardinality::cardinality;
use crate::extract;
use crate::hints::QueryHints;
use crate::strategy::Strategy;

/// Puts conjuncts in canonical order: by constrained attribute, then by
/// predicate shape, then by rendering. Selection must not depend on how the
/// caller happened to order an `AND`.
#[must_use]
pub fn canonicalize(mut conjuncts: Vec<Filter>) -> Vec<Filter> {
    conjuncts.sort_by_key(|c| {
        (
            c.property().unwrap_or("").to_string(),
            shape_rank(c),
            c.to_ecql(),
        )
    });
    conjuncts
}

fn shape_rank(filter: &Filter) -> u8 {
    match filter {
        Filter::IdIn(_) => 0,
        Filter::Eq { .. } => 1,
        Filter::Like { .. } => 2,
        Filter::Compare { .. } => 3,
        Filter::Between { .. } => 4,
        Filter::Temporal { .. } => 5,
        Filter::Spatial { .. } => 6,
        _ => 7,
    }
}

/// Picks exactly one strategy for the query.
#[must_use]
pub fn choose_strategy(
    schema: &SchemaDescriptor,
    conjuncts: &[Filter],
    _hints: &QueryHints,
    index_version: i32,
) -> Strategy {
    // Attribute indexes do not exist in legacy layouts.
    if index_version <= 0 {
        debug!(index_version, "legacy layout, using the spatio-temporal index");
        return Strategy::StIdx;
    }

    // An id predicate dominates everything else.
    if conjuncts.iter().any(|c| matches!(c, Filter::IdIn(_))) {
        debug!("id predicate present, using the record table");
        return Strategy::RecordId;
    }

    // Equality on an indexed high-cardinality attribute wins over any
    // space-time predicate.
    if conjuncts
        .iter()
        .any(|c| is_indexed_equality(schema, c) && conjunct_cardinality(schema, c) == Cardinality::High)
    {
        debug!("high-cardinality equality present, using the attribute index");
        return Strategy::AttrEq;
    }

    // A pure attribute query (no space, no time) prefers the attribute
    // index whenever an indexed attribute is constrained.
    let st = extract::extract(conjuncts.to_vec(), schema);
    if !st.excludes_everything() && st.polygon.is_none() && st.interval.is_none() {
        if conjuncts.iter().any(|c| is_indexed_equality(schema, c)) {
            debug!("pure attribute equality, using the attribute index");
            return Strategy::AttrEq;
        }
        if conjuncts.iter().any(|c| is_indexed_prefix_like(schema, c)) {
            debug!("pure attribute prefix match, using the attribute index");
            return Strategy::AttrLike;
        }
        if conjuncts.iter().any(|c| is_indexed_range(schema, c)) {
            debug!("pure attribute range, using the attribute index");
            return Strategy::AttrRange;
        }
    }

    // Everything else, including low-cardinality equality combined with a
    // spatial predicate, scans the spatio-temporal index.
    debug!("using the spatio-temporal index");
    Strategy::StIdx
}

fn conjunct_cardinality(schema: &SchemaDescriptor, conjunct: &Filter) -> Cardinality {
    conjunct
        .property()
        .map(|p| cardinality(schema, p))
        .unwrap_or_default()
}

fn is_indexed(schema: &SchemaDescriptor, property: &str) -> bool {
    schema.attribute(property).is_some_and(|a| a.indexed)
}

pub(crate) fn is_indexed_equality(schema: &SchemaDescriptor, conjunct: &Filter) -> bool {
    matches!(conjunct, Filter::Eq { property, .. } if is_indexed(schema, property))
}

pub(crate) fn is_indexed_prefix_like(schema: &SchemaDescriptor, conjunct: &Filter) -> bool {
    match conjunct {
        Filter::Like {
            property, pattern, ..
        } => {
            schema
                .attribute(property)
                .is_some_and(|a| a.indexed && a.attr_type == AttributeType::String)
                && like_literal_prefix(pattern).is_some()
        }
        _ => false,
    }
}

pub(crate) fn is_indexed_range(schema: &SchemaDescriptor, conjunct: &Filter) -> bool {
    match conjunct {
        Filter::Compare { property, .. }
        | Filter::Between { property, .. }
        | Filter::Temporal { property, .. } => is_indexed(schema, property),
        _ => false,
    }
}

/// The literal prefix of a plannable pattern: a non-empty literal followed
/// by one or more trailing `%`, with no `_` and no embedded `%`.
#[must_use]
pub(crate) fn like_literal_prefix(pattern: &str) -> Option<&str> {
    let prefix = pattern.trim_end_matches('%');
    if prefix.len() == pattern.len() || prefix.is_empty() {
        return None;
    }
    if prefix.contains('%') || prefix.contains('_') {
        return None;
    }
    Some(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geostrata_core::filter::Literal;

    #[test]
    fn test_like_literal_prefix() {
        assert_eq!(like_literal_prefix("2nd1%"), Some("2nd1"));
        assert_eq!(like_literal_prefix("2nd1%%"), Some("2nd1"));
        assert_eq!(like_literal_prefix("2nd1"), None);
        assert_eq!(like_literal_prefix("%"), None);
        assert_eq!(like_literal_prefix("a%b%"), None);
        assert_eq!(like_literal_prefix("a_c%"), None);
    }

    #[test]
    fn test_canonicalize_is_order_independent() {
        let a = Filter::Eq {
            property: "a".into(),
            value: Literal::Str("1".into()),
        };
        let b = Filter::Eq {
            property: "b".into(),
            value: Literal::Str("2".into()),
        };
        let forward = canonicalize(vec![a.clone(), b.clone()]);
        let backward = canonicalize(vec![b, a]);
        assert_eq!(forward, backward);
    }
}
