//! Key-space planning for the spatio-temporal index.
//!
//! A space-time predicate is folded into a [`KeyPlanningFilter`], which the
//! index grammar expands into byte row-key ranges, a column-family plan, and
//! an optional row-regex prefilter. The planner owns only the fold and the
//! accept-everything short-circuit; the byte layout belongs to the grammar.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use geostrata_core::encoding;
use geostrata_core::geom::Polygon;
use geostrata_core::time::Interval;

use crate::grammar::IndexGrammar;

/// A half-open row-key range `[start, end)`. `end = None` is unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: Bytes,
    pub end: Option<Bytes>,
}

impl ByteRange {
    /// Creates a range from explicit bounds.
    #[must_use]
    pub fn new(start: impl Into<Bytes>, end: Option<Bytes>) -> Self {
        Self {
            start: start.into(),
            end,
        }
    }

    /// The range covering the whole table.
    #[must_use]
    pub fn all() -> Self {
        Self {
            start: Bytes::new(),
            end: None,
        }
    }

    /// The range matching exactly one row key.
    #[must_use]
    pub fn exact_row(row: impl Into<Bytes>) -> Self {
        let row = row.into();
        let mut end = row.to_vec();
        end.push(0x00);
        Self {
            start: row,
            end: Some(Bytes::from(end)),
        }
    }

    /// The range matching every row with the given prefix.
    #[must_use]
    pub fn prefix(prefix: &[u8]) -> Self {
        Self {
            start: Bytes::copy_from_slice(prefix),
            end: encoding::successor(prefix).map(Bytes::from),
        }
    }

    /// True when the row key falls inside the range.
    #[must_use]
    pub fn contains_row(&self, row: &[u8]) -> bool {
        if row < self.start.as_ref() {
            return false;
        }
        match &self.end {
            Some(end) => row < end.as_ref(),
            None => true,
        }
    }
}

/// How the key space is addressed by a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyPlan {
    /// Scan the listed ranges.
    Ranges(Vec<ByteRange>),
    /// Scan exactly the listed row keys.
    List(Vec<Bytes>),
    /// Scan the whole table.
    AcceptAll,
}

impl KeyPlan {
    /// Lowers the plan to concrete scan ranges.
    #[must_use]
    pub fn into_ranges(self) -> Vec<ByteRange> {
        match self {
            Self::Ranges(ranges) => ranges,
            Self::List(rows) => rows.into_iter().map(ByteRange::exact_row).collect(),
            Self::AcceptAll => vec![ByteRange::all()],
        }
    }
}

/// Which column families a scan fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnFamilyPlan {
    /// Fetch only the listed families.
    List(Vec<Bytes>),
    /// Fetch every family.
    All,
}

/// The space-time predicate shapes the grammar knows how to expand.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyPlanningFilter {
    AcceptEverything,
    Date(DateTime<Utc>),
    DateRange(DateTime<Utc>, DateTime<Utc>),
    Spatial(Polygon),
    SpatialDate(Polygon, DateTime<Utc>),
    SpatialDateRange(Polygon, DateTime<Utc>, DateTime<Utc>),
}

/// Folds an optional polygon and interval into a planning filter.
///
/// A degenerate interval (`start == end`) selects the instant shapes.
#[must_use]
pub fn planning_filter(
    polygon: Option<&Polygon>,
    interval: Option<&Interval>,
) -> KeyPlanningFilter {
    match (polygon, interval) {
        (None, None) => KeyPlanningFilter::AcceptEverything,
        (None, Some(i)) if i.is_instant() => KeyPlanningFilter::Date(i.start),
        (None, Some(i)) => KeyPlanningFilter::DateRange(i.start, i.end),
        (Some(p), None) => KeyPlanningFilter::Spatial(p.clone()),
        (Some(p), Some(i)) if i.is_instant() => KeyPlanningFilter::SpatialDate(p.clone(), i.start),
        (Some(p), Some(i)) => KeyPlanningFilter::SpatialDateRange(p.clone(), i.start, i.end),
    }
}

/// Ranges, column families, and regex for one space-time predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct KeySpacePlan {
    pub key_plan: KeyPlan,
    pub column_families: ColumnFamilyPlan,
    pub row_regex: Option<String>,
}

/// Derives the key-space plan for a space-time predicate via the grammar.
pub struct KeyPlanner<'a> {
    grammar: &'a dyn IndexGrammar,
}

impl<'a> KeyPlanner<'a> {
    /// Creates a planner over the given grammar.
    #[must_use]
    pub fn new(grammar: &'a dyn IndexGrammar) -> Self {
        Self { grammar }
    }

    /// Plans ranges, column families, and regex for the predicate.
    #[must_use]
    pub fn plan(&self, polygon: Option<&Polygon>, interval: Option<&Interval>) -> KeySpacePlan {
        let filter = planning_filter(polygon, interval);
        if filter == KeyPlanningFilter::AcceptEverything {
            return KeySpacePlan {
                key_plan: KeyPlan::AcceptAll,
                column_families: ColumnFamilyPlan::All,
                row_regex: None,
            };
        }
        let key_plan = self.grammar.key_plan(&filter);
        let column_families = self.grammar.column_families(&filter);
        let row_regex = self.grammar.key_regex(&filter, &key_plan);
        KeySpacePlan {
            key_plan,
            column_families,
            row_regex,
        }
    }
}
