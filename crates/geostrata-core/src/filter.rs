//! The logical filter tree handed to the planner by the query front end.
//!
//! The planner consumes a parsed tree, never filter text; the only textual
//! output is [`Filter::to_ecql`], which renders residual predicates for the
//! server-side fine-filter iterator.

use std::collections::BTreeSet;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geom::Polygon;
use crate::time::Interval;

/// A literal value paired with a property in a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Uuid(Uuid),
    Date(chrono::DateTime<chrono::Utc>),
}

impl Literal {
    /// Renders the literal in ECQL syntax.
    #[must_use]
    pub fn to_ecql(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Bool(v) => v.to_string(),
            Self::Str(v) => format!("'{}'", v.replace('\'', "''")),
            Self::Uuid(v) => format!("'{v}'"),
            Self::Date(v) => v.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// One side of a comparison expression, before property/literal pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// A reference to a named schema attribute.
    Property(String),
    /// A constant.
    Literal(Literal),
    /// A function call the planner does not evaluate.
    Call(String),
}

/// The `(name, literal)` pairing extracted from a comparison expression.
///
/// `flipped` records that the literal appeared on the *left* of the operator;
/// both shapes normalize to the same internal form, and range compilation
/// reflects the operator when `flipped` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyLiteral {
    pub name: String,
    pub literal: Literal,
    pub secondary: Option<Literal>,
    pub flipped: bool,
}

/// Ordering operator of a comparison predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    /// The operator as seen with its operands swapped: `11 > x` is `x < 11`.
    #[must_use]
    pub const fn reflect(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::LtEq => Self::GtEq,
            Self::Gt => Self::Lt,
            Self::GtEq => Self::LtEq,
        }
    }

    /// ECQL spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }
}

/// Spatial relation of a spatial predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpatialRelation {
    Intersects,
    Within,
    Contains,
    BBox,
}

/// Temporal relation of a temporal predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemporalRelation {
    Before,
    After,
    During,
    Equals,
}

/// A logical filter: a tagged tree with owned children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    /// `name = literal`.
    Eq { property: String, value: Literal },
    /// `name <op> literal`; `flipped` when the literal was on the left.
    Compare {
        op: CompareOp,
        property: String,
        value: Literal,
        flipped: bool,
    },
    /// `name BETWEEN lo AND hi` (closed on both ends).
    Between {
        property: String,
        lo: Literal,
        hi: Literal,
    },
    /// `name LIKE pattern`, optionally case-insensitive (`ILIKE`).
    Like {
        property: String,
        pattern: String,
        case_insensitive: bool,
    },
    /// Record-id membership.
    IdIn(BTreeSet<String>),
    /// Spatial predicate against a named geometry attribute.
    Spatial {
        relation: SpatialRelation,
        property: String,
        geometry: Polygon,
    },
    /// Temporal predicate against a named date attribute. `Before`/`After`/
    /// `Equals` carry a degenerate (instant) interval.
    Temporal {
        relation: TemporalRelation,
        property: String,
        interval: Interval,
    },
    /// A predicate the planner treats as pass-through residual text.
    Opaque { ecql: String },
    /// Matches every feature.
    IncludeAll,
    /// Matches nothing.
    ExcludeAll,
}

impl Filter {
    /// Convenience constructor for a conjunction.
    #[must_use]
    pub fn and(children: Vec<Filter>) -> Self {
        Self::And(children)
    }

    /// Convenience constructor for an id predicate.
    #[must_use]
    pub fn id_in<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::IdIn(ids.into_iter().map(Into::into).collect())
    }

    /// The schema attribute a leaf predicate constrains, if any.
    #[must_use]
    pub fn property(&self) -> Option<&str> {
        match self {
            Self::Eq { property, .. }
            | Self::Compare { property, .. }
            | Self::Between { property, .. }
            | Self::Like { property, .. }
            | Self::Spatial { property, .. }
            | Self::Temporal { property, .. } => Some(property),
            _ => None,
        }
    }

    /// The comparison operator with `flipped` reflected away.
    ///
    /// `11 > attr` parses as `Compare { op: Gt, flipped: true }` and must
    /// plan as `attr < 11`.
    #[must_use]
    pub fn effective_op(op: CompareOp, flipped: bool) -> CompareOp {
        if flipped {
            op.reflect()
        } else {
            op
        }
    }

    /// Renders the filter as ECQL text for the fine-filter iterator.
    #[must_use]
    pub fn to_ecql(&self) -> String {
        match self {
            Self::And(children) => join_ecql(children, " AND "),
            Self::Or(children) => join_ecql(children, " OR "),
            Self::Not(child) => format!("NOT ({})", child.to_ecql()),
            Self::Eq { property, value } => format!("{property} = {}", value.to_ecql()),
            Self::Compare {
                op,
                property,
                value,
                flipped,
            } => {
                let op = Self::effective_op(*op, *flipped);
                format!("{property} {} {}", op.as_str(), value.to_ecql())
            }
            Self::Between { property, lo, hi } => format!(
                "{property} BETWEEN {} AND {}",
                lo.to_ecql(),
                hi.to_ecql()
            ),
            Self::Like {
                property,
                pattern,
                case_insensitive,
            } => {
                let keyword = if *case_insensitive { "ILIKE" } else { "LIKE" };
                format!("{property} {keyword} '{}'", pattern.replace('\'', "''"))
            }
            Self::IdIn(ids) => {
                let quoted = ids
                    .iter()
                    .map(|id| format!("'{}'", id.replace('\'', "''")))
                    .collect::<Vec<_>>()
                    .join(",");
                format!("IN ({quoted})")
            }
            Self::Spatial {
                relation,
                property,
                geometry,
            } => match relation {
                SpatialRelation::BBox => {
                    let b = geometry.bounding_box();
                    format!(
                        "BBOX({property}, {}, {}, {}, {})",
                        b.min_x, b.min_y, b.max_x, b.max_y
                    )
                }
                SpatialRelation::Intersects => {
                    format!("INTERSECTS({property}, {})", geometry.to_wkt())
                }
                SpatialRelation::Within => {
                    format!("WITHIN({property}, {})", geometry.to_wkt())
                }
                SpatialRelation::Contains => {
                    format!("CONTAINS({property}, {})", geometry.to_wkt())
                }
            },
            Self::Temporal {
                relation,
                property,
                interval,
            } => {
                let start = interval.start.to_rfc3339_opts(SecondsFormat::Secs, true);
                let end = interval.end.to_rfc3339_opts(SecondsFormat::Secs, true);
                match relation {
                    TemporalRelation::Before => format!("{property} BEFORE {start}"),
                    TemporalRelation::After => format!("{property} AFTER {start}"),
                    TemporalRelation::During => {
                        format!("{property} DURING {start}/{end}")
                    }
                    TemporalRelation::Equals => format!("{property} TEQUALS {start}"),
                }
            }
            Self::Opaque { ecql } => ecql.clone(),
            Self::IncludeAll => "INCLUDE".to_string(),
            Self::ExcludeAll => "EXCLUDE".to_string(),
        }
    }
}

fn join_ecql(children: &[Filter], sep: &str) -> String {
    children
        .iter()
        .map(|c| match c {
            Filter::And(_) | Filter::Or(_) => format!("({})", c.to_ecql()),
            _ => c.to_ecql(),
        })
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::BoundingBox;

    #[test]
    fn test_reflect_operator() {
        assert_eq!(CompareOp::Gt.reflect(), CompareOp::Lt);
        assert_eq!(CompareOp::LtEq.reflect(), CompareOp::GtEq);
        // `11 > attr2` must plan as `attr2 < 11`.
        assert_eq!(Filter::effective_op(CompareOp::Gt, true), CompareOp::Lt);
        assert_eq!(Filter::effective_op(CompareOp::Gt, false), CompareOp::Gt);
    }

    #[test]
    fn test_ecql_leaves() {
        let eq = Filter::Eq {
            property: "attr2".into(),
            value: Literal::Str("val56".into()),
        };
        assert_eq!(eq.to_ecql(), "attr2 = 'val56'");

        let cmp = Filter::Compare {
            op: CompareOp::Gt,
            property: "attr2".into(),
            value: Literal::Int(11),
            flipped: true,
        };
        assert_eq!(cmp.to_ecql(), "attr2 < 11");

        let like = Filter::Like {
            property: "attr2".into(),
            pattern: "2nd1%".into(),
            case_insensitive: true,
        };
        assert_eq!(like.to_ecql(), "attr2 ILIKE '2nd1%'");

        let ids = Filter::id_in(["val56", "val57"]);
        assert_eq!(ids.to_ecql(), "IN ('val56','val57')");
    }

    #[test]
    fn test_ecql_spatial_and_composite() {
        let bbox = Filter::Spatial {
            relation: SpatialRelation::BBox,
            property: "geom".into(),
            geometry: BoundingBox::new(-10.0, -10.0, 10.0, 10.0).to_polygon(),
        };
        assert_eq!(bbox.to_ecql(), "BBOX(geom, -10, -10, 10, 10)");

        let composite = Filter::And(vec![
            bbox,
            Filter::Eq {
                property: "low".into(),
                value: Literal::Str("y".into()),
            },
        ]);
        assert_eq!(
            composite.to_ecql(),
            "BBOX(geom, -10, -10, 10, 10) AND low = 'y'"
        );
    }

    #[test]
    fn test_ecql_temporal() {
        let interval = Interval::new(
            "2012-01-01T11:00:00Z".parse().unwrap(),
            "2014-01-01T12:15:00Z".parse().unwrap(),
        );
        let during = Filter::Temporal {
            relation: TemporalRelation::During,
            property: "dtg".into(),
            interval,
        };
        assert_eq!(
            during.to_ecql(),
            "dtg DURING 2012-01-01T11:00:00Z/2014-01-01T12:15:00Z"
        );
    }

    #[test]
    fn test_string_escaping() {
        let eq = Filter::Eq {
            property: "name".into(),
            value: Literal::Str("o'brien".into()),
        };
        assert_eq!(eq.to_ecql(), "name = 'o''brien'");
    }
}
