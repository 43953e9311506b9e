//! Space-time extraction.
//!
//! Splits a conjunct list into one bounding polygon, one time interval, and
//! the residual predicates the extraction did not fully absorb. The residual
//! is later rendered to ECQL and pushed to the fine-filter iterator, so
//! partial absorption (bounds extracted, conjunct kept) is always sound.

use tracing::debug;

use geostrata_core::filter::{Filter, SpatialRelation, TemporalRelation};
use geostrata_core::geom::{BoundingBox, Polygon};
use geostrata_core::schema::SchemaDescriptor;
use geostrata_core::time::Interval;

/// The outcome of space-time extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceTimeQuery {
    /// Combined polygonal bounds of the spatial conjuncts, netted to the
    /// index domain.
    pub polygon: Option<Polygon>,
    /// Combined interval of the temporal conjuncts, netted to the index
    /// domain.
    pub interval: Option<Interval>,
    /// Conjuncts not fully absorbed by the extraction.
    pub residual: Filter,
}

impl SpaceTimeQuery {
    fn exclude_all() -> Self {
        Self {
            polygon: None,
            interval: None,
            residual: Filter::ExcludeAll,
        }
    }

    /// True when the predicate can match nothing.
    #[must_use]
    pub fn excludes_everything(&self) -> bool {
        matches!(self.residual, Filter::ExcludeAll)
    }
}

/// Clamps a polygon to the index domain.
///
/// Covering the domain collapses to the domain itself; polygons disjoint
/// from the domain net to nothing.
#[must_use]
pub fn net_polygon(polygon: &Polygon) -> Option<Polygon> {
    let everywhere = Polygon::everywhere();
    if polygon.covers(&everywhere) {
        return Some(everywhere);
    }
    if everywhere.covers(polygon) {
        return Some(polygon.clone());
    }
    polygon.intersection(&everywhere)
}

/// Clamps an interval to the index domain.
#[must_use]
pub fn net_interval(interval: &Interval) -> Option<Interval> {
    Interval::everywhen().overlap(interval)
}

/// Extracts one polygon and one interval from the conjuncts of a query.
#[must_use]
pub fn extract(conjuncts: Vec<Filter>, schema: &SchemaDescriptor) -> SpaceTimeQuery {
    let geometry_attr = schema.default_geometry().map(|a| a.name.clone());
    let date_attr = schema.default_date().map(|a| a.name.clone());

    let mut polygon: Option<Polygon> = None;
    let mut interval: Option<Interval> = None;
    let mut residual: Vec<Filter> = Vec::new();

    for conjunct in conjuncts {
        match &conjunct {
            Filter::ExcludeAll => return SpaceTimeQuery::exclude_all(),
            Filter::IncludeAll => {}
            Filter::Spatial {
                relation,
                property,
                geometry,
            } if Some(property.as_str()) == geometry_attr.as_deref() => {
                let Some(bounds) = spatial_bounds(*relation, geometry) else {
                    // Unbounded relation: nothing for the key space.
                    residual.push(conjunct);
                    continue;
                };
                let combined = match &polygon {
                    None => bounds,
                    Some(existing) => match existing.intersection(&bounds) {
                        Some(p) => p,
                        None => return SpaceTimeQuery::exclude_all(),
                    },
                };
                if !fully_absorbed(*relation, geometry) {
                    residual.push(conjunct);
                }
                polygon = Some(combined);
            }
            Filter::Temporal {
                relation,
                property,
                interval: predicate,
            } if Some(property.as_str()) == date_attr.as_deref() => {
                let (bounds, absorbed) = temporal_bounds(*relation, predicate);
                let combined = match &interval {
                    None => bounds,
                    Some(existing) => match existing.overlap(&bounds) {
                        Some(i) => i,
                        None => return SpaceTimeQuery::exclude_all(),
                    },
                };
                if !absorbed {
                    residual.push(conjunct);
                }
                interval = Some(combined);
            }
            _ => residual.push(conjunct),
        }
    }

    let polygon = match polygon {
        Some(p) => match net_polygon(&p) {
            Some(netted) => Some(netted),
            None => return SpaceTimeQuery::exclude_all(),
        },
        None => None,
    };
    let interval = match interval {
        Some(i) => match net_interval(&i) {
            Some(netted) => Some(netted),
            None => return SpaceTimeQuery::exclude_all(),
        },
        None => None,
    };

    debug!(
        spatial = polygon.is_some(),
        temporal = interval.is_some(),
        residual = residual.len(),
        "extracted space-time predicate"
    );

    let residual = match residual.len() {
        0 => Filter::IncludeAll,
        1 => residual.pop().expect("residual has exactly 1 element"),
        _ => Filter::And(residual),
    };

    SpaceTimeQuery {
        polygon,
        interval,
        residual,
    }
}

/// Polygonal bounds contributed by one spatial conjunct, if any.
///
/// `Contains` constrains the *feature* to cover the query geometry, which
/// bounds nothing in the key space.
fn spatial_bounds(relation: SpatialRelation, geometry: &Polygon) -> Option<Polygon> {
    match relation {
        SpatialRelation::Intersects | SpatialRelation::Within | SpatialRelation::BBox => {
            Some(geometry.clone())
        }
        SpatialRelation::Contains => None,
    }
}

/// A spatial conjunct is fully absorbed only when its bounds carry its exact
/// meaning: a rectangular geometry under an intersection-style relation.
fn fully_absorbed(relation: SpatialRelation, geometry: &Polygon) -> bool {
    matches!(
        relation,
        SpatialRelation::BBox | SpatialRelation::Intersects
    ) && geometry.is_rectangle()
}

/// Interval contributed by one temporal conjunct, and whether the conjunct
/// is fully absorbed by it. `Before`/`After` keep their strict endpoints in
/// the residual.
fn temporal_bounds(relation: TemporalRelation, predicate: &Interval) -> (Interval, bool) {
    let everywhen = Interval::everywhen();
    match relation {
        TemporalRelation::During => (*predicate, true),
        TemporalRelation::Equals => (Interval::instant(predicate.start), true),
        TemporalRelation::Before => (Interval::new(everywhen.start, predicate.start), false),
        TemporalRelation::After => (Interval::new(predicate.start, everywhen.end), false),
    }
}
