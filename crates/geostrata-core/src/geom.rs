//! Planar geometry primitives used for key planning.
//!
//! The planner only ever reasons about polygonal *bounds*: spatial conjuncts
//! are combined by intersecting their bounding boxes, and the result is
//! clamped ("netted") to the index domain [`BoundingBox::EVERYWHERE`]. Exact
//! geometry semantics are enforced downstream by the server-side iterators,
//! so everything here is a sound over-approximation.

use serde::{Deserialize, Serialize};

/// A longitude/latitude coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    /// Creates a coordinate from `(x, y)` degrees.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// The whole-world rectangle: the domain every spatial predicate is
    /// clamped to before key planning.
    pub const EVERYWHERE: BoundingBox = BoundingBox {
        min_x: -180.0,
        min_y: -90.0,
        max_x: 180.0,
        max_y: 90.0,
    };

    /// Creates a bounding box from min/max corners.
    #[must_use]
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Returns true when `other` lies entirely inside this box.
    #[must_use]
    pub fn covers(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    /// Intersection of two boxes, or `None` when they are disjoint.
    #[must_use]
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let min_x = self.min_x.max(other.min_x);
        let min_y = self.min_y.max(other.min_y);
        let max_x = self.max_x.min(other.max_x);
        let max_y = self.max_y.min(other.max_y);
        if min_x > max_x || min_y > max_y {
            return None;
        }
        Some(BoundingBox::new(min_x, min_y, max_x, max_y))
    }

    /// Materializes the box as a closed rectangular polygon.
    #[must_use]
    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(vec![
            Coordinate::new(self.min_x, self.min_y),
            Coordinate::new(self.max_x, self.min_y),
            Coordinate::new(self.max_x, self.max_y),
            Coordinate::new(self.min_x, self.max_y),
            Coordinate::new(self.min_x, self.min_y),
        ])
    }
}

/// A simple polygon described by its closed exterior ring.
///
/// Rings are stored as given; the first and last coordinate are expected to
/// coincide. Holes are not represented: key planning only consumes bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    exterior: Vec<Coordinate>,
}

impl Polygon {
    /// Creates a polygon from a closed exterior ring.
    #[must_use]
    pub fn new(exterior: Vec<Coordinate>) -> Self {
        Self { exterior }
    }

    /// The whole-world polygon.
    #[must_use]
    pub fn everywhere() -> Self {
        BoundingBox::EVERYWHERE.to_polygon()
    }

    /// The closed exterior ring.
    #[must_use]
    pub fn exterior(&self) -> &[Coordinate] {
        &self.exterior
    }

    /// Bounding box of the exterior ring.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for c in &self.exterior {
            bbox.min_x = bbox.min_x.min(c.x);
            bbox.min_y = bbox.min_y.min(c.y);
            bbox.max_x = bbox.max_x.max(c.x);
            bbox.max_y = bbox.max_y.max(c.y);
        }
        bbox
    }

    /// True when the exterior ring is exactly the ring of its own bounding
    /// box, i.e. the polygon carries no more information than its bounds.
    #[must_use]
    pub fn is_rectangle(&self) -> bool {
        if self.exterior.len() != 5 {
            return false;
        }
        let bbox = self.bounding_box();
        self.exterior.iter().all(|c| {
            (c.x == bbox.min_x || c.x == bbox.max_x) && (c.y == bbox.min_y || c.y == bbox.max_y)
        })
    }

    /// True when this polygon's bounds cover `other`'s bounds.
    #[must_use]
    pub fn covers(&self, other: &Polygon) -> bool {
        self.bounding_box().covers(&other.bounding_box())
    }

    /// Intersection of polygonal bounds, or `None` when disjoint.
    #[must_use]
    pub fn intersection(&self, other: &Polygon) -> Option<Polygon> {
        self.bounding_box()
            .intersection(&other.bounding_box())
            .map(|b| b.to_polygon())
    }

    /// Renders the polygon as WKT, e.g. `POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))`.
    #[must_use]
    pub fn to_wkt(&self) -> String {
        let ring = self
            .exterior
            .iter()
            .map(|c| format!("{} {}", c.x, c.y))
            .collect::<Vec<_>>()
            .join(", ");
        format!("POLYGON (({ring}))")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Polygon {
        BoundingBox::new(0.0, 0.0, 1.0, 1.0).to_polygon()
    }

    #[test]
    fn test_bbox_intersection() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        assert_eq!(
            a.intersection(&b),
            Some(BoundingBox::new(5.0, 5.0, 10.0, 10.0))
        );

        let disjoint = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.intersection(&disjoint), None);
    }

    #[test]
    fn test_bbox_covers() {
        let outer = BoundingBox::new(-10.0, -10.0, 10.0, 10.0);
        let inner = BoundingBox::new(-1.0, -1.0, 1.0, 1.0);
        assert!(outer.covers(&inner));
        assert!(!inner.covers(&outer));
        assert!(BoundingBox::EVERYWHERE.covers(&outer));
    }

    #[test]
    fn test_rectangle_detection() {
        assert!(unit_square().is_rectangle());

        let triangle = Polygon::new(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1.0, 0.0),
            Coordinate::new(0.5, 1.0),
            Coordinate::new(0.0, 0.0),
        ]);
        assert!(!triangle.is_rectangle());
    }

    #[test]
    fn test_wkt_rendering() {
        assert_eq!(
            unit_square().to_wkt(),
            "POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))"
        );
    }

    #[test]
    fn test_polygon_bounds_intersection() {
        let a = BoundingBox::new(45.0, 23.0, 48.0, 27.0).to_polygon();
        let b = BoundingBox::new(46.0, 20.0, 50.0, 25.0).to_polygon();
        let clipped = a.intersection(&b).unwrap();
        assert_eq!(
            clipped.bounding_box(),
            BoundingBox::new(46.0, 23.0, 48.0, 25.0)
        );
    }
}
