//! The index-grammar seam: how space-time predicates become byte ranges.
//!
//! The on-disk key layout of the spatio-temporal index belongs to an external
//! collaborator; the planner talks to it through [`IndexGrammar`]. Any regex
//! a grammar derives must be a sound over-approximation of its key plan (no
//! false negatives).
//!
//! [`GridGrammar`] is a deliberately simple in-tree implementation (30-degree
//! cells, daily time buckets) used for tests and demos.

use bytes::Bytes;
use chrono::{DateTime, Datelike, Duration, Utc};

use geostrata_core::encoding;
use geostrata_core::geom::Polygon;

use crate::keyplan::{ByteRange, ColumnFamilyPlan, KeyPlan, KeyPlanningFilter};

/// Expands space-time predicates into the sorted key space.
pub trait IndexGrammar: Send + Sync {
    /// The key-schema format string, passed to the coarse intersect iterator.
    fn format(&self) -> &str;

    /// Row-key ranges covering every record the predicate may match.
    fn key_plan(&self, filter: &KeyPlanningFilter) -> KeyPlan;

    /// Column families to fetch, when the layout encodes a constrained
    /// coordinate in the family.
    fn column_families(&self, filter: &KeyPlanningFilter) -> ColumnFamilyPlan;

    /// Optional row-regex prefilter for the plan.
    fn key_regex(&self, filter: &KeyPlanningFilter, plan: &KeyPlan) -> Option<String>;
}

/// Latitude bands in the grid layout (30 degrees each).
const LAT_BANDS: u32 = 6;
/// Longitude bands in the grid layout (30 degrees each).
const LON_BANDS: u32 = 12;
/// Bucket count above which no date regex is derived.
const MAX_REGEX_BUCKETS: i64 = 16;

/// Grid-cell index grammar: rows are `{lat_band:02}~{yyyymmdd}`, the column
/// family is `{lon_band:02}`.
#[derive(Debug, Clone, Default)]
pub struct GridGrammar;

impl GridGrammar {
    /// Creates the grammar.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn lat_band(lat: f64) -> u32 {
        let band = ((lat + 90.0) / 30.0).floor() as i64;
        band.clamp(0, i64::from(LAT_BANDS) - 1) as u32
    }

    fn lon_band(lon: f64) -> u32 {
        let band = ((lon + 180.0) / 30.0).floor() as i64;
        band.clamp(0, i64::from(LON_BANDS) - 1) as u32
    }

    fn bucket(at: DateTime<Utc>) -> String {
        format!("{:04}{:02}{:02}", at.year(), at.month(), at.day())
    }

    fn lat_bands_of(polygon: &Polygon) -> std::ops::RangeInclusive<u32> {
        let bbox = polygon.bounding_box();
        Self::lat_band(bbox.min_y)..=Self::lat_band(bbox.max_y)
    }

    fn lon_families(polygon: &Polygon) -> ColumnFamilyPlan {
        let bbox = polygon.bounding_box();
        let families = (Self::lon_band(bbox.min_x)..=Self::lon_band(bbox.max_x))
            .map(|band| Bytes::from(format!("{band:02}")))
            .collect();
        ColumnFamilyPlan::List(families)
    }

    fn band_ranges(
        lat_bands: std::ops::RangeInclusive<u32>,
        buckets: Option<(String, String)>,
    ) -> Vec<ByteRange> {
        lat_bands
            .map(|band| match &buckets {
                None => ByteRange::prefix(format!("{band:02}~").as_bytes()),
                Some((first, last)) => {
                    let start = format!("{band:02}~{first}");
                    let end = encoding::successor(format!("{band:02}~{last}").as_bytes())
                        .map(Bytes::from);
                    ByteRange::new(start, end)
                }
            })
            .collect()
    }

    fn bucket_alternation(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<String> {
        let days = (end.date_naive() - start.date_naive()).num_days();
        if !(0..=MAX_REGEX_BUCKETS).contains(&days) {
            return None;
        }
        let buckets: Vec<String> = (0..=days)
            .map(|d| Self::bucket(start + Duration::days(d)))
            .collect();
        Some(format!("^\\d{{2}}~({})", buckets.join("|")))
    }
}

impl IndexGrammar for GridGrammar {
    fn format(&self) -> &str {
        "lat2~day8#lon2"
    }

    fn key_plan(&self, filter: &KeyPlanningFilter) -> KeyPlan {
        let all_bands = 0..=(LAT_BANDS - 1);
        match filter {
            KeyPlanningFilter::AcceptEverything => KeyPlan::AcceptAll,
            KeyPlanningFilter::Date(t) => {
                let b = Self::bucket(*t);
                KeyPlan::Ranges(Self::band_ranges(all_bands, Some((b.clone(), b))))
            }
            KeyPlanningFilter::DateRange(t0, t1) => KeyPlan::Ranges(Self::band_ranges(
                all_bands,
                Some((Self::bucket(*t0), Self::bucket(*t1))),
            )),
            KeyPlanningFilter::Spatial(p) => {
                KeyPlan::Ranges(Self::band_ranges(Self::lat_bands_of(p), None))
            }
            KeyPlanningFilter::SpatialDate(p, t) => {
                let b = Self::bucket(*t);
                KeyPlan::Ranges(Self::band_ranges(Self::lat_bands_of(p), Some((b.clone(), b))))
            }
            KeyPlanningFilter::SpatialDateRange(p, t0, t1) => KeyPlan::Ranges(Self::band_ranges(
                Self::lat_bands_of(p),
                Some((Self::bucket(*t0), Self::bucket(*t1))),
            )),
        }
    }

    fn column_families(&self, filter: &KeyPlanningFilter) -> ColumnFamilyPlan {
        match filter {
            KeyPlanningFilter::Spatial(p)
            | KeyPlanningFilter::SpatialDate(p, _)
            | KeyPlanningFilter::SpatialDateRange(p, _, _) => Self::lon_families(p),
            _ => ColumnFamilyPlan::All,
        }
    }

    fn key_regex(&self, filter: &KeyPlanningFilter, _plan: &KeyPlan) -> Option<String> {
        match filter {
            KeyPlanningFilter::Date(t) => Self::bucket_alternation(*t, *t),
            KeyPlanningFilter::DateRange(t0, t1) => Self::bucket_alternation(*t0, *t1),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geostrata_core::geom::BoundingBox;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_band_math() {
        assert_eq!(GridGrammar::lat_band(-90.0), 0);
        assert_eq!(GridGrammar::lat_band(0.0), 3);
        assert_eq!(GridGrammar::lat_band(90.0), 5);
        assert_eq!(GridGrammar::lon_band(-180.0), 0);
        assert_eq!(GridGrammar::lon_band(180.0), 11);
    }

    #[test]
    fn test_spatial_plan_constrains_bands_and_families() {
        let grammar = GridGrammar::new();
        let poly = BoundingBox::new(-10.0, -10.0, 10.0, 10.0).to_polygon();
        let plan = grammar.key_plan(&KeyPlanningFilter::Spatial(poly.clone()));
        match plan {
            KeyPlan::Ranges(ranges) => {
                // Latitude -10..10 spans bands 02 and 03.
                assert_eq!(ranges.len(), 2);
                assert!(ranges[0].contains_row(b"02~20120101"));
                assert!(!ranges[0].contains_row(b"04~20120101"));
            }
            other => panic!("expected ranges, got {other:?}"),
        }
        match grammar.column_families(&KeyPlanningFilter::Spatial(poly)) {
            ColumnFamilyPlan::List(families) => {
                assert_eq!(families, vec![Bytes::from_static(b"05"), Bytes::from_static(b"06")]);
            }
            ColumnFamilyPlan::All => panic!("expected a family list"),
        }
    }

    #[test]
    fn test_date_plan_covers_all_bands_with_regex() {
        let grammar = GridGrammar::new();
        let filter = KeyPlanningFilter::DateRange(
            ts("2012-01-01T00:00:00Z"),
            ts("2012-01-03T00:00:00Z"),
        );
        let plan = grammar.key_plan(&filter);
        match &plan {
            KeyPlan::Ranges(ranges) => {
                assert_eq!(ranges.len(), 6);
                assert!(ranges[0].contains_row(b"00~20120102"));
                assert!(!ranges[0].contains_row(b"00~20120104"));
            }
            other => panic!("expected ranges, got {other:?}"),
        }
        assert_eq!(
            grammar.key_regex(&filter, &plan),
            Some("^\\d{2}~(20120101|20120102|20120103)".to_string())
        );
    }

    #[test]
    fn test_wide_date_range_has_no_regex() {
        let grammar = GridGrammar::new();
        let filter = KeyPlanningFilter::DateRange(
            ts("2012-01-01T00:00:00Z"),
            ts("2014-01-01T00:00:00Z"),
        );
        let plan = grammar.key_plan(&filter);
        assert_eq!(grammar.key_regex(&filter, &plan), None);
    }
}
