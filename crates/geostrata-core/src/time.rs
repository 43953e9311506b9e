//! Temporal intervals and the index time domain.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A closed time interval `[start, end]` in UTC.
///
/// An interval whose endpoints coincide is an *instant*; the key planner
/// treats the two shapes differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    /// Creates an interval from its endpoints.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Creates a degenerate interval covering a single instant.
    #[must_use]
    pub const fn instant(at: DateTime<Utc>) -> Self {
        Self {
            start: at,
            end: at,
        }
    }

    /// The full representable time domain of the index: everything a
    /// temporal predicate is clamped to before key planning.
    #[must_use]
    pub fn everywhen() -> Self {
        let start = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
        Self { start, end }
    }

    /// True when the interval covers a single instant.
    #[must_use]
    pub fn is_instant(&self) -> bool {
        self.start == self.end
    }

    /// True when the interval is inverted and therefore matches nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Overlap of two intervals, or `None` when they are disjoint.
    #[must_use]
    pub fn overlap(&self, other: &Interval) -> Option<Interval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end < start {
            return None;
        }
        Some(Interval { start, end })
    }

    /// Endpoints as epoch milliseconds, for iterator configuration.
    #[must_use]
    pub fn epoch_millis(&self) -> (i64, i64) {
        (self.start.timestamp_millis(), self.end.timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_instant_detection() {
        let at = ts("2012-01-01T11:00:00Z");
        assert!(Interval::instant(at).is_instant());
        assert!(!Interval::new(at, ts("2012-01-02T11:00:00Z")).is_instant());
    }

    #[test]
    fn test_overlap() {
        let a = Interval::new(ts("2012-01-01T00:00:00Z"), ts("2012-06-01T00:00:00Z"));
        let b = Interval::new(ts("2012-03-01T00:00:00Z"), ts("2012-09-01T00:00:00Z"));
        let o = a.overlap(&b).unwrap();
        assert_eq!(o.start, ts("2012-03-01T00:00:00Z"));
        assert_eq!(o.end, ts("2012-06-01T00:00:00Z"));

        let disjoint = Interval::new(ts("2013-01-01T00:00:00Z"), ts("2013-02-01T00:00:00Z"));
        assert!(a.overlap(&disjoint).is_none());
    }

    #[test]
    fn test_everywhen_clamps() {
        let narrow = Interval::new(ts("2012-01-01T00:00:00Z"), ts("2014-01-01T00:00:00Z"));
        assert_eq!(Interval::everywhen().overlap(&narrow), Some(narrow));
    }
}
