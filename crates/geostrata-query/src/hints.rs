//! Query hints: projection/transform requests and density aggregations.

use geostrata_core::error::{Error, Result};
use geostrata_core::geom::BoundingBox;
use geostrata_core::schema::SchemaDescriptor;
use geostrata_core::time::Interval;

/// Optional hints attached to a query by the caller.
///
/// Density and temporal density are *requests*; their parameters are checked
/// at compile time so a misconfigured plan never reaches the store.
#[derive(Debug, Clone, Default)]
pub struct QueryHints {
    /// Request a density aggregation.
    pub density: bool,
    /// Envelope of the density grid.
    pub density_envelope: Option<BoundingBox>,
    /// Density grid width in cells.
    pub density_width: Option<u32>,
    /// Density grid height in cells.
    pub density_height: Option<u32>,

    /// Request a temporal density aggregation.
    pub temporal_density: bool,
    /// Interval of the temporal density histogram.
    pub time_interval: Option<Interval>,
    /// Bucket count of the temporal density histogram.
    pub time_buckets: Option<u32>,

    /// Property transforms to apply server-side.
    pub transform: Option<TransformHints>,

    /// Overrides the configured feature encoding.
    pub feature_encoding: Option<String>,
}

/// A server-side projection/transform request.
#[derive(Debug, Clone)]
pub struct TransformHints {
    /// Transform definitions, e.g. `derived=strConcat(attr1, attr2)`.
    pub definitions: Vec<String>,
    /// Schema of the transformed features.
    pub schema: SchemaDescriptor,
}

/// Validated density parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityParams {
    pub envelope: BoundingBox,
    pub width: u32,
    pub height: u32,
}

/// Validated temporal density parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalDensityParams {
    pub interval: Interval,
    pub buckets: u32,
}

impl QueryHints {
    /// True when any aggregation stage is requested.
    #[must_use]
    pub fn aggregating(&self) -> bool {
        self.density || self.temporal_density
    }

    /// Resolves the density request, if one was made.
    pub fn density_params(&self) -> Result<Option<DensityParams>> {
        if !self.density {
            return Ok(None);
        }
        let envelope = self
            .density_envelope
            .ok_or_else(|| Error::configuration("density plan requires an envelope"))?;
        let width = self
            .density_width
            .ok_or_else(|| Error::configuration("density plan requires a width"))?;
        let height = self
            .density_height
            .ok_or_else(|| Error::configuration("density plan requires a height"))?;
        Ok(Some(DensityParams {
            envelope,
            width,
            height,
        }))
    }

    /// Resolves the temporal density request, if one was made.
    pub fn temporal_density_params(&self) -> Result<Option<TemporalDensityParams>> {
        if !self.temporal_density {
            return Ok(None);
        }
        let interval = self
            .time_interval
            .ok_or_else(|| Error::configuration("temporal density plan requires an interval"))?;
        let buckets = self
            .time_buckets
            .ok_or_else(|| Error::configuration("temporal density plan requires a bucket count"))?;
        Ok(Some(TemporalDensityParams { interval, buckets }))
    }
}
