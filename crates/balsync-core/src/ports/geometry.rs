//! Geometry port (driven/secondary port)
//!
//! Pure geometric computations used by the cascade rules. Implementations
//! are synchronous; a failure aborts the mutation that needed the result.

use crate::domain::{BBox, GeoPoint, LineTrace};

/// Port trait for centroid and bounding-box computations
pub trait IGeometry: Send + Sync {
    /// Centroid of a set of points
    ///
    /// # Errors
    /// Fails on an empty set
    fn centroid(&self, points: &[GeoPoint]) -> anyhow::Result<GeoPoint>;

    /// Centroid of a voie trace
    fn trace_centroid(&self, trace: &LineTrace) -> anyhow::Result<GeoPoint>;

    /// Bounding box `[minX, minY, maxX, maxY]` of a set of points
    ///
    /// # Errors
    /// Fails on an empty set
    fn bounding_box(&self, points: &[GeoPoint]) -> anyhow::Result<BBox>;

    /// Bounding box of a voie trace
    fn trace_bounding_box(&self, trace: &LineTrace) -> anyhow::Result<BBox> {
        self.bounding_box(trace.points())
    }
}
