//! balsync Geo - Geometry adapter
//!
//! Implements the `IGeometry` port from `balsync-core` on top of the
//! `geo` crate. Centroids are vertex means (every point weighs the same,
//! including the vertices of a trace), and boxes are axis-aligned in
//! WGS84 degrees.

use geo::{BoundingRect, Centroid, Coord, MultiPoint, Point};

use balsync_core::domain::{BBox, GeoPoint, LineTrace};
use balsync_core::ports::IGeometry;

/// Errors raised by geometry computations
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// The computation needs at least one point
    #[error("Cannot compute {0} of an empty point set")]
    EmptyInput(&'static str),

    /// The computed point is not a valid WGS84 coordinate
    #[error("Computed point is invalid: {0}")]
    InvalidResult(String),
}

/// `IGeometry` implementation backed by the `geo` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoAdapter;

impl GeoAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn multi_point(points: &[GeoPoint]) -> MultiPoint<f64> {
    points
        .iter()
        .map(|p| Point::new(p.lon(), p.lat()))
        .collect::<Vec<_>>()
        .into()
}

fn to_geo_point(coord: Coord<f64>) -> Result<GeoPoint, GeometryError> {
    GeoPoint::new(coord.x, coord.y).map_err(|e| GeometryError::InvalidResult(e.to_string()))
}

impl IGeometry for GeoAdapter {
    fn centroid(&self, points: &[GeoPoint]) -> anyhow::Result<GeoPoint> {
        let centroid = multi_point(points)
            .centroid()
            .ok_or(GeometryError::EmptyInput("centroid"))?;
        Ok(to_geo_point(centroid.0)?)
    }

    fn trace_centroid(&self, trace: &LineTrace) -> anyhow::Result<GeoPoint> {
        self.centroid(trace.points())
    }

    fn bounding_box(&self, points: &[GeoPoint]) -> anyhow::Result<BBox> {
        let rect = multi_point(points)
            .bounding_rect()
            .ok_or(GeometryError::EmptyInput("bounding box"))?;
        Ok(BBox([rect.min().x, rect.min().y, rect.max().x, rect.max().y]))
    }
}
