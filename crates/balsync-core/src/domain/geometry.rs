//! Geometry value types
//!
//! Plain WGS84 values carried by voies, numeros and toponymes.
//! Computations over them (centroid, bounding box) live behind the
//! [`IGeometry`](crate::ports::IGeometry) port.

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// A WGS84 point, longitude first
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    lon: f64,
    lat: f64,
}

impl GeoPoint {
    /// Create a new point
    ///
    /// # Errors
    /// Returns error if the coordinates are not finite or out of range
    pub fn new(lon: f64, lat: f64) -> Result<Self, DomainError> {
        if !lon.is_finite() || !lat.is_finite() || lon.abs() > 180.0 || lat.abs() > 90.0 {
            return Err(DomainError::InvalidCoordinates(format!("[{lon}, {lat}]")));
        }
        Ok(Self { lon, lat })
    }

    /// Longitude in degrees
    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Latitude in degrees
    pub fn lat(&self) -> f64 {
        self.lat
    }
}

/// Line geometry drawn for a voie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<GeoPoint>", into = "Vec<GeoPoint>")]
pub struct LineTrace(Vec<GeoPoint>);

impl LineTrace {
    /// Create a trace from its vertices
    ///
    /// # Errors
    /// Returns error if fewer than two vertices are supplied
    pub fn new(points: Vec<GeoPoint>) -> Result<Self, DomainError> {
        if points.len() < 2 {
            return Err(DomainError::ValidationFailed(
                "A trace needs at least two points".to_string(),
            ));
        }
        Ok(Self(points))
    }

    /// The trace vertices, in drawing order
    pub fn points(&self) -> &[GeoPoint] {
        &self.0
    }
}

impl TryFrom<Vec<GeoPoint>> for LineTrace {
    type Error = DomainError;

    fn try_from(value: Vec<GeoPoint>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LineTrace> for Vec<GeoPoint> {
    fn from(trace: LineTrace) -> Self {
        trace.0
    }
}

/// Axis-aligned box `[minX, minY, maxX, maxY]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox(pub [f64; 4]);

impl BBox {
    /// Minimum longitude
    pub fn min_x(&self) -> f64 {
        self.0[0]
    }

    /// Minimum latitude
    pub fn min_y(&self) -> f64 {
        self.0[1]
    }

    /// Maximum longitude
    pub fn max_x(&self) -> f64 {
        self.0[2]
    }

    /// Maximum latitude
    pub fn max_y(&self) -> f64 {
        self.0[3]
    }
}
