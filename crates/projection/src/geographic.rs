//! Geographic (longitude/latitude) pass-through "projection".
//!
//! Surveys delivered in geographic coordinates still flow through the same
//! pipeline; their planar coordinates are already degrees.

use crate::ellipsoid::Ellipsoid;

/// Identity mapping for grids whose axes are longitude and latitude.
#[derive(Debug, Clone)]
pub struct LongLat {
    ellipsoid: Ellipsoid,
}

impl LongLat {
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        Self { ellipsoid }
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    /// Returns the input unchanged when it is a valid geographic position.
    pub fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        valid(lon, lat).then_some((lon, lat))
    }

    /// Same as [`project`](Self::project).
    pub fn unproject(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        valid(x, y).then_some((x, y))
    }
}

fn valid(lon: f64, lat: f64) -> bool {
    lon.is_finite() && lat.is_finite() && lat.abs() <= 90.0
}
