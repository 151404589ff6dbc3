//! Core types for grid processing.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Smallest box containing every `(lon, lat)` pair, or `None` when the
    /// iterator is empty.
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut iter = points.into_iter();
        let (lon, lat) = iter.next()?;
        let mut bbox = Self::new(lon, lat, lon, lat);
        for (lon, lat) in iter {
            bbox.min_lon = bbox.min_lon.min(lon);
            bbox.min_lat = bbox.min_lat.min(lat);
            bbox.max_lon = bbox.max_lon.max(lon);
            bbox.max_lat = bbox.max_lat.max(lat);
        }
        Some(bbox)
    }

    /// Get the width in degrees.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Get the height in degrees.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Check if a point is contained within this bounding box.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }
}

/// Irregular samples in the target CRS.
///
/// Entries keep the row-major order of the raster they came from;
/// `source_index` records each sample's flat index in that raster so that
/// dropped samples leave gaps rather than shifting positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    pub values: Vec<f64>,
    pub source_index: Vec<usize>,
    /// Shape `(rows, cols)` of the originating raster.
    pub source_shape: (usize, usize),
}

impl PointCloud {
    pub fn with_capacity(capacity: usize, source_shape: (usize, usize)) -> Self {
        Self {
            lon: Vec::with_capacity(capacity),
            lat: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            source_index: Vec::with_capacity(capacity),
            source_shape,
        }
    }

    /// Build a cloud from bare coordinates, treating it as a single-row
    /// source raster.
    ///
    /// # Panics
    ///
    /// Panics if `lon`, `lat` and `values` differ in length.
    pub fn from_points(lon: Vec<f64>, lat: Vec<f64>, values: Vec<f64>) -> Self {
        assert_eq!(lon.len(), lat.len(), "lon and lat lengths differ");
        assert_eq!(lon.len(), values.len(), "coordinate and value lengths differ");
        let n = lon.len();
        Self {
            lon,
            lat,
            values,
            source_index: (0..n).collect(),
            source_shape: (1, n),
        }
    }

    pub fn push(&mut self, lon: f64, lat: f64, value: f64, source_index: usize) {
        self.lon.push(lon);
        self.lat.push(lat);
        self.values.push(value);
        self.source_index.push(source_index);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.lon.iter().copied().zip(self.lat.iter().copied()))
    }

    /// Position in the cloud of the sample that came from raster cell
    /// `(row, col)`, if it survived reprojection.
    pub fn position_of(&self, row: usize, col: usize) -> Option<usize> {
        let (rows, cols) = self.source_shape;
        if row >= rows || col >= cols {
            return None;
        }
        self.source_index.binary_search(&(row * cols + col)).ok()
    }

    /// Scatter a per-sample field back onto the source raster, row-major.
    /// Cells whose sample was dropped are NaN.
    pub fn dense_field(&self, field: &[f64]) -> Vec<f64> {
        let (rows, cols) = self.source_shape;
        let mut dense = vec![f64::NAN; rows * cols];
        for (&index, &value) in self.source_index.iter().zip(field) {
            if let Some(cell) = dense.get_mut(index) {
                *cell = value;
            }
        }
        dense
    }
}

/// Values on a regular longitude/latitude grid.
///
/// `values` is row-major with latitude as the slow axis, so
/// `values[i * lon.len() + j]` sits at `(lon[j], lat[i])`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularGeoGrid {
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    pub values: Vec<f64>,
    /// Longitude spacing (degrees)
    pub lon_step: f64,
    /// Latitude spacing (degrees)
    pub lat_step: f64,
}

impl RegularGeoGrid {
    /// Shape `(lat, lon)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }

    pub fn get(&self, lat_index: usize, lon_index: usize) -> Option<f64> {
        if lat_index >= self.lat.len() || lon_index >= self.lon.len() {
            return None;
        }
        self.values.get(lat_index * self.lon.len() + lon_index).copied()
    }

    /// Number of non-NaN nodes.
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        Some(BoundingBox::new(
            *self.lon.first()?,
            *self.lat.first()?,
            *self.lon.last()?,
            *self.lat.last()?,
        ))
    }
}
