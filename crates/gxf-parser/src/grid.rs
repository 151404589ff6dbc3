//! Regular raster in projected coordinates.

use crate::error::{GxfError, GxfResult};
use crate::header::GridHeader;

/// A parsed survey raster.
///
/// Values are stored row-major: row 0 is the row at `y_origin`, and each row
/// runs from `x_origin` eastward. Missing samples are NaN.
#[derive(Debug, Clone)]
pub struct RasterGrid {
    header: GridHeader,
    values: Vec<f64>,
}

impl RasterGrid {
    /// Pair a header with its sample buffer.
    pub fn new(header: GridHeader, values: Vec<f64>) -> GxfResult<Self> {
        header.validate()?;
        if values.len() != header.len() {
            return Err(GxfError::TooFewValues {
                expected: header.len(),
                found: values.len(),
            });
        }
        Ok(Self { header, values })
    }

    pub fn header(&self) -> &GridHeader {
        &self.header
    }

    /// Sample values in row-major order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn rows(&self) -> usize {
        self.header.rows
    }

    pub fn cols(&self) -> usize {
        self.header.cols
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at (row, col), or `None` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        Some(self.values[row * self.cols() + col])
    }

    /// Number of samples that are not NaN.
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    /// Column coordinates: `x_origin + col * dx`.
    pub fn x_axis(&self) -> Vec<f64> {
        (0..self.cols())
            .map(|col| self.header.x_origin + col as f64 * self.header.dx)
            .collect()
    }

    /// Row coordinates: `y_origin + row * dy`.
    pub fn y_axis(&self) -> Vec<f64> {
        (0..self.rows())
            .map(|row| self.header.y_origin + row as f64 * self.header.dy)
            .collect()
    }

    /// Projected coordinate of the sample at (row, col).
    ///
    /// The grid rotation is applied counter-clockwise about the origin, so for
    /// an unrotated grid this is simply `(x_axis[col], y_axis[row])`.
    pub fn coordinate(&self, row: usize, col: usize) -> (f64, f64) {
        let h = &self.header;
        let u = col as f64 * h.dx;
        let v = row as f64 * h.dy;

        if h.rotation == 0.0 {
            return (h.x_origin + u, h.y_origin + v);
        }

        let (sin, cos) = h.rotation.to_radians().sin_cos();
        (h.x_origin + u * cos - v * sin, h.y_origin + u * sin + v * cos)
    }
}
