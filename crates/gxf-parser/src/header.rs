//! Grid header metadata.
//!
//! A [`GridHeader`] describes the geometry of a regular raster in its native
//! projected coordinates. It can be supplied explicitly (for surveys whose
//! header was transcribed by hand) or derived from the keyword blocks that
//! precede the `#GRID` marker in a GXF file.
//!
//! # GXF keyword layout
//!
//! ```text
//! #POINTS
//! 1134
//! #ROWS
//! 1285
//! #PTSEPARATION
//! 500
//! ...
//! #GRID
//! ```
//!
//! Each keyword sits on its own line and its value occupies the following
//! line(s) up to the next keyword.

use serde::{Deserialize, Serialize};

use crate::error::{GxfError, GxfResult};

/// Null sentinel used by USGS GXF grids.
pub const DEFAULT_NULL_VALUE: f64 = -1e32;

fn default_null_value() -> f64 {
    DEFAULT_NULL_VALUE
}

/// Geometry of a regular raster in projected coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridHeader {
    /// Number of rows (GXF `#ROWS`)
    pub rows: usize,
    /// Number of points per row (GXF `#POINTS`)
    pub cols: usize,
    /// X coordinate of the first sample (GXF `#XORIGIN`)
    pub x_origin: f64,
    /// Y coordinate of the first sample (GXF `#YORIGIN`)
    pub y_origin: f64,
    /// Separation between points along a row (GXF `#PTSEPARATION`)
    pub dx: f64,
    /// Separation between rows (GXF `#RWSEPARATION`)
    pub dy: f64,
    /// Counter-clockwise grid rotation in degrees (GXF `#ROTATION`)
    #[serde(default)]
    pub rotation: f64,
    /// Value marking missing samples (GXF `#DUMMY`)
    #[serde(default = "default_null_value")]
    pub null_value: f64,
}

impl GridHeader {
    /// Create an unrotated header with the default null sentinel.
    pub fn new(rows: usize, cols: usize, x_origin: f64, y_origin: f64, dx: f64, dy: f64) -> Self {
        Self {
            rows,
            cols,
            x_origin,
            y_origin,
            dx,
            dy,
            rotation: 0.0,
            null_value: DEFAULT_NULL_VALUE,
        }
    }

    /// Total number of samples (rows x cols).
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// Check if the header describes an empty grid.
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Check that the header describes a non-empty grid with strictly
    /// increasing axes.
    pub fn validate(&self) -> GxfResult<()> {
        if self.is_empty() {
            return Err(GxfError::InvalidHeader(format!(
                "grid size must be at least 1x1, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.rows.checked_mul(self.cols).is_none() {
            return Err(GxfError::InvalidHeader(format!(
                "grid size {}x{} overflows",
                self.rows, self.cols
            )));
        }
        if !(self.dx.is_finite() && self.dx > 0.0) {
            return Err(GxfError::InvalidHeader(format!(
                "dx must be positive, got {}",
                self.dx
            )));
        }
        if !(self.dy.is_finite() && self.dy > 0.0) {
            return Err(GxfError::InvalidHeader(format!(
                "dy must be positive, got {}",
                self.dy
            )));
        }
        if !(self.x_origin.is_finite() && self.y_origin.is_finite() && self.rotation.is_finite())
        {
            return Err(GxfError::InvalidHeader(
                "origin and rotation must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// A single keyword block from the GXF header.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderKeyword {
    /// Keyword name including the leading `#`, upper-cased
    pub name: String,
    /// Value lines joined with single spaces
    pub value: String,
    /// Line on which the keyword appeared
    pub line: usize,
}

/// Keyword blocks collected from the header section of a GXF file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GxfHeader {
    keywords: Vec<HeaderKeyword>,
}

impl GxfHeader {
    /// Start a new keyword block.
    pub(crate) fn begin(&mut self, name: &str, line: usize) {
        self.keywords.push(HeaderKeyword {
            name: name.to_uppercase(),
            value: String::new(),
            line,
        });
    }

    /// Append a value line to the most recent keyword block.
    ///
    /// Lines before the first keyword are ignored.
    pub(crate) fn push_value(&mut self, text: &str) {
        if let Some(keyword) = self.keywords.last_mut() {
            if !keyword.value.is_empty() {
                keyword.value.push(' ');
            }
            keyword.value.push_str(text);
        }
    }

    /// All keyword blocks in file order.
    pub fn keywords(&self) -> &[HeaderKeyword] {
        &self.keywords
    }

    /// Look up a keyword (case-insensitive, with or without the leading `#`).
    pub fn get(&self, name: &str) -> Option<&HeaderKeyword> {
        let wanted = name.trim_start_matches('#');
        self.keywords
            .iter()
            .find(|k| k.name.trim_start_matches('#').eq_ignore_ascii_case(wanted))
    }

    /// Survey title (`#TITLE`) with surrounding quotes removed.
    pub fn title(&self) -> Option<&str> {
        self.get("#TITLE")
            .map(|k| k.value.trim().trim_matches('"').trim())
            .filter(|t| !t.is_empty())
    }

    /// Parse the first token of a keyword value as a number.
    pub fn number(&self, name: &str) -> GxfResult<Option<f64>> {
        let Some(keyword) = self.get(name) else {
            return Ok(None);
        };
        let token = keyword.value.split_whitespace().next().unwrap_or("");
        token
            .parse::<f64>()
            .map(Some)
            .map_err(|_| GxfError::InvalidKeyword {
                keyword: keyword.name.clone(),
                line: keyword.line,
                value: keyword.value.clone(),
            })
    }

    fn count(&self, name: &'static str) -> GxfResult<usize> {
        let value = self.number(name)?.ok_or(GxfError::MissingKeyword(name))?;
        if value < 1.0 || value.fract() != 0.0 || !value.is_finite() {
            // number() succeeded, so the keyword exists
            let keyword = self.get(name).ok_or(GxfError::MissingKeyword(name))?;
            return Err(GxfError::InvalidKeyword {
                keyword: keyword.name.clone(),
                line: keyword.line,
                value: keyword.value.clone(),
            });
        }
        Ok(value as usize)
    }

    /// Build a [`GridHeader`] from the GXF keywords.
    ///
    /// `#POINTS` and `#ROWS` are required. Separations default to 1, origins
    /// and rotation to 0, and the null sentinel to [`DEFAULT_NULL_VALUE`].
    pub fn to_grid_header(&self) -> GxfResult<GridHeader> {
        let header = GridHeader {
            rows: self.count("#ROWS")?,
            cols: self.count("#POINTS")?,
            x_origin: self.number("#XORIGIN")?.unwrap_or(0.0),
            y_origin: self.number("#YORIGIN")?.unwrap_or(0.0),
            dx: self.number("#PTSEPARATION")?.unwrap_or(1.0),
            dy: self.number("#RWSEPARATION")?.unwrap_or(1.0),
            rotation: self.number("#ROTATION")?.unwrap_or(0.0),
            null_value: self.number("#DUMMY")?.unwrap_or(DEFAULT_NULL_VALUE),
        };
        header.validate()?;
        Ok(header)
    }
}
