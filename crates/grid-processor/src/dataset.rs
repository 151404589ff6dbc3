//! The regridded dataset and its attribute block.

use serde::{Deserialize, Serialize};

use crate::error::{GridProcessorError, Result};
use crate::types::RegularGeoGrid;

/// Name of the value variable unless configured otherwise.
pub const DEFAULT_VARIABLE: &str = "tfa";

/// Dimension names of the value array, slow axis first.
pub const DIMENSIONS: [&str; 2] = ["lat", "lon"];

/// Attributes stored alongside the regridded values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetAttributes {
    /// Free-text description of the survey.
    pub description: String,
    /// Pixel spacing of the originating raster along x, in its CRS units.
    pub dx: f64,
    /// Pixel spacing of the originating raster along y, in its CRS units.
    pub dy: f64,
    /// WKT of the geographic CRS the values are referenced to.
    pub proj_wkt: String,
    /// WKT of the projected CRS the survey was delivered in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_proj_wkt: Option<String>,
    /// Longitude spacing of the regular grid (degrees).
    #[serde(default)]
    pub lon_step: f64,
    /// Latitude spacing of the regular grid (degrees).
    #[serde(default)]
    pub lat_step: f64,
    /// Samples lost to reprojection failures.
    #[serde(default)]
    pub dropped_samples: usize,
}

impl DatasetAttributes {
    /// Attributes as a JSON object, the form Zarr stores them in.
    pub fn to_json_map(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        attribute_map(self)
    }

    /// Parse attributes back from a Zarr attribute object.
    pub fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(map.clone()))?)
    }
}

/// Serialize an attribute struct into a JSON object.
///
/// JSON has no NaN or infinity and serde_json encodes them as `null`, which
/// would not parse back, so any `null` entry is an error.
pub(crate) fn attribute_map<T: Serialize>(
    attributes: &T,
) -> Result<serde_json::Map<String, serde_json::Value>> {
    let map = match serde_json::to_value(attributes)? {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(GridProcessorError::storage(format!(
                "attributes must serialize to an object, got {}",
                other
            )))
        }
    };
    if let Some((key, _)) = map.iter().find(|(_, value)| value.is_null()) {
        return Err(GridProcessorError::storage(format!(
            "attribute {:?} has no JSON representation",
            key
        )));
    }
    Ok(map)
}

/// A regular lon/lat grid with its attributes. Immutable once assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    variable: String,
    grid: RegularGeoGrid,
    attributes: DatasetAttributes,
}

impl Dataset {
    /// Combine a regridded grid with its attributes under the default
    /// variable name.
    pub fn assemble(grid: RegularGeoGrid, attributes: DatasetAttributes) -> Self {
        let mut attributes = attributes;
        attributes.lon_step = grid.lon_step;
        attributes.lat_step = grid.lat_step;
        Self {
            variable: DEFAULT_VARIABLE.to_string(),
            grid,
            attributes,
        }
    }

    /// Rename the value variable.
    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = variable.into();
        self
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn grid(&self) -> &RegularGeoGrid {
        &self.grid
    }

    pub fn attributes(&self) -> &DatasetAttributes {
        &self.attributes
    }

    pub fn lon(&self) -> &[f64] {
        &self.grid.lon
    }

    pub fn lat(&self) -> &[f64] {
        &self.grid.lat
    }

    /// Values, latitude-major.
    pub fn values(&self) -> &[f64] {
        &self.grid.values
    }

    /// Shape `(lat, lon)`.
    pub fn shape(&self) -> (usize, usize) {
        self.grid.shape()
    }
}
