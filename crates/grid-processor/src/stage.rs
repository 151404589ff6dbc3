//! Intermediate products of the pipeline and their stored form.
//!
//! Two stages can be kept alongside the regridded dataset:
//!
//! ```text
//! projected     /<variable> f64 [y, x]   raster values in the survey CRS
//!               /x, /y      f64 [x], [y] lattice axes in CRS units
//! reprojected   /<variable> f64 [y, x]   raster values
//!               /lon, /lat  f64 [y, x]   WGS84 position of every sample
//! ```
//!
//! In the reprojected group, cells whose sample was dropped during
//! reprojection are NaN in all three arrays.

use serde::{Deserialize, Serialize};

use crate::dataset::attribute_map;
use crate::error::Result;

/// Dimension names of stage arrays, slow axis first.
pub const RASTER_DIMENSIONS: [&str; 2] = ["y", "x"];

/// Group attributes of a stored stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageAttributes {
    pub description: String,
    /// Pixel spacing of the survey raster along x, in its CRS units.
    pub dx: f64,
    /// Pixel spacing of the survey raster along y, in its CRS units.
    pub dy: f64,
    /// Counter-clockwise lattice rotation in degrees. The stored x/y axes
    /// are the unrotated lattice.
    #[serde(default)]
    pub rotation: f64,
    /// WKT of the CRS the stage's coordinates are expressed in.
    pub proj_wkt: String,
    /// WKT of the survey CRS, for stages that left it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_proj_wkt: Option<String>,
    #[serde(default)]
    pub dropped_samples: usize,
}

impl StageAttributes {
    pub fn to_json_map(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        attribute_map(self)
    }

    pub fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(map.clone()))?)
    }
}
