//! Reprojection and regridding of survey rasters with Zarr V3 output.
//!
//! A projected survey grid is mapped sample by sample into WGS84, which
//! bends it into an irregular point cloud. The cloud is triangulated and
//! linearly interpolated onto a regular longitude/latitude grid, then stored
//! as a Zarr group that xarray can open.
//!
//! # Architecture
//!
//! ```text
//! GXF text
//!      │
//!      ▼
//! gxf_parser::parse_gxf ──► RasterGrid (projected x/y)
//!      │
//!      ▼
//! reproject(&grid, &Transformer) ──► PointCloud (lon/lat, dropped count)
//!      │
//!      ▼
//! regrid(&cloud, &RegridConfig) ──► RegularGeoGrid (NaN outside the hull)
//!      │
//!      ▼
//! Dataset::assemble ──► ZarrWriter::write
//! ```
//!
//! The raster and the point cloud can also be stored on their way through,
//! see [`stage`].
//!
//! # Example
//!
//! ```
//! use grid_processor::{regrid, PointCloud, RegridConfig};
//!
//! // Three samples of the plane v = lon + lat
//! let cloud = PointCloud::from_points(
//!     vec![0.0, 1.0, 0.0],
//!     vec![0.0, 0.0, 1.0],
//!     vec![0.0, 1.0, 1.0],
//! );
//! let config = RegridConfig {
//!     spacing: grid_processor::SpacingStrategy::Fixed { dlon: 0.5, dlat: 0.5 },
//!     ..RegridConfig::default()
//! };
//! let grid = regrid(&cloud, &config).unwrap();
//!
//! assert_eq!(grid.shape(), (3, 3));
//! assert_eq!(grid.get(1, 1), Some(1.0));
//! assert!(grid.get(2, 2).unwrap().is_nan());
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod regrid;
pub mod reproject;
pub mod stage;
pub mod types;
pub mod writer;

// Re-export commonly used types at crate root
pub use config::{RegridConfig, SpacingStrategy, WriterConfig, ZarrCompression};
pub use dataset::{Dataset, DatasetAttributes, DEFAULT_VARIABLE};
pub use error::{GridProcessorError, Result};
pub use pipeline::{
    process, process_stages, run, PipelineConfig, PipelineSummary, ProcessedSurvey,
};
pub use regrid::{estimate_spacing, regrid, LinearInterpolator, Triangulation};
pub use reproject::{reproject, Reprojection};
pub use stage::StageAttributes;
pub use types::{BoundingBox, PointCloud, RegularGeoGrid};
pub use writer::{read_dataset, read_projected, read_reprojected, ZarrWriteResult, ZarrWriter};
