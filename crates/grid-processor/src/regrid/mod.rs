//! Resampling of an irregular point cloud onto a regular lon/lat grid.
//!
//! ```text
//! PointCloud
//!      │
//!      ├─► estimate_spacing (dlon, dlat)
//!      ├─► regular_axis over the cloud bounds
//!      ├─► Triangulation (Delaunay)
//!      └─► LinearInterpolator over every node
//!               │
//!               ▼
//!          RegularGeoGrid (NaN outside the hull)
//! ```

pub mod interpolation;
pub mod spacing;
pub mod triangulation;

use std::time::Instant;

use tracing::{debug, info};

use crate::config::RegridConfig;
use crate::error::{GridProcessorError, Result};
use crate::types::{PointCloud, RegularGeoGrid};

pub use interpolation::LinearInterpolator;
pub use spacing::{estimate_spacing, regular_axis};
pub use triangulation::Triangulation;

/// Interpolate `cloud` onto a regular grid covering its bounding box.
///
/// Nodes outside the convex hull of the cloud are NaN. Nodes that coincide
/// with a sample reproduce its value exactly.
pub fn regrid(cloud: &PointCloud, config: &RegridConfig) -> Result<RegularGeoGrid> {
    let start = Instant::now();
    let points = cloud.len();
    if points < 3 {
        return Err(GridProcessorError::interpolation(
            points,
            "at least 3 points are required to interpolate",
        ));
    }

    let (dlon, dlat) = estimate_spacing(cloud, config.spacing)?;
    let bbox = cloud
        .bounds()
        .ok_or_else(|| GridProcessorError::interpolation(points, "point cloud is empty"))?;

    let nodes = spacing::axis_len(bbox.min_lon, bbox.max_lon, dlon)
        * spacing::axis_len(bbox.min_lat, bbox.max_lat, dlat);
    if !nodes.is_finite() || nodes > config.max_nodes as f64 {
        return Err(GridProcessorError::interpolation(
            points,
            format!(
                "target grid of {} nodes exceeds max_nodes {} (dlon={}, dlat={})",
                nodes, config.max_nodes, dlon, dlat
            ),
        ));
    }

    let lon = regular_axis(bbox.min_lon, bbox.max_lon, dlon);
    let lat = regular_axis(bbox.min_lat, bbox.max_lat, dlat);
    debug!(
        lon_nodes = lon.len(),
        lat_nodes = lat.len(),
        dlon = dlon,
        dlat = dlat,
        "Built target axes"
    );

    let positions: Vec<[f64; 2]> = cloud
        .lon
        .iter()
        .zip(&cloud.lat)
        .map(|(&x, &y)| [x, y])
        .collect();
    let triangulation = Triangulation::new(&positions)?;

    let interpolator = LinearInterpolator::new(&triangulation, &cloud.values);
    let values = interpolator.interpolate_grid(&lon, &lat, config.parallel);

    let grid = RegularGeoGrid {
        lon,
        lat,
        values,
        lon_step: dlon,
        lat_step: dlat,
    };

    info!(
        points = points,
        triangles = triangulation.triangles().len(),
        duplicates = triangulation.duplicates(),
        lat = grid.lat.len(),
        lon = grid.lon.len(),
        valid = grid.valid_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Regridded point cloud"
    );

    Ok(grid)
}
