//! Relocation of raster samples into the target geographic CRS.
//!
//! A conic projection bends a regular planar grid into a curvilinear one, so
//! the result is an irregular [`PointCloud`] rather than a grid. Values are
//! carried through untouched.

use gxf_parser::RasterGrid;
use projection::Transformer;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::types::PointCloud;

/// Outcome of reprojecting a raster.
#[derive(Debug, Clone)]
pub struct Reprojection {
    pub cloud: PointCloud,
    /// Samples whose coordinates fell outside the transform's domain.
    pub dropped: usize,
}

/// Transform every sample position of `grid` with `transformer`.
///
/// Samples whose transform fails are left out of the cloud and counted in
/// [`Reprojection::dropped`]. With `parallel` set, coordinates are computed
/// on the rayon pool; the output is identical to the sequential path.
pub fn reproject(grid: &RasterGrid, transformer: &Transformer, parallel: bool) -> Reprojection {
    let (rows, cols) = (grid.rows(), grid.cols());
    let n = rows * cols;

    let transform = |i: usize| {
        let (x, y) = grid.coordinate(i / cols, i % cols);
        transformer.forward(x, y).ok()
    };

    let positions: Vec<Option<(f64, f64)>> = if parallel {
        (0..n).into_par_iter().map(transform).collect()
    } else {
        (0..n).map(transform).collect()
    };

    let mut cloud = PointCloud::with_capacity(n, (rows, cols));
    let mut dropped = 0;
    for (i, (position, &value)) in positions.into_iter().zip(grid.values()).enumerate() {
        match position {
            Some((lon, lat)) => cloud.push(lon, lat, value, i),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(
            dropped = dropped,
            total = n,
            "Samples outside the projection domain were dropped"
        );
    }
    if let Some(bbox) = cloud.bounds() {
        debug!(
            min_lon = bbox.min_lon,
            max_lon = bbox.max_lon,
            min_lat = bbox.min_lat,
            max_lat = bbox.max_lat,
            "Reprojected extent"
        );
    }
    info!(
        samples = cloud.len(),
        dropped = dropped,
        source = %transformer.source().family(),
        target = %transformer.target(),
        "Reprojected raster"
    );

    Reprojection { cloud, dropped }
}
