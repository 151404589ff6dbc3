//! Target grid spacing and axis construction.

use tracing::debug;

use crate::config::SpacingStrategy;
use crate::error::{GridProcessorError, Result};
use crate::types::PointCloud;

/// Estimate `(dlon, dlat)` in degrees for the regular output grid.
///
/// Spacings are derived from the reprojected positions of samples that were
/// neighbors in the source raster, so they follow the source resolution.
pub fn estimate_spacing(cloud: &PointCloud, strategy: SpacingStrategy) -> Result<(f64, f64)> {
    let (dlon, dlat) = match strategy {
        SpacingStrategy::FirstCells => first_cells(cloud)?,
        SpacingStrategy::MedianNeighbor => median_neighbor(cloud)?,
        SpacingStrategy::Fixed { dlon, dlat } => (dlon, dlat),
    };

    for (name, step) in [("longitude", dlon), ("latitude", dlat)] {
        if !(step.is_finite() && step > 0.0) {
            return Err(GridProcessorError::interpolation(
                cloud.len(),
                format!("{} spacing must be positive and finite, got {}", name, step),
            ));
        }
    }

    debug!(dlon = dlon, dlat = dlat, strategy = %strategy, "Estimated target spacing");
    Ok((dlon, dlat))
}

/// Longitude step between samples (0,0) and (0,1), latitude step between
/// (0,0) and (1,0). When those samples were dropped the first surviving pair
/// of neighbors in row-major order is used instead.
fn first_cells(cloud: &PointCloud) -> Result<(f64, f64)> {
    let missing = |axis: &str| {
        GridProcessorError::interpolation(
            cloud.len(),
            format!("no pair of {} neighbors survived reprojection", axis),
        )
    };

    let (i, j) = row_neighbors(cloud).next().ok_or_else(|| missing("row"))?;
    let dlon = (cloud.lon[j] - cloud.lon[i]).abs();

    let (i, j) = column_neighbors(cloud).next().ok_or_else(|| missing("column"))?;
    let dlat = (cloud.lat[j] - cloud.lat[i]).abs();

    Ok((dlon, dlat))
}

fn median_neighbor(cloud: &PointCloud) -> Result<(f64, f64)> {
    let mut dlon: Vec<f64> = row_neighbors(cloud)
        .map(|(i, j)| (cloud.lon[j] - cloud.lon[i]).abs())
        .collect();
    let mut dlat: Vec<f64> = column_neighbors(cloud)
        .map(|(i, j)| (cloud.lat[j] - cloud.lat[i]).abs())
        .collect();

    match (median(&mut dlon), median(&mut dlat)) {
        (Some(dlon), Some(dlat)) => Ok((dlon, dlat)),
        _ => Err(GridProcessorError::interpolation(
            cloud.len(),
            "not enough neighboring samples to estimate spacing",
        )),
    }
}

/// Cloud positions `(i, j)` of samples at `(row, col)` and `(row, col + 1)`,
/// in row-major order.
fn row_neighbors(cloud: &PointCloud) -> impl Iterator<Item = (usize, usize)> + '_ {
    let (rows, cols) = cloud.source_shape;
    (0..rows).flat_map(move |row| {
        (0..cols.saturating_sub(1)).filter_map(move |col| {
            Some((cloud.position_of(row, col)?, cloud.position_of(row, col + 1)?))
        })
    })
}

/// Cloud positions of samples at `(row, col)` and `(row + 1, col)`.
fn column_neighbors(cloud: &PointCloud) -> impl Iterator<Item = (usize, usize)> + '_ {
    let (rows, cols) = cloud.source_shape;
    (0..rows.saturating_sub(1)).flat_map(move |row| {
        (0..cols).filter_map(move |col| {
            Some((cloud.position_of(row, col)?, cloud.position_of(row + 1, col)?))
        })
    })
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Regular axis from `min` in steps of `step`, with as many nodes as
/// `arange(min, max + step, step)` produces. The last node is never below
/// `max` by more than round-off.
pub fn regular_axis(min: f64, max: f64, step: f64) -> Vec<f64> {
    let count = ((max + step - min) / step).ceil().max(1.0) as usize;
    (0..count).map(|i| min + i as f64 * step).collect()
}

/// Number of nodes [`regular_axis`] would produce.
pub fn axis_len(min: f64, max: f64, step: f64) -> f64 {
    ((max + step - min) / step).ceil().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cloud over a `rows x cols` raster with lon = col * 0.5, lat = row * 0.25,
    /// skipping the listed flat indices.
    fn cloud(rows: usize, cols: usize, skip: &[usize]) -> PointCloud {
        let mut cloud = PointCloud::with_capacity(rows * cols, (rows, cols));
        for i in 0..rows * cols {
            if !skip.contains(&i) {
                let (row, col) = (i / cols, i % cols);
                cloud.push(col as f64 * 0.5, row as f64 * 0.25, 0.0, i);
            }
        }
        cloud
    }

    #[test]
    fn test_first_cells() {
        let spacing = estimate_spacing(&cloud(3, 4, &[]), SpacingStrategy::FirstCells).unwrap();
        assert_eq!(spacing, (0.5, 0.25));
    }

    #[test]
    fn test_first_cells_uses_absolute_values() {
        let mut c = PointCloud::with_capacity(4, (2, 2));
        c.push(5.0, 10.0, 0.0, 0);
        c.push(4.0, 10.1, 0.0, 1);
        c.push(5.1, 9.0, 0.0, 2);
        c.push(4.1, 9.1, 0.0, 3);
        let (dlon, dlat) = estimate_spacing(&c, SpacingStrategy::FirstCells).unwrap();
        assert_eq!(dlon, 1.0);
        assert_eq!(dlat, 1.0);
    }

    #[test]
    fn test_first_cells_falls_back_when_corner_dropped() {
        // (0,0) missing: row pair comes from (0,1)-(0,2), column pair from (0,1)-(1,1)
        let mut c = PointCloud::with_capacity(6, (2, 3));
        c.push(1.0, 0.0, 0.0, 1);
        c.push(3.0, 0.0, 0.0, 2);
        c.push(0.0, 1.0, 0.0, 3);
        c.push(1.0, 4.0, 0.0, 4);
        c.push(2.0, 1.0, 0.0, 5);
        let spacing = estimate_spacing(&c, SpacingStrategy::FirstCells).unwrap();
        assert_eq!(spacing, (2.0, 4.0));
    }

    #[test]
    fn test_median_neighbor() {
        let mut c = cloud(3, 4, &[]);
        // Distort one sample; the median ignores it
        c.lon[5] += 0.3;
        c.lat[5] += 0.1;
        let spacing = estimate_spacing(&c, SpacingStrategy::MedianNeighbor).unwrap();
        assert_eq!(spacing, (0.5, 0.25));
    }

    #[test]
    fn test_fixed() {
        let strategy = SpacingStrategy::Fixed {
            dlon: 0.01,
            dlat: 0.02,
        };
        assert_eq!(estimate_spacing(&cloud(2, 2, &[]), strategy).unwrap(), (0.01, 0.02));
    }

    #[test]
    fn test_zero_spacing_rejected() {
        let mut c = cloud(2, 2, &[]);
        c.lon[1] = c.lon[0];
        assert!(matches!(
            estimate_spacing(&c, SpacingStrategy::FirstCells),
            Err(GridProcessorError::Interpolation { points: 4, .. })
        ));
    }

    #[test]
    fn test_single_row_has_no_column_neighbors() {
        let c = PointCloud::from_points(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 0.5], vec![0.0; 3]);
        assert!(estimate_spacing(&c, SpacingStrategy::FirstCells).is_err());
    }

    #[test]
    fn test_regular_axis_matches_arange() {
        assert_eq!(regular_axis(10.0, 12.0, 1.0), vec![10.0, 11.0, 12.0]);
        assert_eq!(regular_axis(0.0, 1.0, 0.25), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        // Partial step past max still gets a node
        assert_eq!(regular_axis(0.0, 1.1, 0.5), vec![0.0, 0.5, 1.0, 1.5]);
        assert_eq!(regular_axis(3.0, 3.0, 0.1), vec![3.0]);
        assert_eq!(axis_len(0.0, 1.1, 0.5), 4.0);
    }

    #[test]
    fn test_regular_axis_covers_max() {
        let (min, max, step) = (-114.83, -110.61, 0.0053);
        let axis = regular_axis(min, max, step);
        let last = *axis.last().unwrap();
        assert!(last >= max - 1e-9, "last node {} below max {}", last, max);
        assert!(last < max + step);
        assert!(axis.windows(2).all(|w| w[1] > w[0]));
    }
}
