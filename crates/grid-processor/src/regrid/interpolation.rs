//! Piecewise-linear interpolation over a triangulation.

use rayon::prelude::*;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{Envelope, RTree, RTreeObject, SelectionFunction, AABB};

use super::triangulation::Triangulation;

/// Barycentric coordinates within this distance below zero still count as
/// inside, so nodes exactly on an edge or vertex are not lost to round-off.
const BARYCENTRIC_TOLERANCE: f64 = 1e-10;

type TriangleEnvelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Selects tree entries whose bounding box contains a point.
struct ContainsPoint([f64; 2]);

impl SelectionFunction<TriangleEnvelope> for ContainsPoint {
    fn should_unpack_parent(&self, envelope: &AABB<[f64; 2]>) -> bool {
        envelope.contains_point(&self.0)
    }

    fn should_unpack_leaf(&self, leaf: &TriangleEnvelope) -> bool {
        leaf.envelope().contains_point(&self.0)
    }
}

/// Linear interpolator over the triangles of a [`Triangulation`].
///
/// Triangles are located through an R-tree of their bounding boxes.
pub struct LinearInterpolator<'a> {
    triangulation: &'a Triangulation,
    values: &'a [f64],
    index: RTree<TriangleEnvelope>,
}

impl<'a> LinearInterpolator<'a> {
    /// `values[i]` is the sample at `triangulation.points()[i]`.
    pub fn new(triangulation: &'a Triangulation, values: &'a [f64]) -> Self {
        let envelopes = (0..triangulation.triangles().len())
            .map(|t| {
                let [a, b, c] = triangulation.corners(t);
                let lower = [a[0].min(b[0]).min(c[0]), a[1].min(b[1]).min(c[1])];
                let upper = [a[0].max(b[0]).max(c[0]), a[1].max(b[1]).max(c[1])];
                GeomWithData::new(Rectangle::from_corners(lower, upper), t)
            })
            .collect();

        Self {
            triangulation,
            values,
            index: RTree::bulk_load(envelopes),
        }
    }

    /// Interpolated value at `(x, y)`.
    ///
    /// NaN outside the convex hull of the points, and NaN when any corner of
    /// the containing triangle carries NaN.
    pub fn interpolate(&self, x: f64, y: f64) -> f64 {
        let p = [x, y];
        for envelope in self.index.locate_with_selection_function(ContainsPoint(p)) {
            let t = envelope.data;
            if let Some(weights) = barycentric(self.triangulation.corners(t), p) {
                let [a, b, c] = self.triangulation.triangles()[t];
                let (va, vb, vc) = (self.values[a], self.values[b], self.values[c]);
                if va.is_nan() || vb.is_nan() || vc.is_nan() {
                    return f64::NAN;
                }
                return weights[0] * va + weights[1] * vb + weights[2] * vc;
            }
        }
        f64::NAN
    }

    /// Evaluate on every node of the lattice `lon x lat`, latitude-major.
    pub fn interpolate_grid(&self, lon: &[f64], lat: &[f64], parallel: bool) -> Vec<f64> {
        let row = |&y: &f64| lon.iter().map(|&x| self.interpolate(x, y)).collect::<Vec<_>>();

        let rows: Vec<Vec<f64>> = if parallel {
            lat.par_iter().map(row).collect()
        } else {
            lat.iter().map(row).collect()
        };
        rows.concat()
    }
}

/// Barycentric weights of `p` in the triangle, or `None` when `p` is
/// outside it.
fn barycentric(corners: [[f64; 2]; 3], p: [f64; 2]) -> Option<[f64; 3]> {
    let [a, b, c] = corners;
    let det = (b[1] - c[1]) * (a[0] - c[0]) + (c[0] - b[0]) * (a[1] - c[1]);
    if det == 0.0 {
        return None;
    }

    let l1 = ((b[1] - c[1]) * (p[0] - c[0]) + (c[0] - b[0]) * (p[1] - c[1])) / det;
    let l2 = ((c[1] - a[1]) * (p[0] - c[0]) + (a[0] - c[0]) * (p[1] - c[1])) / det;
    let l3 = 1.0 - l1 - l2;

    let inside = l1 >= -BARYCENTRIC_TOLERANCE
        && l2 >= -BARYCENTRIC_TOLERANCE
        && l3 >= -BARYCENTRIC_TOLERANCE;
    inside.then_some([l1, l2, l3])
}
