//! Incremental Delaunay triangulation (Bowyer-Watson).
//!
//! Points are inserted in the order given into a triangulation seeded with a
//! large "super" triangle. Each insertion removes the triangles whose
//! circumcircle contains the new point and fans the resulting cavity from it.
//! Triangles touching the super triangle are discarded at the end, leaving a
//! triangulation of the convex hull.
//!
//! Arithmetic runs on coordinates mapped into the unit square, which keeps
//! the orientation and in-circle determinants well scaled for both degree
//! and meter inputs. The cavity is grown until it is star-shaped around the
//! new point, so round-off in the in-circle test can cost Delaunay quality
//! but never produces overlapping triangles.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{GridProcessorError, Result};

/// Half-size of the super triangle in unit-square coordinates.
const SUPER_TRIANGLE_SCALE: f64 = 1.0e5;

/// Squared normalized distance under which points are treated as coincident.
const COINCIDENT_EPSILON: f64 = 1.0e-24;

#[derive(Debug, Clone)]
struct Triangle {
    /// Vertices in counter-clockwise order
    v: [usize; 3],
    /// `n[i]` is the neighbor across the edge opposite `v[i]`
    n: [Option<usize>; 3],
    alive: bool,
}

/// A Delaunay triangulation of a planar point set.
#[derive(Debug, Clone)]
pub struct Triangulation {
    points: Vec<[f64; 2]>,
    triangles: Vec<[usize; 3]>,
    duplicates: usize,
}

impl Triangulation {
    /// Triangulate `points`, given as `[x, y]` pairs.
    ///
    /// Fails with [`GridProcessorError::Interpolation`] when fewer than three
    /// distinct points are given, when coordinates are not finite, or when
    /// all points are collinear.
    pub fn new(points: &[[f64; 2]]) -> Result<Self> {
        let count = points.len();
        if count < 3 {
            return Err(GridProcessorError::interpolation(
                count,
                "at least 3 points are required to triangulate",
            ));
        }
        if points.iter().flatten().any(|c| !c.is_finite()) {
            return Err(GridProcessorError::interpolation(
                count,
                "point coordinates must be finite",
            ));
        }

        let mut builder = Builder::new(points);
        let scale = builder.scale;
        if scale == 0.0 {
            return Err(GridProcessorError::interpolation(
                count,
                "all points are coincident",
            ));
        }

        for index in 0..count {
            builder.insert(index)?;
        }

        let triangles = builder.finish();
        if triangles.is_empty() {
            return Err(GridProcessorError::interpolation(
                count,
                "points are collinear",
            ));
        }

        debug!(
            points = count,
            triangles = triangles.len(),
            duplicates = builder.duplicates,
            "Triangulated point set"
        );

        Ok(Self {
            points: points.to_vec(),
            triangles,
            duplicates: builder.duplicates,
        })
    }

    /// The input points.
    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    /// Triangles as counter-clockwise triples of point indices.
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Number of input points skipped because they repeat an earlier point.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Corner coordinates of triangle `t`.
    pub fn corners(&self, t: usize) -> [[f64; 2]; 3] {
        let [a, b, c] = self.triangles[t];
        [self.points[a], self.points[b], self.points[c]]
    }
}

struct Builder {
    /// Normalized input points followed by the three super vertices
    pts: Vec<[f64; 2]>,
    real: usize,
    scale: f64,
    tris: Vec<Triangle>,
    free: Vec<usize>,
    /// Triangle to start the next point location walk from
    last: usize,
    /// Per-triangle stamp marking membership in the current cavity
    mark: Vec<u64>,
    epoch: u64,
    duplicates: usize,
}

impl Builder {
    fn new(points: &[[f64; 2]]) -> Self {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &[x, y] in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let scale = (max_x - min_x).max(max_y - min_y);

        let mut pts: Vec<[f64; 2]> = if scale > 0.0 {
            points
                .iter()
                .map(|&[x, y]| [(x - min_x) / scale, (y - min_y) / scale])
                .collect()
        } else {
            Vec::new()
        };

        let real = points.len();
        let r = SUPER_TRIANGLE_SCALE;
        pts.extend_from_slice(&[[-r, -r], [r, -r], [0.5, r]]);

        let seed = Triangle {
            v: [real, real + 1, real + 2],
            n: [None; 3],
            alive: true,
        };

        Self {
            pts,
            real,
            scale,
            tris: vec![seed],
            free: Vec::new(),
            last: 0,
            mark: vec![0],
            epoch: 0,
            duplicates: 0,
        }
    }

    fn orient(&self, a: usize, b: usize, p: [f64; 2]) -> f64 {
        let [ax, ay] = self.pts[a];
        let [bx, by] = self.pts[b];
        (bx - ax) * (p[1] - ay) - (by - ay) * (p[0] - ax)
    }

    /// Positive when `p` lies strictly inside the circumcircle of `t`.
    fn in_circle(&self, t: usize, p: [f64; 2]) -> f64 {
        let [a, b, c] = self.tris[t].v;
        let (adx, ady) = (self.pts[a][0] - p[0], self.pts[a][1] - p[1]);
        let (bdx, bdy) = (self.pts[b][0] - p[0], self.pts[b][1] - p[1]);
        let (cdx, cdy) = (self.pts[c][0] - p[0], self.pts[c][1] - p[1]);

        (adx * adx + ady * ady) * (bdx * cdy - cdx * bdy)
            + (bdx * bdx + bdy * bdy) * (cdx * ady - adx * cdy)
            + (cdx * cdx + cdy * cdy) * (adx * bdy - bdx * ady)
    }

    fn contains(&self, t: usize, p: [f64; 2]) -> bool {
        let [a, b, c] = self.tris[t].v;
        self.orient(a, b, p) >= 0.0 && self.orient(b, c, p) >= 0.0 && self.orient(c, a, p) >= 0.0
    }

    /// Find a triangle containing `p` by walking toward it, falling back to
    /// a scan when the walk does not settle.
    fn locate(&self, p: [f64; 2]) -> Option<usize> {
        let max_steps = 4 * self.tris.len() + 64;
        let mut t = self.last;

        'walk: for step in 0..max_steps {
            let tri = &self.tris[t];
            for k in 0..3 {
                let i = (k + step) % 3;
                let a = tri.v[(i + 1) % 3];
                let b = tri.v[(i + 2) % 3];
                if self.orient(a, b, p) < 0.0 {
                    match tri.n[i] {
                        Some(next) => {
                            t = next;
                            continue 'walk;
                        }
                        None => break 'walk,
                    }
                }
            }
            return Some(t);
        }

        (0..self.tris.len()).find(|&t| self.tris[t].alive && self.contains(t, p))
    }

    fn insert(&mut self, index: usize) -> Result<()> {
        let p = self.pts[index];
        let start = self.locate(p).ok_or_else(|| {
            GridProcessorError::interpolation(
                self.real,
                format!("point {} could not be located in the triangulation", index),
            )
        })?;

        let coincident = self.tris[start].v.iter().any(|&v| {
            let q = self.pts[v];
            let (dx, dy) = (q[0] - p[0], q[1] - p[1]);
            dx * dx + dy * dy < COINCIDENT_EPSILON
        });
        if coincident {
            self.duplicates += 1;
            return Ok(());
        }

        self.epoch += 1;
        let cavity = self.cavity(start, p);
        let boundary = self.star_shaped_boundary(cavity, p).ok_or_else(|| {
            GridProcessorError::interpolation(
                self.real,
                format!("cavity for point {} is not star-shaped", index),
            )
        })?;

        self.fill(index, &boundary);
        Ok(())
    }

    /// Triangles whose circumcircle contains `p`, grown from `start`.
    fn cavity(&mut self, start: usize, p: [f64; 2]) -> Vec<usize> {
        let mut cavity = vec![start];
        self.mark[start] = self.epoch;

        let mut next = 0;
        while next < cavity.len() {
            let t = cavity[next];
            next += 1;
            for nb in self.tris[t].n.into_iter().flatten() {
                if self.mark[nb] != self.epoch && self.in_circle(nb, p) > 0.0 {
                    self.mark[nb] = self.epoch;
                    cavity.push(nb);
                }
            }
        }
        cavity
    }

    /// Boundary edges `(a, b, outside)` of the cavity, enlarging it until
    /// every edge sees `p` strictly on its left.
    fn star_shaped_boundary(
        &mut self,
        mut cavity: Vec<usize>,
        p: [f64; 2],
    ) -> Option<Vec<(usize, usize, Option<usize>)>> {
        loop {
            let mut boundary = Vec::new();
            let mut grow = Vec::new();

            for &t in &cavity {
                let tri = &self.tris[t];
                for i in 0..3 {
                    let outside = tri.n[i];
                    if outside.is_some_and(|o| self.mark[o] == self.epoch) {
                        continue;
                    }
                    let a = tri.v[(i + 1) % 3];
                    let b = tri.v[(i + 2) % 3];
                    if self.orient(a, b, p) > 0.0 {
                        boundary.push((a, b, outside));
                    } else {
                        grow.push(outside?);
                    }
                }
            }

            if grow.is_empty() {
                for &t in &cavity {
                    self.tris[t].alive = false;
                    self.free.push(t);
                }
                return Some(boundary);
            }

            for o in grow {
                if self.mark[o] != self.epoch {
                    self.mark[o] = self.epoch;
                    cavity.push(o);
                }
            }
        }
    }

    /// Fan the cavity boundary from point `index`.
    fn fill(&mut self, index: usize, boundary: &[(usize, usize, Option<usize>)]) {
        let mut by_start: HashMap<usize, usize> = HashMap::with_capacity(boundary.len());
        let mut by_end: HashMap<usize, usize> = HashMap::with_capacity(boundary.len());
        let mut created = Vec::with_capacity(boundary.len());

        for &(a, b, outside) in boundary {
            let tri = Triangle {
                v: [a, b, index],
                n: [None, None, outside],
                alive: true,
            };
            let t = match self.free.pop() {
                Some(slot) => {
                    self.tris[slot] = tri;
                    slot
                }
                None => {
                    self.tris.push(tri);
                    self.mark.push(0);
                    self.tris.len() - 1
                }
            };

            if let Some(o) = outside {
                let neighbor = &mut self.tris[o];
                for j in 0..3 {
                    if neighbor.v[(j + 1) % 3] == b && neighbor.v[(j + 2) % 3] == a {
                        neighbor.n[j] = Some(t);
                    }
                }
            }

            by_start.insert(a, t);
            by_end.insert(b, t);
            created.push(t);
        }

        for &t in &created {
            let [a, b, _] = self.tris[t].v;
            // Edge (b, index) is shared with the triangle whose edge starts at b
            self.tris[t].n[0] = by_start.get(&b).copied();
            self.tris[t].n[1] = by_end.get(&a).copied();
        }

        if let Some(&t) = created.last() {
            self.last = t;
        }
    }

    /// Triangles made only of real points.
    fn finish(&self) -> Vec<[usize; 3]> {
        self.tris
            .iter()
            .filter(|t| t.alive && t.v.iter().all(|&v| v < self.real))
            .map(|t| t.v)
            .collect()
    }
}

/// Twice the signed area of `(a, b, c)`; positive when counter-clockwise.
pub fn orientation(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_points(rows: usize, cols: usize) -> Vec<[f64; 2]> {
        let mut pts = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                pts.push([c as f64, r as f64]);
            }
        }
        pts
    }

    fn total_area(tri: &Triangulation) -> f64 {
        (0..tri.triangles().len())
            .map(|t| {
                let [a, b, c] = tri.corners(t);
                orientation(a, b, c) / 2.0
            })
            .sum()
    }

    /// No point of the set lies strictly inside any circumcircle.
    fn assert_delaunay(tri: &Triangulation) {
        for t in 0..tri.triangles().len() {
            let [a, b, c] = tri.corners(t);
            for &p in tri.points() {
                let (adx, ady) = (a[0] - p[0], a[1] - p[1]);
                let (bdx, bdy) = (b[0] - p[0], b[1] - p[1]);
                let (cdx, cdy) = (c[0] - p[0], c[1] - p[1]);
                let det = (adx * adx + ady * ady) * (bdx * cdy - cdx * bdy)
                    + (bdx * bdx + bdy * bdy) * (cdx * ady - adx * cdy)
                    + (cdx * cdx + cdy * cdy) * (adx * bdy - bdx * ady);
                assert!(det <= 1e-9, "point {:?} inside circumcircle of {:?}", p, [a, b, c]);
            }
        }
    }

    #[test]
    fn test_single_triangle() {
        let tri = Triangulation::new(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]).unwrap();
        assert_eq!(tri.triangles().len(), 1);
        let [a, b, c] = tri.corners(0);
        assert!(orientation(a, b, c) > 0.0);
    }

    #[test]
    fn test_regular_grid_covers_hull() {
        let tri = Triangulation::new(&grid_points(4, 3)).unwrap();
        // A rows x cols lattice splits into 2 (rows-1)(cols-1) triangles
        assert_eq!(tri.triangles().len(), 12);
        assert!((total_area(&tri) - 6.0).abs() < 1e-12);
        for t in 0..tri.triangles().len() {
            let [a, b, c] = tri.corners(t);
            assert!(orientation(a, b, c) > 0.0, "triangle {} is not counter-clockwise", t);
        }
    }

    #[test]
    fn test_scattered_points_are_delaunay() {
        // Deterministic pseudo-random points
        let mut state = 12345u64;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        let pts: Vec<[f64; 2]> = (0..300).map(|_| [next() * 10.0, next() * 3.0]).collect();

        let tri = Triangulation::new(&pts).unwrap();
        assert_delaunay(&tri);

        // Euler: 2n - 2 - h triangles, h hull vertices
        assert!(tri.triangles().len() <= 2 * pts.len() - 5);
        assert!(tri.triangles().len() >= pts.len());
    }

    #[test]
    fn test_geographic_scale_points() {
        // Half-kilometer spacing in degrees near Arizona, slightly sheared
        let pts: Vec<[f64; 2]> = grid_points(20, 30)
            .into_iter()
            .map(|[x, y]| [-114.9 + x * 0.0054 + y * 1e-5, 31.3 + y * 0.0045])
            .collect();
        let tri = Triangulation::new(&pts).unwrap();

        let expected = (29.0 * 0.0054) * (19.0 * 0.0045);
        assert!(
            (total_area(&tri) - expected).abs() < 1e-9 * expected,
            "area {} vs {}",
            total_area(&tri),
            expected
        );
        assert!(tri.triangles().len() >= 2 * 19 * 29 - 60);
    }

    #[test]
    fn test_duplicates_skipped() {
        let mut pts = grid_points(3, 3);
        pts.push([1.0, 1.0]);
        pts.push([0.0, 0.0]);
        let tri = Triangulation::new(&pts).unwrap();
        assert_eq!(tri.duplicates(), 2);
        assert_eq!(tri.triangles().len(), 8);
    }

    #[test]
    fn test_too_few_points() {
        match Triangulation::new(&[[0.0, 0.0], [1.0, 1.0]]) {
            Err(GridProcessorError::Interpolation { points, .. }) => assert_eq!(points, 2),
            other => panic!("expected interpolation error, got {:?}", other),
        }
    }

    #[test]
    fn test_collinear_points() {
        let pts: Vec<[f64; 2]> = (0..5).map(|i| [i as f64, 2.0 * i as f64]).collect();
        assert!(matches!(
            Triangulation::new(&pts),
            Err(GridProcessorError::Interpolation { points: 5, .. })
        ));
    }

    #[test]
    fn test_coincident_points() {
        let pts = vec![[3.0, 4.0]; 4];
        assert!(matches!(
            Triangulation::new(&pts),
            Err(GridProcessorError::Interpolation { points: 4, .. })
        ));
    }

    #[test]
    fn test_non_finite_rejected() {
        let pts = [[0.0, 0.0], [1.0, f64::NAN], [0.0, 1.0]];
        assert!(Triangulation::new(&pts).is_err());
    }
}
