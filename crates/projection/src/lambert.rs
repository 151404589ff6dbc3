//! Lambert Conformal Conic projection on an ellipsoid.
//!
//! Maps a cone secant to the ellipsoid along two standard parallels (or
//! tangent along one) onto a flat plane. Used by the USGS state aeromagnetic
//! compilations and most US State Plane zones.
//!
//! The projection parameters include:
//! - Standard parallels: lat_1 and lat_2 (equal for a tangent cone)
//! - Latitude of origin (lat_0) and central meridian (lon_0)
//! - Scale factor, false easting and false northing
//!
//! Formulas follow Snyder, *Map Projections: A Working Manual* (USGS
//! Professional Paper 1395), equations 15-1 to 15-11 and 7-9.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use crate::ellipsoid::Ellipsoid;
use crate::error::{ProjectionError, ProjectionResult};

/// Iteration limit for the inverse latitude series.
const MAX_ITERATIONS: usize = 15;

/// Convergence threshold for the inverse latitude (radians).
const CONVERGENCE: f64 = 1e-12;

/// Lambert Conformal Conic projection (2SP).
///
/// Inputs and outputs of [`project`](Self::project) and
/// [`unproject`](Self::unproject) are degrees and meters.
#[derive(Debug, Clone)]
pub struct LambertConformal {
    ellipsoid: Ellipsoid,
    /// First standard parallel in radians
    lat1: f64,
    /// Second standard parallel in radians
    lat2: f64,
    /// Latitude of origin in radians
    lat0: f64,
    /// Central meridian in radians
    lon0: f64,
    k0: f64,
    false_easting: f64,
    false_northing: f64,
    /// Cone constant
    n: f64,
    /// `a * k0 * F`
    c: f64,
    /// Rho at the latitude of origin
    rho0: f64,
}

impl LambertConformal {
    /// Create a new projection.
    ///
    /// # Arguments
    /// * `ellipsoid` - Reference ellipsoid
    /// * `lat1_deg`, `lat2_deg` - Standard parallels (degrees)
    /// * `lat0_deg` - Latitude of origin (degrees)
    /// * `lon0_deg` - Central meridian (degrees)
    /// * `k0` - Scale factor at the standard parallels
    /// * `false_easting`, `false_northing` - Offsets added to projected coordinates (meters)
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ellipsoid: Ellipsoid,
        lat1_deg: f64,
        lat2_deg: f64,
        lat0_deg: f64,
        lon0_deg: f64,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> ProjectionResult<Self> {
        let finite = [
            ("lat_1", lat1_deg),
            ("lat_2", lat2_deg),
            ("lat_0", lat0_deg),
            ("lon_0", lon0_deg),
            ("scale_factor", k0),
            ("false_easting", false_easting),
            ("false_northing", false_northing),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ProjectionError::invalid(name, "must be finite"));
            }
        }

        if lat1_deg.abs() >= 90.0 {
            return Err(ProjectionError::invalid(
                "lat_1",
                format!("standard parallel must lie strictly between the poles, got {}", lat1_deg),
            ));
        }
        if lat2_deg.abs() >= 90.0 {
            return Err(ProjectionError::invalid(
                "lat_2",
                format!("standard parallel must lie strictly between the poles, got {}", lat2_deg),
            ));
        }
        if lat0_deg.abs() > 90.0 {
            return Err(ProjectionError::invalid(
                "lat_0",
                format!("latitude out of range, got {}", lat0_deg),
            ));
        }
        if (lat1_deg + lat2_deg).abs() < 1e-10 {
            return Err(ProjectionError::invalid(
                "lat_2",
                "standard parallels symmetric about the equator give a zero cone constant",
            ));
        }
        if k0 <= 0.0 {
            return Err(ProjectionError::invalid(
                "scale_factor",
                format!("must be positive, got {}", k0),
            ));
        }

        let e = ellipsoid.eccentricity();
        let lat1 = lat1_deg.to_radians();
        let lat2 = lat2_deg.to_radians();
        let lat0 = lat0_deg.to_radians();

        let m1 = msfn(lat1, e);
        let t1 = tsfn(lat1, e);

        // Cone constant
        let n = if (lat1 - lat2).abs() < 1e-10 {
            lat1.sin()
        } else {
            let m2 = msfn(lat2, e);
            let t2 = tsfn(lat2, e);
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };
        if !n.is_finite() || n.abs() < 1e-10 {
            return Err(ProjectionError::invalid(
                "lat_2",
                format!("degenerate cone constant {}", n),
            ));
        }

        let f = m1 / (n * t1.powf(n));
        let c = ellipsoid.semi_major_axis() * k0 * f;

        // At a pole t is 0 (rho 0) or infinite (the apex lies at the other pole)
        let rho0 = if (lat0.abs() - FRAC_PI_2).abs() < 1e-10 {
            if lat0 * n > 0.0 {
                0.0
            } else {
                return Err(ProjectionError::invalid(
                    "lat_0",
                    "origin at the pole opposite the cone apex",
                ));
            }
        } else {
            c * tsfn(lat0, e).powf(n)
        };

        Ok(Self {
            ellipsoid,
            lat1,
            lat2,
            lat0,
            lon0: lon0_deg.to_radians(),
            k0,
            false_easting,
            false_northing,
            n,
            c,
            rho0,
        })
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    /// Cone constant `n`.
    pub fn cone_constant(&self) -> f64 {
        self.n
    }

    /// Standard parallels in degrees.
    pub fn standard_parallels(&self) -> (f64, f64) {
        (self.lat1.to_degrees(), self.lat2.to_degrees())
    }

    /// Latitude of origin and central meridian in degrees.
    pub fn origin(&self) -> (f64, f64) {
        (self.lat0.to_degrees(), self.lon0.to_degrees())
    }

    pub fn scale_factor(&self) -> f64 {
        self.k0
    }

    pub fn false_origin(&self) -> (f64, f64) {
        (self.false_easting, self.false_northing)
    }

    /// Project geographic coordinates (degrees) to easting/northing (meters).
    ///
    /// Returns `None` for non-finite input, latitudes beyond the poles, and
    /// the pole opposite the cone apex, where rho is unbounded.
    pub fn project(&self, lon_deg: f64, lat_deg: f64) -> Option<(f64, f64)> {
        if !lon_deg.is_finite() || !lat_deg.is_finite() || lat_deg.abs() > 90.0 {
            return None;
        }
        let lat = lat_deg.to_radians();

        let rho = if (lat.abs() - FRAC_PI_2).abs() < 1e-10 {
            if lat * self.n > 0.0 {
                0.0
            } else {
                return None;
            }
        } else {
            self.c * tsfn(lat, self.ellipsoid.eccentricity()).powf(self.n)
        };

        let theta = self.n * wrap_pi(lon_deg.to_radians() - self.lon0);
        let x = rho * theta.sin() + self.false_easting;
        let y = self.rho0 - rho * theta.cos() + self.false_northing;

        (x.is_finite() && y.is_finite()).then_some((x, y))
    }

    /// Convert easting/northing (meters) back to geographic coordinates.
    ///
    /// Returns `(lon, lat)` in degrees with longitude wrapped to
    /// `[-180, 180]`, or `None` when the inverse series does not converge.
    pub fn unproject(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let e = self.ellipsoid.eccentricity();

        let mut x = x - self.false_easting;
        let mut dy = self.rho0 - (y - self.false_northing);
        let mut rho = x.hypot(dy);
        if self.n < 0.0 {
            rho = -rho;
            x = -x;
            dy = -dy;
        }

        if rho == 0.0 {
            let lat = FRAC_PI_2.copysign(self.n);
            return Some((self.lon0.to_degrees(), lat.to_degrees()));
        }

        let theta = x.atan2(dy);
        let t = (rho / self.c).powf(1.0 / self.n);
        let lat = phi2(t, e)?;
        let lon = wrap_pi(theta / self.n + self.lon0);

        Some((lon.to_degrees(), lat.to_degrees()))
    }
}

/// Snyder 14-15: `cos(phi) / sqrt(1 - e^2 sin^2(phi))`.
fn msfn(phi: f64, e: f64) -> f64 {
    let s = e * phi.sin();
    phi.cos() / (1.0 - s * s).sqrt()
}

/// Snyder 15-9: `tan(pi/4 - phi/2) / ((1 - e sin(phi)) / (1 + e sin(phi)))^(e/2)`.
fn tsfn(phi: f64, e: f64) -> f64 {
    let s = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - s) / (1.0 + s)).powf(e / 2.0)
}

/// Snyder 7-9: latitude from `t` by fixed-point iteration.
fn phi2(t: f64, e: f64) -> Option<f64> {
    if !t.is_finite() || t < 0.0 {
        return None;
    }
    let half_e = e / 2.0;
    let mut phi = FRAC_PI_2 - 2.0 * t.atan();

    for _ in 0..MAX_ITERATIONS {
        let s = e * phi.sin();
        let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - s) / (1.0 + s)).powf(half_e)).atan();
        if (next - phi).abs() < CONVERGENCE {
            return Some(next);
        }
        phi = next;
    }
    None
}

/// Normalize an angle to `[-pi, pi]`. Angles already in range are returned
/// unchanged.
fn wrap_pi(angle: f64) -> f64 {
    if (-PI..=PI).contains(&angle) {
        angle
    } else {
        (angle + PI).rem_euclid(2.0 * PI) - PI
    }
}
