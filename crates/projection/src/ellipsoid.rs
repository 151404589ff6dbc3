//! Reference ellipsoids and geodetic/geocentric conversion.

use nalgebra::Vector3;

use crate::error::{ProjectionError, ProjectionResult};

/// An ellipsoid of revolution defined by its semi-major axis and first
/// eccentricity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    a: f64,
    e: f64,
    f: f64,
    /// Inverse flattening as supplied, 0 for a sphere
    rf: f64,
}

impl Ellipsoid {
    /// Build an ellipsoid from a semi-major axis (meters) and eccentricity.
    ///
    /// Fails when `a` is not positive or `e` is outside `[0, 1)`.
    pub fn from_eccentricity(a: f64, e: f64) -> ProjectionResult<Self> {
        if !(a.is_finite() && a > 0.0) {
            return Err(ProjectionError::invalid(
                "semi_major_axis",
                format!("must be positive, got {}", a),
            ));
        }
        if !e.is_finite() || e < 0.0 {
            return Err(ProjectionError::invalid(
                "eccentricity",
                format!("must be in [0, 1), got {}", e),
            ));
        }
        if e >= 1.0 {
            return Err(ProjectionError::invalid(
                "eccentricity",
                format!("degenerate ellipsoid (e = {} >= 1)", e),
            ));
        }
        let f = 1.0 - (1.0 - e * e).sqrt();
        let rf = if f == 0.0 { 0.0 } else { 1.0 / f };
        Ok(Self { a, e, f, rf })
    }

    /// Build an ellipsoid from a semi-major axis and inverse flattening.
    /// An inverse flattening of 0 denotes a sphere.
    pub fn from_inverse_flattening(a: f64, rf: f64) -> Self {
        let f = if rf == 0.0 { 0.0 } else { 1.0 / rf };
        Self {
            a,
            e: (2.0 * f - f * f).sqrt(),
            f,
            rf,
        }
    }

    /// WGS 84.
    pub fn wgs84() -> Self {
        Self::from_inverse_flattening(6378137.0, 298.257223563)
    }

    /// Clarke 1866, the NAD27 ellipsoid.
    pub fn clarke1866() -> Self {
        Self::from_inverse_flattening(6378206.4, 294.978698213898)
    }

    /// Semi-major axis in meters.
    pub fn semi_major_axis(&self) -> f64 {
        self.a
    }

    /// First eccentricity.
    pub fn eccentricity(&self) -> f64 {
        self.e
    }

    /// Eccentricity squared.
    pub fn es(&self) -> f64 {
        self.e * self.e
    }

    /// Flattening, `1 - sqrt(1 - e^2)`.
    pub fn flattening(&self) -> f64 {
        self.f
    }

    /// Inverse flattening, or 0 for a sphere (the WKT convention).
    pub fn inverse_flattening(&self) -> f64 {
        self.rf
    }

    pub fn semi_minor_axis(&self) -> f64 {
        self.a * (1.0 - self.es()).sqrt()
    }

    pub fn is_sphere(&self) -> bool {
        self.e == 0.0
    }

    /// Earth-centered, Earth-fixed coordinates of a geodetic position.
    ///
    /// Longitude and latitude are in radians, height in meters.
    pub fn to_geocentric(&self, lon: f64, lat: f64, h: f64) -> Vector3<f64> {
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lon, cos_lon) = lon.sin_cos();
        let n = self.a / (1.0 - self.es() * sin_lat * sin_lat).sqrt();

        Vector3::new(
            (n + h) * cos_lat * cos_lon,
            (n + h) * cos_lat * sin_lon,
            (n * (1.0 - self.es()) + h) * sin_lat,
        )
    }

    /// Geodetic position of Earth-centered coordinates.
    ///
    /// Returns `(lon, lat, h)` with angles in radians. Latitude is found by
    /// fixed-point iteration, which converges in a handful of steps away from
    /// the Earth's center.
    pub fn from_geocentric(&self, p: &Vector3<f64>) -> (f64, f64, f64) {
        let es = self.es();
        let rho = p.x.hypot(p.y);
        let lon = p.y.atan2(p.x);

        if rho < 1e-9 * self.a {
            let lat = std::f64::consts::FRAC_PI_2.copysign(p.z);
            return (lon, lat, p.z.abs() - self.semi_minor_axis());
        }

        let mut lat = p.z.atan2(rho * (1.0 - es));
        for _ in 0..30 {
            let sin_lat = lat.sin();
            let n = self.a / (1.0 - es * sin_lat * sin_lat).sqrt();
            let h = rho / lat.cos() - n;
            let next = p.z.atan2(rho * (1.0 - es * n / (n + h)));
            let done = (next - lat).abs() < 1e-15;
            lat = next;
            if done {
                break;
            }
        }

        let sin_lat = lat.sin();
        let n = self.a / (1.0 - es * sin_lat * sin_lat).sqrt();
        let h = rho / lat.cos() - n;
        (lon, lat, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures;

    #[test]
    fn test_flattening_from_eccentricity() {
        let clarke = Ellipsoid::from_eccentricity(6378206.4, 0.082271854).unwrap();
        let f = 1.0 - (1.0 - 0.082271854f64.powi(2)).sqrt();
        assert_eq!(clarke.flattening(), f);
        assert!(
            (clarke.inverse_flattening() - 294.9787).abs() < 0.001,
            "inverse flattening was {}",
            clarke.inverse_flattening()
        );
    }

    #[test]
    fn test_degenerate_eccentricity_rejected() {
        let err = Ellipsoid::from_eccentricity(6378137.0, 1.0).unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::InvalidParameter {
                name: "eccentricity",
                ..
            }
        ));
        assert!(Ellipsoid::from_eccentricity(6378137.0, -0.1).is_err());
        assert!(Ellipsoid::from_eccentricity(0.0, 0.1).is_err());
    }

    #[test]
    fn test_wgs84_constants() {
        let wgs84 = Ellipsoid::wgs84();
        assert_eq!(wgs84.semi_major_axis(), fixtures::wgs84::SEMI_MAJOR_AXIS);
        assert_eq!(wgs84.inverse_flattening(), fixtures::wgs84::INVERSE_FLATTENING);
        assert!((wgs84.semi_minor_axis() - 6356752.314245).abs() < 1e-3);
    }

    #[test]
    fn test_sphere_inverse_flattening_is_zero() {
        let sphere = Ellipsoid::from_eccentricity(6371000.0, 0.0).unwrap();
        assert!(sphere.is_sphere());
        assert_eq!(sphere.inverse_flattening(), 0.0);
    }

    #[test]
    fn test_geocentric_roundtrip() {
        let wgs84 = Ellipsoid::wgs84();
        for (lon, lat, h) in [(-112.0, 33.5, 0.0), (10.0, -45.0, 1500.0), (179.9, 89.0, -20.0)] {
            let p = wgs84.to_geocentric(f64::to_radians(lon), f64::to_radians(lat), h);
            let (lon2, lat2, h2) = wgs84.from_geocentric(&p);
            assert!((lon2.to_degrees() - lon).abs() < 1e-10);
            assert!((lat2.to_degrees() - lat).abs() < 1e-10);
            assert!((h2 - h).abs() < 1e-6, "height {} vs {}", h2, h);
        }
    }

    #[test]
    fn test_geocentric_equator_prime_meridian() {
        let wgs84 = Ellipsoid::wgs84();
        let p = wgs84.to_geocentric(0.0, 0.0, 0.0);
        assert!((p.x - 6378137.0).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
        assert!(p.z.abs() < 1e-6);
    }
}
