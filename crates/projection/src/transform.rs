//! Source CRS to target geographic CRS transforms.

use nalgebra::Vector3;

use crate::crs::{GeographicCrs, ProjectedCrs};
use crate::ellipsoid::Ellipsoid;
use crate::error::{ProjectionError, ProjectionResult};

/// Three-parameter geocentric translation between two ellipsoids.
#[derive(Debug, Clone, PartialEq)]
pub struct DatumShift {
    from: Ellipsoid,
    to: Ellipsoid,
    translation: Vector3<f64>,
}

impl DatumShift {
    pub fn new(from: Ellipsoid, to: Ellipsoid, translation: [f64; 3]) -> Self {
        Self {
            from,
            to,
            translation: Vector3::from(translation),
        }
    }

    /// Shift a position (degrees) from the source datum to the target datum.
    /// Ellipsoidal height is assumed to be zero and discarded.
    pub fn apply(&self, lon: f64, lat: f64) -> (f64, f64) {
        let p = self.from.to_geocentric(lon.to_radians(), lat.to_radians(), 0.0);
        let (lon, lat, _) = self.to.from_geocentric(&(p + self.translation));
        (lon.to_degrees(), lat.to_degrees())
    }

    /// Inverse of [`apply`](Self::apply).
    pub fn reverse(&self, lon: f64, lat: f64) -> (f64, f64) {
        let p = self.to.to_geocentric(lon.to_radians(), lat.to_radians(), 0.0);
        let (lon, lat, _) = self.from.from_geocentric(&(p - self.translation));
        (lon.to_degrees(), lat.to_degrees())
    }
}

/// Transforms coordinates between a source CRS and a geographic target.
///
/// Without a `towgs84` shift the source geodetic coordinates are taken as
/// target coordinates directly (a "ballpark" datum transformation, the PROJ
/// behavior when no datum grid or parameters are known).
#[derive(Debug, Clone)]
pub struct Transformer {
    source: ProjectedCrs,
    target: GeographicCrs,
    shift: Option<DatumShift>,
}

impl Transformer {
    pub fn new(source: &ProjectedCrs, target: &GeographicCrs) -> Self {
        let shift = source
            .towgs84()
            .map(|t| DatumShift::new(*source.ellipsoid(), *target.ellipsoid(), t));

        Self {
            source: source.clone(),
            target: target.clone(),
            shift,
        }
    }

    pub fn source(&self) -> &ProjectedCrs {
        &self.source
    }

    pub fn target(&self) -> &GeographicCrs {
        &self.target
    }

    pub fn datum_shift(&self) -> Option<&DatumShift> {
        self.shift.as_ref()
    }

    /// Source native coordinates to target `(lon, lat)` in degrees.
    pub fn forward(&self, x: f64, y: f64) -> ProjectionResult<(f64, f64)> {
        let (lon, lat) = self
            .source
            .to_geodetic(x, y)
            .ok_or(ProjectionError::OutOfDomain { x, y })?;

        let (lon, lat) = match &self.shift {
            Some(shift) => shift.apply(lon, lat),
            None => (lon, lat),
        };

        if lon.is_finite() && lat.is_finite() {
            Ok((lon, lat))
        } else {
            Err(ProjectionError::OutOfDomain { x, y })
        }
    }

    /// Target `(lon, lat)` in degrees back to source native coordinates.
    pub fn inverse(&self, lon: f64, lat: f64) -> ProjectionResult<(f64, f64)> {
        let out_of_domain = ProjectionError::OutOfDomain { x: lon, y: lat };
        if !lon.is_finite() || !lat.is_finite() {
            return Err(out_of_domain);
        }

        let (lon, lat) = match &self.shift {
            Some(shift) => shift.reverse(lon, lat),
            None => (lon, lat),
        };

        self.source.from_geodetic(lon, lat).ok_or(out_of_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::{LinearUnit, ProjectionParams};
    use test_utils::fixtures::{arizona, tolerance};
    use test_utils::{assert_approx_eq, assert_coords_approx_eq};

    fn arizona_params() -> ProjectionParams {
        ProjectionParams::lambert(
            arizona::LAT_1,
            arizona::LAT_2,
            arizona::LAT_0,
            arizona::LON_0,
            arizona::SEMI_MAJOR_AXIS,
            arizona::ECCENTRICITY,
        )
    }

    fn survey_points() -> Vec<(f64, f64)> {
        let mut points = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                let x = arizona::X_ORIGIN + i as f64 * (arizona::COLS as f64 / 4.0) * 500.0;
                let y = arizona::Y_ORIGIN + j as f64 * (arizona::ROWS as f64 / 4.0) * 500.0;
                points.push((x, y));
            }
        }
        points
    }

    #[test]
    fn test_arizona_survey_lands_in_arizona() {
        let crs = ProjectedCrs::build(&arizona_params()).unwrap();
        let t = Transformer::new(&crs, &GeographicCrs::wgs84());

        let (lon, lat) = t.forward(arizona::X_ORIGIN, arizona::Y_ORIGIN).unwrap();
        assert!(lon > -115.5 && lon < -114.0, "lon was {}", lon);
        assert!(lat > 31.0 && lat < 31.7, "lat was {}", lat);

        // Central meridian stays put without a datum shift
        let (lon, lat) = t.forward(0.0, 0.0).unwrap();
        assert_approx_eq!(lon, arizona::LON_0, tolerance::DEGREES);
        assert_approx_eq!(lat, arizona::LAT_0, tolerance::DEGREES);
    }

    #[test]
    fn test_forward_inverse_roundtrip() {
        for units in [LinearUnit::Metre, LinearUnit::Foot, LinearUnit::UsSurveyFoot] {
            let crs = ProjectedCrs::build(&ProjectionParams {
                units,
                ..arizona_params()
            })
            .unwrap();
            let t = Transformer::new(&crs, &GeographicCrs::wgs84());

            for (x, y) in survey_points() {
                let (lon, lat) = t.forward(x, y).unwrap();
                let (x2, y2) = t.inverse(lon, lat).unwrap();
                assert_coords_approx_eq!((x2, y2), (x, y), tolerance::METERS);

                let (lon2, lat2) = t.forward(x2, y2).unwrap();
                assert_coords_approx_eq!((lon2, lat2), (lon, lat), tolerance::DEGREES);
            }
        }
    }

    #[test]
    fn test_datum_shift_roundtrip() {
        let crs = ProjectedCrs::build(&ProjectionParams {
            towgs84: Some([-8.0, 160.0, 176.0]),
            ..arizona_params()
        })
        .unwrap();
        let t = Transformer::new(&crs, &GeographicCrs::wgs84());
        assert!(t.datum_shift().is_some());

        let (lon, lat) = t.forward(0.0, 0.0).unwrap();
        // NAD27 to WGS84 moves positions in Arizona by tens of meters
        assert!((lon - arizona::LON_0).abs() > 1e-5);
        assert!((lon - arizona::LON_0).abs() < 1e-2);
        assert!((lat - arizona::LAT_0).abs() < 1e-2);

        for (x, y) in survey_points() {
            let (lon, lat) = t.forward(x, y).unwrap();
            let (x2, y2) = t.inverse(lon, lat).unwrap();
            assert_coords_approx_eq!((x2, y2), (x, y), tolerance::METERS);
        }
    }

    #[test]
    fn test_longlat_identity() {
        let crs = ProjectedCrs::build(&ProjectionParams::longlat(6378137.0, 0.0)).unwrap();
        let t = Transformer::new(&crs, &GeographicCrs::wgs84());
        assert_eq!(t.forward(10.0, 20.0).unwrap(), (10.0, 20.0));
        assert_eq!(t.inverse(12.5, -3.0).unwrap(), (12.5, -3.0));
    }

    #[test]
    fn test_out_of_domain() {
        let crs = ProjectedCrs::build(&arizona_params()).unwrap();
        let t = Transformer::new(&crs, &GeographicCrs::wgs84());

        assert!(matches!(
            t.forward(f64::NAN, 0.0),
            Err(ProjectionError::OutOfDomain { .. })
        ));
        assert!(matches!(
            t.inverse(-112.0, -90.0),
            Err(ProjectionError::OutOfDomain { .. })
        ));
    }

    #[test]
    fn test_inverse_wraps_longitude() {
        let crs = ProjectedCrs::build(&arizona_params()).unwrap();
        let t = Transformer::new(&crs, &GeographicCrs::wgs84());

        let (x1, y1) = t.inverse(-111.5, 34.0).unwrap();
        let (x2, y2) = t.inverse(-111.5 + 720.0, 34.0).unwrap();
        assert_coords_approx_eq!((x2, y2), (x1, y1), tolerance::METERS);

        let (x, y) = t.inverse(1e20, 34.0).unwrap();
        assert!(x.is_finite() && y.is_finite());
    }
}
