//! Common test fixtures for survey regridding tests.
//!
//! Values are plain constants so that fixtures can be shared without
//! depending on the crates under test.

/// The USGS Arizona aeromagnetic survey (Open-File Report 01-0081), continued
/// 1000 feet above ground. Projection parameters were transcribed from the
/// GXF header by hand.
pub mod arizona {
    /// First standard parallel (degrees)
    pub const LAT_1: f64 = 33.0;
    /// Second standard parallel (degrees)
    pub const LAT_2: f64 = 45.0;
    /// Latitude of natural origin (degrees)
    pub const LAT_0: f64 = 31.0;
    /// Central meridian (degrees)
    pub const LON_0: f64 = -112.0;
    /// Clarke 1866 semi-major axis (meters)
    pub const SEMI_MAJOR_AXIS: f64 = 6378206.4;
    /// Clarke 1866 eccentricity
    pub const ECCENTRICITY: f64 = 0.082271854;

    /// Points per row
    pub const COLS: usize = 1134;
    /// Number of rows
    pub const ROWS: usize = 1285;
    /// Grid X origin (meters)
    pub const X_ORIGIN: f64 = -269_500.0;
    /// Grid Y origin (meters)
    pub const Y_ORIGIN: f64 = 35_000.0;
    /// Point and row separation (meters)
    pub const SEPARATION: f64 = 500.0;
    /// Null sentinel
    pub const NULL_VALUE: f64 = -1e32;

    pub const DESCRIPTION: &str =
        "Arizona Aeromagnetic Anomaly Map, Continued 1000 Feet Above Ground";
}

/// WGS84 ellipsoid.
pub mod wgs84 {
    pub const SEMI_MAJOR_AXIS: f64 = 6378137.0;
    pub const INVERSE_FLATTENING: f64 = 298.257223563;
}

/// Tolerances used across the workspace tests.
pub mod tolerance {
    /// Angular round-trip tolerance (degrees)
    pub const DEGREES: f64 = 1e-6;
    /// Linear round-trip tolerance (meters)
    pub const METERS: f64 = 1e-3;
    /// Interpolated value tolerance for exact-location lookups
    pub const VALUE: f64 = 1e-6;
}
