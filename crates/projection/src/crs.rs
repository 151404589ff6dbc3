//! Coordinate reference system descriptions.
//!
//! A [`ProjectedCrs`] is built once from [`ProjectionParams`] and never
//! mutated. Both CRS types render themselves as WKT2 for persistence and as a
//! PROJ string for interoperability with other tools.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ellipsoid::Ellipsoid;
use crate::error::{ProjectionError, ProjectionResult};
use crate::geographic::LongLat;
use crate::lambert::LambertConformal;

const DEGREE: &str = r#"ANGLEUNIT["degree",0.0174532925199433]"#;
const METRE: &str = r#"LENGTHUNIT["metre",1]"#;

/// Supported projection families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionFamily {
    /// Lambert Conformal Conic with two standard parallels
    #[default]
    #[serde(alias = "lcc")]
    LambertConformalConic,
    /// Geographic coordinates, no projection
    #[serde(rename = "longlat", alias = "latlong", alias = "lonlat")]
    LongLat,
}

impl fmt::Display for ProjectionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionFamily::LambertConformalConic => write!(f, "lcc"),
            ProjectionFamily::LongLat => write!(f, "longlat"),
        }
    }
}

/// Linear unit of projected coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinearUnit {
    #[default]
    #[serde(rename = "m", alias = "metre", alias = "meter")]
    Metre,
    /// International foot
    #[serde(rename = "ft", alias = "foot")]
    Foot,
    #[serde(rename = "us-ft", alias = "us_survey_foot")]
    UsSurveyFoot,
}

impl LinearUnit {
    /// Conversion factor to meters.
    pub fn to_meter(&self) -> f64 {
        match self {
            LinearUnit::Metre => 1.0,
            LinearUnit::Foot => 0.3048,
            LinearUnit::UsSurveyFoot => 1200.0 / 3937.0,
        }
    }

    /// PROJ `+units=` value.
    pub fn proj_name(&self) -> &'static str {
        match self {
            LinearUnit::Metre => "m",
            LinearUnit::Foot => "ft",
            LinearUnit::UsSurveyFoot => "us-ft",
        }
    }

    fn wkt(&self) -> String {
        match self {
            LinearUnit::Metre => METRE.to_string(),
            LinearUnit::Foot => r#"LENGTHUNIT["foot",0.3048]"#.to_string(),
            LinearUnit::UsSurveyFoot => {
                format!(r#"LENGTHUNIT["US survey foot",{}]"#, self.to_meter())
            }
        }
    }
}

/// User-supplied projection parameters.
///
/// Angles are in degrees; false easting and northing are in meters
/// regardless of `units`, as in PROJ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionParams {
    #[serde(default)]
    pub family: ProjectionFamily,
    #[serde(default)]
    pub lat_1: f64,
    #[serde(default)]
    pub lat_2: f64,
    #[serde(default)]
    pub lat_0: f64,
    #[serde(default)]
    pub lon_0: f64,
    #[serde(default = "default_semi_major_axis")]
    pub semi_major_axis: f64,
    #[serde(default = "default_eccentricity")]
    pub eccentricity: f64,
    #[serde(default)]
    pub false_easting: f64,
    #[serde(default)]
    pub false_northing: f64,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    #[serde(default)]
    pub units: LinearUnit,
    /// Datum name used in WKT output
    #[serde(default)]
    pub datum: Option<String>,
    /// Geocentric translation to WGS84 (meters)
    #[serde(default)]
    pub towgs84: Option<[f64; 3]>,
}

fn default_semi_major_axis() -> f64 {
    6378137.0
}

fn default_eccentricity() -> f64 {
    Ellipsoid::wgs84().eccentricity()
}

fn default_scale_factor() -> f64 {
    1.0
}

impl ProjectionParams {
    /// Lambert Conformal Conic parameters with unit scale and no false origin.
    pub fn lambert(
        lat_1: f64,
        lat_2: f64,
        lat_0: f64,
        lon_0: f64,
        semi_major_axis: f64,
        eccentricity: f64,
    ) -> Self {
        Self {
            family: ProjectionFamily::LambertConformalConic,
            lat_1,
            lat_2,
            lat_0,
            lon_0,
            semi_major_axis,
            eccentricity,
            false_easting: 0.0,
            false_northing: 0.0,
            scale_factor: 1.0,
            units: LinearUnit::Metre,
            datum: None,
            towgs84: None,
        }
    }

    /// Geographic coordinates on the given ellipsoid.
    pub fn longlat(semi_major_axis: f64, eccentricity: f64) -> Self {
        Self {
            family: ProjectionFamily::LongLat,
            ..Self::lambert(0.0, 0.0, 0.0, 0.0, semi_major_axis, eccentricity)
        }
    }
}

#[derive(Debug, Clone)]
enum Method {
    Lambert(LambertConformal),
    LongLat(LongLat),
}

/// An immutable source CRS.
#[derive(Debug, Clone)]
pub struct ProjectedCrs {
    params: ProjectionParams,
    ellipsoid: Ellipsoid,
    method: Method,
}

impl ProjectedCrs {
    /// Validate the parameters and build the CRS.
    pub fn build(params: &ProjectionParams) -> ProjectionResult<Self> {
        let ellipsoid = Ellipsoid::from_eccentricity(params.semi_major_axis, params.eccentricity)?;

        if let Some(shift) = params.towgs84 {
            if shift.iter().any(|v| !v.is_finite()) {
                return Err(ProjectionError::invalid("towgs84", "must be finite"));
            }
        }

        let method = match params.family {
            ProjectionFamily::LambertConformalConic => Method::Lambert(LambertConformal::new(
                ellipsoid,
                params.lat_1,
                params.lat_2,
                params.lat_0,
                params.lon_0,
                params.scale_factor,
                params.false_easting,
                params.false_northing,
            )?),
            ProjectionFamily::LongLat => Method::LongLat(LongLat::new(ellipsoid)),
        };

        Ok(Self {
            params: params.clone(),
            ellipsoid,
            method,
        })
    }

    pub fn params(&self) -> &ProjectionParams {
        &self.params
    }

    pub fn family(&self) -> ProjectionFamily {
        self.params.family
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    pub fn units(&self) -> LinearUnit {
        self.params.units
    }

    pub fn towgs84(&self) -> Option<[f64; 3]> {
        self.params.towgs84
    }

    /// Geodetic longitude/latitude (degrees, on this CRS's ellipsoid) of a
    /// coordinate expressed in the CRS's native units.
    pub fn to_geodetic(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        match &self.method {
            Method::Lambert(lcc) => {
                let k = self.params.units.to_meter();
                lcc.unproject(x * k, y * k)
            }
            Method::LongLat(ll) => ll.unproject(x, y),
        }
    }

    /// Native coordinates of a geodetic position on this CRS's ellipsoid.
    pub fn from_geodetic(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        match &self.method {
            Method::Lambert(lcc) => {
                let k = self.params.units.to_meter();
                lcc.project(lon, lat).map(|(x, y)| (x / k, y / k))
            }
            Method::LongLat(ll) => ll.project(lon, lat),
        }
    }

    fn datum_name(&self) -> &str {
        self.params.datum.as_deref().unwrap_or("unknown")
    }

    fn base_geogcrs(&self, keyword: &str) -> String {
        let name = self.datum_name();
        format!(
            r#"{keyword}["{name}",DATUM["{name}",ELLIPSOID["{name}",{a},{rf},{METRE}]],PRIMEM["Greenwich",0,{DEGREE}]"#,
            a = self.ellipsoid.semi_major_axis(),
            rf = self.ellipsoid.inverse_flattening(),
        )
    }

    /// WKT2 (ISO 19162:2019) description.
    ///
    /// The 2SP method carries no scale factor parameter; a non-unit
    /// `scale_factor` is only represented in the PROJ string.
    pub fn to_wkt(&self) -> String {
        match self.params.family {
            ProjectionFamily::LongLat => format!(
                r#"{},CS[ellipsoidal,2],AXIS["geodetic latitude (Lat)",north,ORDER[1],{DEGREE}],AXIS["geodetic longitude (Lon)",east,ORDER[2],{DEGREE}]]"#,
                self.base_geogcrs("GEOGCRS")
            ),
            ProjectionFamily::LambertConformalConic => {
                let p = &self.params;
                let unit = p.units.wkt();
                let angle = |name: &str, value: f64, id: u32| {
                    format!(r#"PARAMETER["{name}",{value},{DEGREE},ID["EPSG",{id}]]"#)
                };
                let length = |name: &str, value: f64, id: u32| {
                    format!(r#"PARAMETER["{name}",{value},{METRE},ID["EPSG",{id}]]"#)
                };
                format!(
                    r#"PROJCRS["unknown",{base}],CONVERSION["unknown",METHOD["Lambert Conic Conformal (2SP)",ID["EPSG",9802]],{},{},{},{},{},{}],CS[Cartesian,2],AXIS["(E)",east,ORDER[1],{unit}],AXIS["(N)",north,ORDER[2],{unit}]]"#,
                    angle("Latitude of false origin", p.lat_0, 8821),
                    angle("Longitude of false origin", p.lon_0, 8822),
                    angle("Latitude of 1st standard parallel", p.lat_1, 8823),
                    angle("Latitude of 2nd standard parallel", p.lat_2, 8824),
                    length("Easting at false origin", p.false_easting, 8826),
                    length("Northing at false origin", p.false_northing, 8827),
                    base = self.base_geogcrs("BASEGEOGCRS"),
                )
            }
        }
    }

    /// PROJ string, e.g. `+proj=lcc +lat_1=33 ... +units=m +no_defs`.
    pub fn to_proj_string(&self) -> String {
        let p = &self.params;
        let mut out = match p.family {
            ProjectionFamily::LambertConformalConic => format!(
                "+proj=lcc +lat_1={} +lat_2={} +lat_0={} +lon_0={} +x_0={} +y_0={} +k_0={}",
                p.lat_1, p.lat_2, p.lat_0, p.lon_0, p.false_easting, p.false_northing, p.scale_factor
            ),
            ProjectionFamily::LongLat => "+proj=longlat".to_string(),
        };
        out.push_str(&format!(
            " +a={} +f={}",
            self.ellipsoid.semi_major_axis(),
            self.ellipsoid.flattening()
        ));
        if let Some([dx, dy, dz]) = p.towgs84 {
            out.push_str(&format!(" +towgs84={},{},{}", dx, dy, dz));
        }
        if p.family == ProjectionFamily::LambertConformalConic {
            out.push_str(&format!(" +units={}", p.units.proj_name()));
        }
        out.push_str(" +no_defs");
        out
    }
}

/// A geographic CRS. Only WGS84 is used as a target.
#[derive(Debug, Clone, PartialEq)]
pub struct GeographicCrs {
    name: String,
    datum: String,
    ellipsoid: Ellipsoid,
    epsg: Option<u32>,
}

impl GeographicCrs {
    /// WGS 84 (EPSG:4326).
    pub fn wgs84() -> Self {
        Self {
            name: "WGS 84".to_string(),
            datum: "World Geodetic System 1984".to_string(),
            ellipsoid: Ellipsoid::wgs84(),
            epsg: Some(4326),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// WKT2 description.
    pub fn to_wkt(&self) -> String {
        let id = self
            .epsg
            .map(|code| format!(r#",ID["EPSG",{}]"#, code))
            .unwrap_or_default();
        format!(
            r#"GEOGCRS["{name}",DATUM["{datum}",ELLIPSOID["{name}",{a},{rf},{METRE}]],PRIMEM["Greenwich",0,{DEGREE}],CS[ellipsoidal,2],AXIS["geodetic latitude (Lat)",north,ORDER[1],{DEGREE}],AXIS["geodetic longitude (Lon)",east,ORDER[2],{DEGREE}]{id}]"#,
            name = self.name,
            datum = self.datum,
            a = self.ellipsoid.semi_major_axis(),
            rf = self.ellipsoid.inverse_flattening(),
        )
    }

    pub fn to_proj_string(&self) -> String {
        match self.epsg {
            Some(4326) => "+proj=longlat +datum=WGS84 +no_defs".to_string(),
            _ => format!(
                "+proj=longlat +a={} +f={} +no_defs",
                self.ellipsoid.semi_major_axis(),
                self.ellipsoid.flattening()
            ),
        }
    }
}

impl fmt::Display for GeographicCrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg {
            Some(code) => write!(f, "EPSG:{}", code),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arizona() -> ProjectionParams {
        ProjectionParams {
            datum: Some("NAD27".to_string()),
            ..ProjectionParams::lambert(33.0, 45.0, 31.0, -112.0, 6378206.4, 0.082271854)
        }
    }

    #[test]
    fn test_build_lambert() {
        let crs = ProjectedCrs::build(&arizona()).unwrap();
        assert_eq!(crs.family(), ProjectionFamily::LambertConformalConic);
        let f = 1.0 - (1.0 - 0.082271854f64 * 0.082271854).sqrt();
        assert_eq!(crs.ellipsoid().flattening(), f);
    }

    #[test]
    fn test_equal_parallels_allowed() {
        let params = ProjectionParams::lambert(40.0, 40.0, 40.0, -100.0, 6378137.0, 0.08);
        assert!(ProjectedCrs::build(&params).is_ok());
    }

    #[test]
    fn test_invalid_parameters_name_the_field() {
        let cases = [
            (
                ProjectionParams::lambert(33.0, 45.0, 31.0, -112.0, 6378206.4, 1.0),
                "eccentricity",
            ),
            (
                ProjectionParams::lambert(33.0, 45.0, 31.0, -112.0, -1.0, 0.08),
                "semi_major_axis",
            ),
            (
                ProjectionParams::lambert(91.0, 45.0, 31.0, -112.0, 6378206.4, 0.08),
                "lat_1",
            ),
            (
                ProjectionParams::lambert(33.0, -95.0, 31.0, -112.0, 6378206.4, 0.08),
                "lat_2",
            ),
            (
                ProjectionParams::lambert(33.0, 45.0, f64::NAN, -112.0, 6378206.4, 0.08),
                "lat_0",
            ),
            (
                ProjectionParams {
                    scale_factor: 0.0,
                    ..arizona()
                },
                "scale_factor",
            ),
            (
                ProjectionParams {
                    towgs84: Some([-8.0, f64::INFINITY, 185.0]),
                    ..arizona()
                },
                "towgs84",
            ),
        ];

        for (params, expected) in cases {
            match ProjectedCrs::build(&params) {
                Err(ProjectionError::InvalidParameter { name, .. }) => {
                    assert_eq!(name, expected, "wrong parameter blamed for {:?}", params)
                }
                other => panic!("expected InvalidParameter for {}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_units_scale_native_coordinates() {
        let metres = ProjectedCrs::build(&arizona()).unwrap();
        let feet = ProjectedCrs::build(&ProjectionParams {
            units: LinearUnit::UsSurveyFoot,
            ..arizona()
        })
        .unwrap();

        let (xm, ym) = metres.from_geodetic(-111.0, 34.0).unwrap();
        let (xf, yf) = feet.from_geodetic(-111.0, 34.0).unwrap();
        assert!((xf * LinearUnit::UsSurveyFoot.to_meter() - xm).abs() < 1e-6);
        assert!((yf * LinearUnit::UsSurveyFoot.to_meter() - ym).abs() < 1e-6);
    }

    #[test]
    fn test_lambert_wkt_content() {
        let wkt = ProjectedCrs::build(&arizona()).unwrap().to_wkt();
        assert!(wkt.starts_with("PROJCRS["));
        assert!(wkt.contains(r#"METHOD["Lambert Conic Conformal (2SP)",ID["EPSG",9802]]"#));
        assert!(wkt.contains(r#"PARAMETER["Latitude of false origin",31,"#));
        assert!(wkt.contains(r#"PARAMETER["Longitude of false origin",-112,"#));
        assert!(wkt.contains(r#"PARAMETER["Latitude of 1st standard parallel",33,"#));
        assert!(wkt.contains(r#"PARAMETER["Latitude of 2nd standard parallel",45,"#));
        assert!(wkt.contains(r#"DATUM["NAD27",ELLIPSOID["NAD27",6378206.4,294.97"#));
        assert_eq!(wkt.matches('[').count(), wkt.matches(']').count());
    }

    #[test]
    fn test_longlat_wkt_is_geographic() {
        let crs = ProjectedCrs::build(&ProjectionParams::longlat(6378137.0, 0.0)).unwrap();
        let wkt = crs.to_wkt();
        assert!(wkt.starts_with("GEOGCRS["));
        assert!(wkt.contains("CS[ellipsoidal,2]"));
        assert_eq!(wkt.matches('[').count(), wkt.matches(']').count());
    }

    #[test]
    fn test_proj_string() {
        let proj = ProjectedCrs::build(&ProjectionParams {
            towgs84: Some([-8.0, 160.0, 176.0]),
            ..arizona()
        })
        .unwrap()
        .to_proj_string();
        assert!(proj.starts_with("+proj=lcc +lat_1=33 +lat_2=45 +lat_0=31 +lon_0=-112"));
        assert!(proj.contains("+a=6378206.4"));
        assert!(proj.contains("+towgs84=-8,160,176"));
        assert!(proj.ends_with("+units=m +no_defs"));
    }

    #[test]
    fn test_wgs84_target() {
        let wgs84 = GeographicCrs::wgs84();
        assert_eq!(wgs84.to_string(), "EPSG:4326");
        let wkt = wgs84.to_wkt();
        assert!(wkt.starts_with(r#"GEOGCRS["WGS 84",DATUM["World Geodetic System 1984""#));
        assert!(wkt.contains("6378137,298.257223563"));
        assert!(wkt.ends_with(r#"ID["EPSG",4326]]"#));
        assert_eq!(wgs84.to_proj_string(), "+proj=longlat +datum=WGS84 +no_defs");
    }

    #[test]
    fn test_params_from_yaml() {
        let yaml = r#"
family: lcc
lat_1: 33
lat_2: 45
lat_0: 31
lon_0: -112
semi_major_axis: 6378206.4
eccentricity: 0.082271854
units: us-ft
towgs84: [-8, 160, 176]
"#;
        let params: ProjectionParams = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(params.family, ProjectionFamily::LambertConformalConic);
        assert_eq!(params.units, LinearUnit::UsSurveyFoot);
        assert_eq!(params.scale_factor, 1.0);
        assert_eq!(params.false_easting, 0.0);
        assert_eq!(params.towgs84, Some([-8.0, 160.0, 176.0]));

        let ll: ProjectionParams = serde_yaml::from_str("family: longlat").unwrap();
        assert_eq!(ll.family, ProjectionFamily::LongLat);
        assert_eq!(ll.semi_major_axis, 6378137.0);
    }
}
