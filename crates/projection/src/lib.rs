//! Coordinate reference system construction and transformations.
//!
//! Implements the map projection math from scratch: ellipsoids, the
//! ellipsoidal Lambert Conformal Conic projection, and a three-parameter
//! datum shift, plus WKT2 and PROJ-string rendering of the resulting CRS.
//!
//! # Example
//!
//! ```
//! use projection::{GeographicCrs, ProjectedCrs, ProjectionParams, Transformer};
//!
//! let params = ProjectionParams::lambert(33.0, 45.0, 31.0, -112.0, 6378206.4, 0.082271854);
//! let source = ProjectedCrs::build(&params).unwrap();
//! let transformer = Transformer::new(&source, &GeographicCrs::wgs84());
//!
//! let (lon, lat) = transformer.forward(0.0, 0.0).unwrap();
//! assert!((lon + 112.0).abs() < 1e-9);
//! assert!((lat - 31.0).abs() < 1e-9);
//! ```

pub mod crs;
pub mod ellipsoid;
pub mod error;
pub mod geographic;
pub mod lambert;
pub mod transform;

pub use crs::{GeographicCrs, LinearUnit, ProjectedCrs, ProjectionFamily, ProjectionParams};
pub use ellipsoid::Ellipsoid;
pub use error::{ProjectionError, ProjectionResult};
pub use geographic::LongLat;
pub use lambert::LambertConformal;
pub use transform::{DatumShift, Transformer};
