//! Error types for CRS construction and coordinate transforms.

use thiserror::Error;

/// Result type for projection operations.
pub type ProjectionResult<T> = Result<T, ProjectionError>;

/// Errors raised while building a CRS or transforming coordinates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    /// A CRS parameter is outside its valid range
    #[error("invalid projection parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The coordinate has no finite image under the transform
    #[error("coordinate ({x}, {y}) is outside the domain of the transform")]
    OutOfDomain { x: f64, y: f64 },
}

impl ProjectionError {
    /// Create an InvalidParameter error.
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
