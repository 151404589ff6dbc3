//! Error types for grid processing.

use gxf_parser::GxfError;
use projection::ProjectionError;
use thiserror::Error;

/// Errors that can occur while turning a survey grid into a geographic
/// dataset.
#[derive(Error, Debug)]
pub enum GridProcessorError {
    /// The input grid could not be parsed.
    #[error("grid format error: {0}")]
    Format(#[from] GxfError),

    /// The source CRS could not be built.
    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),

    /// The point set cannot be triangulated or the target grid is unusable.
    #[error("interpolation error ({points} points): {reason}")]
    Interpolation { points: usize, reason: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Zarr storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GridProcessorError {
    /// Create an Interpolation error.
    pub fn interpolation(points: usize, reason: impl Into<String>) -> Self {
        Self::Interpolation {
            points,
            reason: reason.into(),
        }
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a Storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

impl From<serde_yaml::Error> for GridProcessorError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for GridProcessorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
