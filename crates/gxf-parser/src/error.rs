//! Error types for GXF parsing operations.

use thiserror::Error;

/// Result type for GXF parser operations.
pub type GxfResult<T> = Result<T, GxfError>;

/// Format errors raised while reading a GXF grid.
///
/// Line numbers are 1-based and refer to the physical line of the input
/// stream on which the problem was detected.
#[derive(Error, Debug)]
pub enum GxfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The `#GRID` line that starts the data section was never found
    #[error("missing {marker} line after {lines_read} lines of header")]
    MissingGridMarker {
        marker: &'static str,
        lines_read: usize,
    },

    /// A data token could not be parsed as a floating-point number
    #[error("line {line}: invalid numeric token '{token}'")]
    InvalidToken { line: usize, token: String },

    /// The data section holds more values than rows x cols
    #[error("line {line}: grid overflow, expected exactly {expected} values")]
    TooManyValues { line: usize, expected: usize },

    /// The data section ended before rows x cols values were read
    #[error("grid underflow: expected {expected} values, found {found}")]
    TooFewValues { expected: usize, found: usize },

    /// A required header keyword is absent
    #[error("missing required header keyword {0}")]
    MissingKeyword(&'static str),

    /// A header keyword carried a value that could not be interpreted
    #[error("line {line}: invalid value '{value}' for keyword {keyword}")]
    InvalidKeyword {
        keyword: String,
        line: usize,
        value: String,
    },

    /// Header values that cannot describe a regular grid
    #[error("invalid grid header: {0}")]
    InvalidHeader(String),
}
