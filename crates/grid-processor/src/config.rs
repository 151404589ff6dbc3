//! Configuration for regridding and Zarr output.

use serde::{Deserialize, Serialize};

/// Upper bound on output grid nodes unless configured otherwise.
pub const DEFAULT_MAX_NODES: usize = 100_000_000;

/// How the target longitude/latitude spacing is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SpacingStrategy {
    /// Distance between the first transformed samples along a row and a
    /// column. Approximate: assumes distortion is uniform across the grid.
    #[default]
    FirstCells,
    /// Median of the absolute coordinate differences over every adjacent
    /// sample pair.
    MedianNeighbor,
    /// Explicit spacing in degrees.
    Fixed { dlon: f64, dlat: f64 },
}

impl SpacingStrategy {
    /// Parse from string (case-insensitive).
    ///
    /// Accepts `first_cells`, `median_neighbor` and `fixed:<dlon>,<dlat>`.
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "first_cells" => Some(Self::FirstCells),
            "median_neighbor" => Some(Self::MedianNeighbor),
            other => {
                let (dlon, dlat) = other.strip_prefix("fixed:")?.split_once(',')?;
                Some(Self::Fixed {
                    dlon: dlon.trim().parse().ok()?,
                    dlat: dlat.trim().parse().ok()?,
                })
            }
        }
    }
}

impl std::fmt::Display for SpacingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstCells => write!(f, "first_cells"),
            Self::MedianNeighbor => write!(f, "median_neighbor"),
            Self::Fixed { dlon, dlat } => write!(f, "fixed:{},{}", dlon, dlat),
        }
    }
}

/// Configuration for the regridding stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegridConfig {
    /// Target spacing estimator.
    pub spacing: SpacingStrategy,

    /// Run reprojection and interpolation on the rayon thread pool.
    pub parallel: bool,

    /// Reject target grids with more nodes than this.
    pub max_nodes: usize,
}

impl Default for RegridConfig {
    fn default() -> Self {
        Self {
            spacing: SpacingStrategy::FirstCells,
            parallel: true,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

impl RegridConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from `REGRID_*` environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("REGRID_SPACING") {
            if let Some(spacing) = SpacingStrategy::parse(&val) {
                self.spacing = spacing;
            }
        }

        if let Ok(val) = std::env::var("REGRID_PARALLEL") {
            self.parallel = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("REGRID_MAX_NODES") {
            if let Ok(max) = val.parse() {
                self.max_nodes = max;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_nodes == 0 {
            return Err("max_nodes must be > 0".to_string());
        }

        if let SpacingStrategy::Fixed { dlon, dlat } = self.spacing {
            if !(dlon.is_finite() && dlon > 0.0 && dlat.is_finite() && dlat > 0.0) {
                return Err(format!(
                    "fixed spacing must be positive, got dlon={} dlat={}",
                    dlon, dlat
                ));
            }
        }

        Ok(())
    }
}

/// Configuration for the Zarr writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Chunk dimension for the value array (square chunks).
    pub chunk_size: usize,

    /// Compression codec.
    pub compression: ZarrCompression,

    /// Compression level (1-9).
    pub compression_level: u8,

    /// Enable byte shuffle filter for better compression.
    pub shuffle: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            compression: ZarrCompression::BloscZstd,
            compression_level: 1,
            shuffle: true,
        }
    }
}

impl WriterConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from `ZARR_*` environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("ZARR_CHUNK_SIZE") {
            if let Ok(size) = val.parse() {
                self.chunk_size = size;
            }
        }

        if let Ok(val) = std::env::var("ZARR_COMPRESSION") {
            self.compression = ZarrCompression::from_str(&val);
        }

        if let Ok(val) = std::env::var("ZARR_COMPRESSION_LEVEL") {
            if let Ok(level) = val.parse() {
                self.compression_level = level;
            }
        }

        if let Ok(val) = std::env::var("ZARR_SHUFFLE") {
            self.shuffle = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".to_string());
        }

        if self.compression_level == 0 || self.compression_level > 9 {
            return Err("compression_level must be 1-9".to_string());
        }

        Ok(())
    }
}

/// Compression codec for Zarr files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZarrCompression {
    /// No compression.
    None,
    /// Blosc with LZ4.
    BloscLz4,
    /// Blosc with Zstd (recommended).
    #[default]
    BloscZstd,
}

impl ZarrCompression {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" => Self::None,
            "lz4" | "blosc_lz4" => Self::BloscLz4,
            "zstd" | "blosc_zstd" => Self::BloscZstd,
            _ => Self::BloscZstd,
        }
    }

    /// Get the codec name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BloscLz4 => "blosc_lz4",
            Self::BloscZstd => "blosc_zstd",
        }
    }
}

impl std::fmt::Display for ZarrCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
