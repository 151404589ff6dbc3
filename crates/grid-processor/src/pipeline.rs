//! End-to-end conversion of a GXF survey into a regridded Zarr dataset.
//!
//! [`process`] runs every stage in memory and returns the [`Dataset`];
//! nothing is written unless parsing, reprojection and regridding all
//! succeed. [`run`] adds file input and Zarr output around it, optionally
//! storing the projected raster and the reprojected samples as well.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use gxf_parser::{parse_gxf, parse_gxf_auto, GridHeader, RasterGrid};
use projection::{GeographicCrs, ProjectedCrs, ProjectionParams, Transformer};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use zarrs_filesystem::FilesystemStore;

use crate::config::{RegridConfig, WriterConfig};
use crate::dataset::{Dataset, DatasetAttributes, DEFAULT_VARIABLE};
use crate::error::{GridProcessorError, Result};
use crate::regrid::regrid;
use crate::reproject::{reproject, Reprojection};
use crate::stage::StageAttributes;
use crate::writer::{ZarrWriteResult, ZarrWriter};

fn default_variable() -> String {
    DEFAULT_VARIABLE.to_string()
}

/// Everything needed to turn one survey grid into one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// GXF file to read.
    pub input: PathBuf,

    /// Directory of the Zarr group to write.
    pub output: PathBuf,

    /// Where to store the parsed raster in its own CRS, if anywhere.
    #[serde(default)]
    pub projected_output: Option<PathBuf>,

    /// Where to store the reprojected sample positions, if anywhere.
    #[serde(default)]
    pub reprojected_output: Option<PathBuf>,

    /// Name of the value array.
    #[serde(default = "default_variable")]
    pub variable: String,

    /// Dataset description; the GXF `#TITLE` is used when empty.
    #[serde(default)]
    pub description: String,

    /// Grid geometry. When absent it is read from the GXF keywords.
    #[serde(default)]
    pub header: Option<GridHeader>,

    /// Projected CRS the survey coordinates are expressed in.
    pub projection: ProjectionParams,

    #[serde(default)]
    pub regrid: RegridConfig,

    #[serde(default)]
    pub writer: WriterConfig,
}

impl PipelineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let yaml = std::fs::read_to_string(&path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Apply `REGRID_*` and `ZARR_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.regrid.apply_env();
        self.writer.apply_env();
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.variable.is_empty() || self.variable.contains('/') {
            return Err(GridProcessorError::config(format!(
                "variable name {:?} must be non-empty and contain no '/'",
                self.variable
            )));
        }
        if matches!(self.variable.as_str(), "lat" | "lon" | "x" | "y") {
            return Err(GridProcessorError::config(format!(
                "variable name {:?} collides with a coordinate array",
                self.variable
            )));
        }
        let stages = [self.projected_output.as_ref(), self.reprojected_output.as_ref()];
        for (i, stage) in stages.iter().enumerate() {
            let Some(path) = *stage else { continue };
            let clashes = *path == self.output || stages[i + 1..].contains(&Some(path));
            if clashes {
                return Err(GridProcessorError::config(format!(
                    "output path {} is used by more than one group",
                    path.display()
                )));
            }
        }
        self.regrid.validate().map_err(GridProcessorError::Config)?;
        self.writer.validate().map_err(GridProcessorError::Config)?;
        Ok(())
    }
}

/// What a completed [`run`] produced.
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    /// Value array shape `(lat, lon)`.
    pub shape: (usize, usize),
    /// Nodes inside the survey footprint.
    pub valid_nodes: usize,
    /// Samples lost to reprojection failures.
    pub dropped_samples: usize,
    pub write: ZarrWriteResult,
    /// Present when `projected_output` was configured.
    pub projected_write: Option<ZarrWriteResult>,
    /// Present when `reprojected_output` was configured.
    pub reprojected_write: Option<ZarrWriteResult>,
    pub elapsed: Duration,
}

/// Every product of one pass over a survey grid.
#[derive(Debug, Clone)]
pub struct ProcessedSurvey {
    /// The parsed raster in the survey CRS.
    pub raster: RasterGrid,
    pub projected: StageAttributes,
    /// Sample positions in WGS84.
    pub reprojection: Reprojection,
    pub reprojected: StageAttributes,
    /// The regridded dataset.
    pub dataset: Dataset,
}

/// Parse, reproject and regrid a GXF stream.
pub fn process<R: BufRead>(reader: R, config: &PipelineConfig) -> Result<Dataset> {
    Ok(process_stages(reader, config)?.dataset)
}

/// Like [`process`], keeping the raster and point cloud it passes through.
pub fn process_stages<R: BufRead>(
    reader: R,
    config: &PipelineConfig,
) -> Result<ProcessedSurvey> {
    let (grid, title) = read_grid(reader, config.header.as_ref())?;
    let header = grid.header().clone();

    let source = ProjectedCrs::build(&config.projection)?;
    let target = GeographicCrs::wgs84();
    let transformer = Transformer::new(&source, &target);

    let reprojection = reproject(&grid, &transformer, config.regrid.parallel);
    let regular = regrid(&reprojection.cloud, &config.regrid)?;

    let description = if config.description.is_empty() {
        title.unwrap_or_default()
    } else {
        config.description.clone()
    };
    let source_wkt = source.to_wkt();
    let target_wkt = target.to_wkt();

    let projected = StageAttributes {
        description: description.clone(),
        dx: header.dx,
        dy: header.dy,
        rotation: header.rotation,
        proj_wkt: source_wkt.clone(),
        source_proj_wkt: None,
        dropped_samples: 0,
    };
    let reprojected = StageAttributes {
        proj_wkt: target_wkt.clone(),
        source_proj_wkt: Some(source_wkt.clone()),
        dropped_samples: reprojection.dropped,
        ..projected.clone()
    };

    let attributes = DatasetAttributes {
        description,
        dx: header.dx,
        dy: header.dy,
        proj_wkt: target_wkt,
        source_proj_wkt: Some(source_wkt),
        lon_step: regular.lon_step,
        lat_step: regular.lat_step,
        dropped_samples: reprojection.dropped,
    };
    let dataset =
        Dataset::assemble(regular, attributes).with_variable(config.variable.as_str());

    Ok(ProcessedSurvey {
        raster: grid,
        projected,
        reprojection,
        reprojected,
        dataset,
    })
}

fn read_grid<R: BufRead>(
    reader: R,
    header: Option<&GridHeader>,
) -> Result<(RasterGrid, Option<String>)> {
    match header {
        Some(header) => Ok((parse_gxf(reader, header)?, None)),
        None => {
            let (keywords, grid) = parse_gxf_auto(reader)?;
            Ok((grid, keywords.title().map(str::to_string)))
        }
    }
}

/// Read `config.input`, process it and write the dataset to `config.output`.
pub fn run(config: &PipelineConfig) -> Result<PipelineSummary> {
    let start = Instant::now();
    config.validate()?;

    info!(
        input = %config.input.display(),
        output = %config.output.display(),
        spacing = %config.regrid.spacing,
        parallel = config.regrid.parallel,
        "Starting regridding pipeline"
    );

    let file = File::open(&config.input)?;
    let survey = process_stages(BufReader::new(file), config)?;
    let dataset = &survey.dataset;

    let (rows, cols) = dataset.shape();
    let valid_nodes = dataset.grid().valid_count();
    if valid_nodes == 0 {
        warn!(rows = rows, cols = cols, "Regridded dataset has no valid nodes");
    }

    let writer = ZarrWriter::new(config.writer.clone());

    let projected_write = match &config.projected_output {
        Some(path) => Some(writer.write_projected(
            open_store(path)?,
            &survey.raster,
            &config.variable,
            &survey.projected,
            config.projection.units.proj_name(),
        )?),
        None => None,
    };
    let reprojected_write = match &config.reprojected_output {
        Some(path) => Some(writer.write_reprojected(
            open_store(path)?,
            &survey.reprojection.cloud,
            &config.variable,
            &survey.reprojected,
        )?),
        None => None,
    };
    let write = writer.write(open_store(&config.output)?, dataset)?;

    let summary = PipelineSummary {
        shape: (rows, cols),
        valid_nodes,
        dropped_samples: dataset.attributes().dropped_samples,
        write,
        projected_write,
        reprojected_write,
        elapsed: start.elapsed(),
    };

    info!(
        rows = rows,
        cols = cols,
        valid = valid_nodes,
        dropped = summary.dropped_samples,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Pipeline complete"
    );

    Ok(summary)
}

fn open_store(path: &Path) -> Result<Arc<FilesystemStore>> {
    std::fs::create_dir_all(path)?;
    let store =
        FilesystemStore::new(path).map_err(|e| GridProcessorError::storage(e.to_string()))?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
input: /data/arizona.gxf
output: /data/arizona.zarr
description: Arizona aeromagnetic
projection:
  family: lcc
  lat_1: 33
  lat_2: 45
  lat_0: 31
  lon_0: -112
  semi_major_axis: 6378206.4
  eccentricity: 0.082271854
regrid:
  spacing:
    method: median_neighbor
writer:
  chunk_size: 256
"#;

    #[test]
    fn test_config_from_yaml() {
        let config = PipelineConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.input, PathBuf::from("/data/arizona.gxf"));
        assert_eq!(config.variable, "tfa");
        assert!(config.header.is_none());
        assert_eq!(config.projection.lat_1, 33.0);
        assert_eq!(config.regrid.spacing, crate::config::SpacingStrategy::MedianNeighbor);
        assert!(config.regrid.parallel);
        assert_eq!(config.writer.chunk_size, 256);
        assert_eq!(config.writer.compression_level, 1);
        assert!(config.projected_output.is_none());
        assert!(config.reprojected_output.is_none());
    }

    #[test]
    fn test_stage_outputs_must_not_share_a_path() {
        let yaml = YAML.replace(
            "description:",
            "projected_output: /data/lcc.zarr\nreprojected_output: /data/wgs84.zarr\ndescription:",
        );
        let config = PipelineConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.projected_output, Some(PathBuf::from("/data/lcc.zarr")));

        let same_as_output = PipelineConfig {
            reprojected_output: Some(config.output.clone()),
            ..config.clone()
        };
        assert!(matches!(
            same_as_output.validate(),
            Err(GridProcessorError::Config(_))
        ));

        let same_stage = PipelineConfig {
            reprojected_output: config.projected_output.clone(),
            ..config
        };
        assert!(matches!(same_stage.validate(), Err(GridProcessorError::Config(_))));
    }

    #[test]
    fn test_config_with_header() {
        let yaml = r#"
input: in.gxf
output: out.zarr
variable: anomaly
header:
  rows: 1285
  cols: 1134
  x_origin: -269500
  y_origin: 35000
  dx: 500
  dy: 500
projection:
  family: lambert_conformal_conic
  lat_1: 33
  lat_2: 45
  lat_0: 31
  lon_0: -112
"#;
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        let header = config.header.unwrap();
        assert_eq!((header.rows, header.cols), (1285, 1134));
        assert_eq!(header.null_value, gxf_parser::DEFAULT_NULL_VALUE);
        assert_eq!(header.rotation, 0.0);
        assert_eq!(config.variable, "anomaly");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad_variable = YAML.replace("description:", "variable: lat\ndescription:");
        assert!(matches!(
            PipelineConfig::from_yaml_str(&bad_variable),
            Err(GridProcessorError::Config(_))
        ));

        let bad_level = YAML.replace("chunk_size: 256", "compression_level: 12");
        assert!(matches!(
            PipelineConfig::from_yaml_str(&bad_level),
            Err(GridProcessorError::Config(_))
        ));

        assert!(matches!(
            PipelineConfig::from_yaml_str("input: a\noutput: b\n"),
            Err(GridProcessorError::Config(_))
        ));
    }
}
