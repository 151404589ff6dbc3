//! Zarr V3 writer for regridded datasets and pipeline stages.
//!
//! Layout of a written dataset:
//!
//! ```text
//! /            group, attributes = DatasetAttributes
//! /<variable>  f64 [lat, lon], NaN fill, chunked and optionally compressed
//! /lat         f64 [lat]
//! /lon         f64 [lon]
//! ```
//!
//! Stage groups are laid out as described in [`crate::stage`].

use std::sync::Arc;

use gxf_parser::{GridHeader, RasterGrid};
use tracing::{debug, info};
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::codec::BytesToBytesCodecTraits;
use zarrs::array::{Array, ArrayBuilder, ChunkGrid, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::{Group, GroupBuilder};
use zarrs::storage::{ReadableStorageTraits, WritableStorageTraits};

use crate::config::{WriterConfig, ZarrCompression};
use crate::dataset::{Dataset, DatasetAttributes, DIMENSIONS};
use crate::error::{GridProcessorError, Result};
use crate::stage::{StageAttributes, RASTER_DIMENSIONS};
use crate::types::{PointCloud, RegularGeoGrid};

/// Attribute naming an array's dimensions, as xarray expects it.
const ARRAY_DIMENSIONS: &str = "_ARRAY_DIMENSIONS";

type AttributeMap = serde_json::Map<String, serde_json::Value>;

/// Result of writing a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ZarrWriteResult {
    /// Value array shape, slow axis first.
    pub shape: (usize, usize),
    /// Value array chunk shape, slow axis first.
    pub chunk_shape: (usize, usize),
    /// Compression codec used.
    pub compression: String,
    /// Uncompressed bytes written across all arrays.
    pub bytes_written: u64,
}

/// Writer for storing a [`Dataset`] or a pipeline stage as a Zarr V3 group.
pub struct ZarrWriter {
    config: WriterConfig,
}

impl ZarrWriter {
    /// Create a new ZarrWriter with the given configuration.
    pub fn new(config: WriterConfig) -> Self {
        Self { config }
    }

    /// Write `dataset` at the root of `storage`.
    pub fn write<S: ReadableStorageTraits + WritableStorageTraits + 'static>(
        &self,
        storage: Arc<S>,
        dataset: &Dataset,
    ) -> Result<ZarrWriteResult> {
        let grid = dataset.grid();
        let (rows, cols) = grid.shape();
        check_len(grid.values.len(), rows, cols)?;

        write_group(storage.clone(), dataset.attributes().to_json_map()?)?;

        let values_path = format!("/{}", dataset.variable());
        let chunk_shape = self.write_field(
            storage.clone(),
            &values_path,
            (rows, cols),
            DIMENSIONS,
            None,
            &grid.values,
        )?;
        write_axis(storage.clone(), "/lat", DIMENSIONS[0], "degrees_north", &grid.lat)?;
        write_axis(storage, "/lon", DIMENSIONS[1], "degrees_east", &grid.lon)?;

        let bytes_written = f64_bytes(grid.values.len() + rows + cols);

        info!(
            variable = dataset.variable(),
            rows = rows,
            cols = cols,
            chunk_rows = chunk_shape.0,
            chunk_cols = chunk_shape.1,
            compression = %self.config.compression,
            bytes = bytes_written,
            "Wrote Zarr dataset"
        );

        Ok(self.result((rows, cols), chunk_shape, bytes_written))
    }

    /// Write the survey raster in its own CRS. `axis_units` labels the
    /// x and y axes.
    pub fn write_projected<S: ReadableStorageTraits + WritableStorageTraits + 'static>(
        &self,
        storage: Arc<S>,
        grid: &RasterGrid,
        variable: &str,
        attributes: &StageAttributes,
        axis_units: &str,
    ) -> Result<ZarrWriteResult> {
        let (rows, cols) = (grid.rows(), grid.cols());
        check_len(grid.values().len(), rows, cols)?;

        write_group(storage.clone(), attributes.to_json_map()?)?;
        let chunk_shape = self.write_field(
            storage.clone(),
            &format!("/{}", variable),
            (rows, cols),
            RASTER_DIMENSIONS,
            None,
            grid.values(),
        )?;
        write_axis(storage.clone(), "/y", RASTER_DIMENSIONS[0], axis_units, &grid.y_axis())?;
        write_axis(storage, "/x", RASTER_DIMENSIONS[1], axis_units, &grid.x_axis())?;

        let bytes_written = f64_bytes(rows * cols + rows + cols);
        info!(
            variable = variable,
            rows = rows,
            cols = cols,
            bytes = bytes_written,
            "Wrote projected stage"
        );
        Ok(self.result((rows, cols), chunk_shape, bytes_written))
    }

    /// Write reprojected sample positions over the source raster shape.
    /// Dropped samples are NaN in every array.
    pub fn write_reprojected<S: ReadableStorageTraits + WritableStorageTraits + 'static>(
        &self,
        storage: Arc<S>,
        cloud: &PointCloud,
        variable: &str,
        attributes: &StageAttributes,
    ) -> Result<ZarrWriteResult> {
        let shape = cloud.source_shape;

        write_group(storage.clone(), attributes.to_json_map()?)?;
        let chunk_shape = self.write_field(
            storage.clone(),
            &format!("/{}", variable),
            shape,
            RASTER_DIMENSIONS,
            None,
            &cloud.dense_field(&cloud.values),
        )?;
        self.write_field(
            storage.clone(),
            "/lat",
            shape,
            RASTER_DIMENSIONS,
            Some("degrees_north"),
            &cloud.dense_field(&cloud.lat),
        )?;
        self.write_field(
            storage,
            "/lon",
            shape,
            RASTER_DIMENSIONS,
            Some("degrees_east"),
            &cloud.dense_field(&cloud.lon),
        )?;

        let bytes_written = f64_bytes(3 * shape.0 * shape.1);
        info!(
            variable = variable,
            rows = shape.0,
            cols = shape.1,
            samples = cloud.len(),
            bytes = bytes_written,
            "Wrote reprojected stage"
        );
        Ok(self.result(shape, chunk_shape, bytes_written))
    }

    fn result(
        &self,
        shape: (usize, usize),
        chunk_shape: (usize, usize),
        bytes_written: u64,
    ) -> ZarrWriteResult {
        ZarrWriteResult {
            shape,
            chunk_shape,
            compression: self.config.compression.as_str().to_string(),
            bytes_written,
        }
    }

    /// Store a chunked, optionally compressed 2-D array and return its
    /// chunk shape.
    fn write_field<S: ReadableStorageTraits + WritableStorageTraits + 'static>(
        &self,
        storage: Arc<S>,
        path: &str,
        shape: (usize, usize),
        dimensions: [&str; 2],
        units: Option<&str>,
        data: &[f64],
    ) -> Result<(usize, usize)> {
        let (rows, cols) = shape;
        check_len(data.len(), rows, cols)?;

        let mut attrs = AttributeMap::new();
        attrs.insert(ARRAY_DIMENSIONS.to_string(), serde_json::json!(dimensions));
        if let Some(units) = units {
            attrs.insert("units".to_string(), serde_json::json!(units));
        }

        let chunk_shape = (
            self.config.chunk_size.min(rows).max(1),
            self.config.chunk_size.min(cols).max(1),
        );
        let chunk_grid: ChunkGrid = vec![chunk_shape.0 as u64, chunk_shape.1 as u64]
            .try_into()
            .map_err(|e| GridProcessorError::config(format!("{:?}", e)))?;

        let mut binding = ArrayBuilder::new(
            vec![rows as u64, cols as u64],
            DataType::Float64,
            chunk_grid,
            FillValue::from(f64::NAN),
        );
        let mut builder = binding.attributes(attrs);

        if self.config.compression != ZarrCompression::None {
            let codec = self.create_compression_codec()?;
            builder = builder.bytes_to_bytes_codecs(vec![codec]);
        }

        let array = builder
            .build(storage, path)
            .map_err(|e| GridProcessorError::storage(e.to_string()))?;
        store_all(&array, vec![rows as u64, cols as u64], data)?;

        debug!(path = path, rows = rows, cols = cols, "Stored 2-D array");
        Ok(chunk_shape)
    }

    /// Create the compression codec based on configuration.
    fn create_compression_codec(&self) -> Result<Arc<dyn BytesToBytesCodecTraits>> {
        let level = BloscCompressionLevel::try_from(self.config.compression_level)
            .map_err(|_| GridProcessorError::config("Invalid compression level"))?;

        let shuffle = if self.config.shuffle {
            BloscShuffleMode::Shuffle
        } else {
            BloscShuffleMode::NoShuffle
        };

        // typesize is required when shuffle is enabled
        let typesize = self.config.shuffle.then_some(std::mem::size_of::<f64>());

        let compressor = match self.config.compression {
            ZarrCompression::None => {
                return Err(GridProcessorError::config("No compression configured"))
            }
            ZarrCompression::BloscLz4 => BloscCompressor::LZ4,
            ZarrCompression::BloscZstd => BloscCompressor::Zstd,
        };

        let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
            .map_err(|e| GridProcessorError::config(e.to_string()))?;

        Ok(Arc::new(codec))
    }
}

fn f64_bytes(elements: usize) -> u64 {
    (elements * std::mem::size_of::<f64>()) as u64
}

fn check_len(len: usize, rows: usize, cols: usize) -> Result<()> {
    if len != rows * cols {
        return Err(GridProcessorError::storage(format!(
            "value buffer holds {} elements, expected {}x{}",
            len, rows, cols
        )));
    }
    Ok(())
}

fn write_group<S: ReadableStorageTraits + WritableStorageTraits + 'static>(
    storage: Arc<S>,
    attributes: AttributeMap,
) -> Result<()> {
    let group = GroupBuilder::new()
        .attributes(attributes)
        .build(storage, "/")
        .map_err(|e| GridProcessorError::storage(e.to_string()))?;
    group
        .store_metadata()
        .map_err(|e| GridProcessorError::storage(e.to_string()))
}

fn write_axis<S: ReadableStorageTraits + WritableStorageTraits + 'static>(
    storage: Arc<S>,
    path: &str,
    dimension: &str,
    units: &str,
    values: &[f64],
) -> Result<()> {
    let mut attrs = AttributeMap::new();
    attrs.insert(ARRAY_DIMENSIONS.to_string(), serde_json::json!([dimension]));
    attrs.insert("units".to_string(), serde_json::json!(units));

    let len = values.len() as u64;
    let chunk_grid: ChunkGrid = vec![len.max(1)]
        .try_into()
        .map_err(|e| GridProcessorError::config(format!("{:?}", e)))?;

    let array = ArrayBuilder::new(vec![len], DataType::Float64, chunk_grid, FillValue::from(f64::NAN))
        .attributes(attrs)
        .build(storage, path)
        .map_err(|e| GridProcessorError::storage(e.to_string()))?;
    store_all(&array, vec![len], values)
}

fn store_all<S: ReadableStorageTraits + WritableStorageTraits + 'static>(
    array: &Array<S>,
    shape: Vec<u64>,
    data: &[f64],
) -> Result<()> {
    array
        .store_metadata()
        .map_err(|e| GridProcessorError::storage(e.to_string()))?;

    let subset = ArraySubset::new_with_start_shape(vec![0; shape.len()], shape)
        .map_err(|e| GridProcessorError::storage(e.to_string()))?;
    array
        .store_array_subset_elements(&subset, data)
        .map_err(|e| GridProcessorError::storage(e.to_string()))
}

/// Read a dataset written by [`ZarrWriter::write`].
pub fn read_dataset<S: ReadableStorageTraits + 'static>(
    storage: Arc<S>,
    variable: &str,
) -> Result<Dataset> {
    let attributes = DatasetAttributes::from_json_map(&read_group_attributes(storage.clone())?)?;

    let values = read_all(storage.clone(), &format!("/{}", variable))?.1;
    let lat = read_all(storage.clone(), "/lat")?.1;
    let lon = read_all(storage, "/lon")?.1;

    if values.len() != lat.len() * lon.len() {
        return Err(GridProcessorError::storage(format!(
            "array /{} holds {} elements, axes describe {}x{}",
            variable,
            values.len(),
            lat.len(),
            lon.len()
        )));
    }

    let grid = RegularGeoGrid {
        lon,
        lat,
        values,
        lon_step: attributes.lon_step,
        lat_step: attributes.lat_step,
    };
    Ok(Dataset::assemble(grid, attributes).with_variable(variable))
}

/// Read a raster written by [`ZarrWriter::write_projected`].
pub fn read_projected<S: ReadableStorageTraits + 'static>(
    storage: Arc<S>,
    variable: &str,
) -> Result<(RasterGrid, StageAttributes)> {
    let attributes = StageAttributes::from_json_map(&read_group_attributes(storage.clone())?)?;

    let values = read_all(storage.clone(), &format!("/{}", variable))?.1;
    let y = read_all(storage.clone(), "/y")?.1;
    let x = read_all(storage, "/x")?.1;

    let (x_origin, y_origin) = match (x.first(), y.first()) {
        (Some(&x0), Some(&y0)) => (x0, y0),
        _ => return Err(GridProcessorError::storage("projected stage has an empty axis")),
    };

    let header = GridHeader {
        rotation: attributes.rotation,
        ..GridHeader::new(y.len(), x.len(), x_origin, y_origin, attributes.dx, attributes.dy)
    };
    let grid = RasterGrid::new(header, values)?;
    Ok((grid, attributes))
}

/// Read sample positions written by [`ZarrWriter::write_reprojected`].
///
/// Cells with a NaN coordinate are treated as dropped samples, so the
/// returned cloud matches the one that was written.
pub fn read_reprojected<S: ReadableStorageTraits + 'static>(
    storage: Arc<S>,
    variable: &str,
) -> Result<(PointCloud, StageAttributes)> {
    let attributes = StageAttributes::from_json_map(&read_group_attributes(storage.clone())?)?;

    let (shape, values) = read_all(storage.clone(), &format!("/{}", variable))?;
    let (lat_shape, lat) = read_all(storage.clone(), "/lat")?;
    let (lon_shape, lon) = read_all(storage, "/lon")?;

    if shape.len() != 2 || lat_shape != shape || lon_shape != shape {
        return Err(GridProcessorError::storage(format!(
            "reprojected arrays disagree in shape: /{} {:?}, /lat {:?}, /lon {:?}",
            variable, shape, lat_shape, lon_shape
        )));
    }
    let source_shape = (shape[0] as usize, shape[1] as usize);

    let mut cloud = PointCloud::with_capacity(values.len(), source_shape);
    for (i, ((&lon, &lat), &value)) in lon.iter().zip(&lat).zip(&values).enumerate() {
        if lon.is_finite() && lat.is_finite() {
            cloud.push(lon, lat, value, i);
        }
    }
    Ok((cloud, attributes))
}

fn read_group_attributes<S: ReadableStorageTraits + 'static>(storage: Arc<S>) -> Result<AttributeMap> {
    let group =
        Group::open(storage, "/").map_err(|e| GridProcessorError::storage(e.to_string()))?;
    Ok(group.attributes().clone())
}

fn read_all<S: ReadableStorageTraits + 'static>(
    storage: Arc<S>,
    path: &str,
) -> Result<(Vec<u64>, Vec<f64>)> {
    let array =
        Array::open(storage, path).map_err(|e| GridProcessorError::storage(e.to_string()))?;
    let shape = array.shape().to_vec();
    let subset = ArraySubset::new_with_shape(shape.clone());
    let values = array
        .retrieve_array_subset_elements::<f64>(&subset)
        .map_err(|e| GridProcessorError::storage(e.to_string()))?;
    Ok((shape, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zarrs_filesystem::FilesystemStore;

    fn create_test_dataset(rows: usize, cols: usize) -> Dataset {
        let mut values: Vec<f64> = (0..rows * cols).map(|i| i as f64 * 0.5).collect();
        values[1] = f64::NAN;
        let grid = RegularGeoGrid {
            lon: (0..cols).map(|j| -112.0 + j as f64 * 0.01).collect(),
            lat: (0..rows).map(|i| 33.0 + i as f64 * 0.02).collect(),
            values,
            lon_step: 0.01,
            lat_step: 0.02,
        };
        let attributes = DatasetAttributes {
            description: "Synthetic survey".to_string(),
            dx: 100.0,
            dy: 100.0,
            proj_wkt: "GEOGCRS[\"WGS 84\"]".to_string(),
            source_proj_wkt: Some("PROJCRS[\"unknown\"]".to_string()),
            lon_step: 0.0,
            lat_step: 0.0,
            dropped_samples: 3,
        };
        Dataset::assemble(grid, attributes)
    }

    fn open_store(dir: &tempfile::TempDir, name: &str) -> Arc<FilesystemStore> {
        let path = dir.path().join(name);
        std::fs::create_dir_all(&path).expect("Failed to create dir");
        Arc::new(FilesystemStore::new(&path).expect("Failed to create store"))
    }

    #[test]
    fn test_zarr_writer_simple() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = open_store(&temp_dir, "simple.zarr");

        let config = WriterConfig {
            compression: ZarrCompression::None,
            ..Default::default()
        };
        let dataset = create_test_dataset(8, 10);
        let result = ZarrWriter::new(config)
            .write(store.clone(), &dataset)
            .expect("Failed to write");

        assert_eq!(result.shape, (8, 10));
        assert_eq!(result.chunk_shape, (8, 10));
        assert_eq!(result.compression, "none");

        let read = read_dataset(store, "tfa").expect("Failed to read");
        assert_eq!(read.lat(), dataset.lat());
        assert_eq!(read.lon(), dataset.lon());
        assert!(read.values()[1].is_nan());
        assert_eq!(read.values()[2], 1.0);
        assert_eq!(read.attributes(), dataset.attributes());
    }

    #[test]
    fn test_zarr_writer_with_compression() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = open_store(&temp_dir, "compressed.zarr");

        let config = WriterConfig {
            compression: ZarrCompression::BloscZstd,
            compression_level: 1,
            shuffle: true,
            chunk_size: 4,
        };
        let dataset = create_test_dataset(9, 7);
        let result = ZarrWriter::new(config)
            .write(store.clone(), &dataset)
            .expect("Failed to write");

        assert_eq!(result.compression, "blosc_zstd");
        assert_eq!(result.chunk_shape, (4, 4));

        let read = read_dataset(store, "tfa").expect("Failed to read");
        for (a, b) in read.values().iter().zip(dataset.values()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_array_dimensions_attribute() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = open_store(&temp_dir, "dims.zarr");

        let dataset = create_test_dataset(3, 4).with_variable("anomaly");
        ZarrWriter::new(WriterConfig::default())
            .write(store.clone(), &dataset)
            .expect("Failed to write");

        let array = Array::open(store, "/anomaly").expect("Failed to open");
        assert_eq!(array.shape(), &[3, 4]);
        assert_eq!(
            array.attributes()[ARRAY_DIMENSIONS],
            serde_json::json!(["lat", "lon"])
        );
    }

    #[test]
    fn test_missing_variable_is_storage_error() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = open_store(&temp_dir, "missing.zarr");

        ZarrWriter::new(WriterConfig::default())
            .write(store.clone(), &create_test_dataset(2, 2))
            .expect("Failed to write");

        assert!(matches!(
            read_dataset(store, "nope"),
            Err(GridProcessorError::Storage(_))
        ));
    }

    fn stage_attributes(proj_wkt: &str) -> StageAttributes {
        StageAttributes {
            description: "Synthetic survey".to_string(),
            dx: 500.0,
            dy: 250.0,
            rotation: 0.0,
            proj_wkt: proj_wkt.to_string(),
            source_proj_wkt: None,
            dropped_samples: 0,
        }
    }

    #[test]
    fn test_projected_stage_roundtrip() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = open_store(&temp_dir, "projected.zarr");

        let mut values: Vec<f64> = (0..12).map(|i| i as f64 - 3.5).collect();
        values[5] = f64::NAN;
        let header = GridHeader::new(3, 4, -269_500.0, 35_000.0, 500.0, 250.0);
        let grid = RasterGrid::new(header, values).unwrap();
        let attrs = stage_attributes("PROJCRS[\"unknown\"]");

        let result = ZarrWriter::new(WriterConfig::default())
            .write_projected(store.clone(), &grid, "tfa", &attrs, "m")
            .expect("Failed to write");
        assert_eq!(result.shape, (3, 4));

        let x = Array::open(store.clone(), "/x").expect("Failed to open");
        assert_eq!(x.attributes()[ARRAY_DIMENSIONS], serde_json::json!(["x"]));
        assert_eq!(x.attributes()["units"], serde_json::json!("m"));

        let (read, read_attrs) = read_projected(store, "tfa").expect("Failed to read");
        assert_eq!(read.header(), grid.header());
        assert_eq!(read.x_axis(), grid.x_axis());
        assert_eq!(read.y_axis(), grid.y_axis());
        for (a, b) in read.values().iter().zip(grid.values()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        assert_eq!(read_attrs, attrs);
    }

    #[test]
    fn test_reprojected_stage_roundtrip() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = open_store(&temp_dir, "reprojected.zarr");

        let mut cloud = PointCloud::with_capacity(6, (2, 3));
        cloud.push(-112.0, 33.0, 1.0, 0);
        cloud.push(-111.99, 33.0, f64::NAN, 1);
        cloud.push(-112.0, 33.01, 3.0, 3);
        cloud.push(-111.98, 33.01, 5.0, 5);
        let attrs = StageAttributes {
            source_proj_wkt: Some("PROJCRS[\"unknown\"]".to_string()),
            dropped_samples: 2,
            ..stage_attributes("GEOGCRS[\"WGS 84\"]")
        };

        ZarrWriter::new(WriterConfig::default())
            .write_reprojected(store.clone(), &cloud, "tfa", &attrs)
            .expect("Failed to write");

        let lat = Array::open(store.clone(), "/lat").expect("Failed to open");
        assert_eq!(lat.shape(), &[2, 3]);
        assert_eq!(lat.attributes()[ARRAY_DIMENSIONS], serde_json::json!(["y", "x"]));

        let (read, read_attrs) = read_reprojected(store, "tfa").expect("Failed to read");
        assert_eq!(read.source_shape, (2, 3));
        assert_eq!(read.source_index, vec![0, 1, 3, 5]);
        assert_eq!(read.lon, cloud.lon);
        assert_eq!(read.lat, cloud.lat);
        assert!(read.values[1].is_nan());
        assert_eq!(read.values[3], 5.0);
        assert_eq!(read_attrs, attrs);
    }

    #[test]
    fn test_unrepresentable_attributes_fail_write() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = open_store(&temp_dir, "nan_attrs.zarr");

        let dataset = create_test_dataset(2, 2);
        let mut attributes = dataset.attributes().clone();
        attributes.dy = f64::NAN;
        let broken = Dataset::assemble(dataset.grid().clone(), attributes);

        assert!(matches!(
            ZarrWriter::new(WriterConfig::default()).write(store, &broken),
            Err(GridProcessorError::Storage(_))
        ));
    }
}
