//! Zarr V3 persistence for regridded datasets and pipeline stages.

mod zarr_writer;

pub use zarr_writer::{
    read_dataset, read_projected, read_reprojected, ZarrWriteResult, ZarrWriter,
};
