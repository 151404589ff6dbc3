//! GXF parser for gridded geophysical surveys.
//!
//! This crate reads the Grid eXchange Format (GXF) ASCII grids distributed
//! with USGS aeromagnetic surveys into a [`RasterGrid`].
//!
//! # File Structure
//!
//! A GXF file is a sequence of keyword blocks (`#POINTS`, `#ROWS`,
//! `#XORIGIN`, ...) followed by a `#GRID` line. Everything after `#GRID` is
//! whitespace-delimited numbers filling the raster row by row, with no
//! relation between text lines and grid rows.
//!
//! # Usage
//!
//! ```
//! use gxf_parser::{parse_gxf, GridHeader};
//!
//! let text = "#TITLE\nsample\n#GRID\n1 2 3\n4 5 -1e32\n";
//! let header = GridHeader::new(2, 3, 0.0, 0.0, 500.0, 500.0);
//! let grid = parse_gxf(text.as_bytes(), &header).unwrap();
//!
//! assert_eq!(grid.get(1, 0), Some(4.0));
//! assert!(grid.get(1, 2).unwrap().is_nan());
//! ```

mod error;
mod grid;
mod header;
mod tokenizer;

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use tracing::{debug, info};

pub use error::{GxfError, GxfResult};
pub use grid::RasterGrid;
pub use header::{GridHeader, GxfHeader, HeaderKeyword, DEFAULT_NULL_VALUE};
pub use tokenizer::GridTokenizer;

/// Token that opens the data section.
pub const GRID_MARKER: &str = "#GRID";

/// Parse a GXF stream using an explicitly supplied header.
///
/// Header keywords in the stream are skipped; `header` alone defines the grid
/// geometry and null sentinel.
pub fn parse_gxf<R: BufRead>(reader: R, header: &GridHeader) -> GxfResult<RasterGrid> {
    let (_, grid) = read_gxf(reader, Some(header))?;
    Ok(grid)
}

/// Parse a GXF stream, taking the grid geometry from its header keywords.
pub fn parse_gxf_auto<R: BufRead>(reader: R) -> GxfResult<(GxfHeader, RasterGrid)> {
    read_gxf(reader, None)
}

/// Read only the keyword blocks preceding `#GRID`.
pub fn read_header<R: BufRead>(reader: R) -> GxfResult<GxfHeader> {
    let mut lines = reader.lines();
    let mut line_no = 0;
    scan_header(&mut lines, &mut line_no)
}

/// Open and parse a GXF file from disk.
///
/// When `header` is `None` the geometry is read from the file's keywords.
pub fn open_gxf<P: AsRef<Path>>(
    path: P,
    header: Option<&GridHeader>,
) -> GxfResult<(GxfHeader, RasterGrid)> {
    let path = path.as_ref();
    info!(path = %path.display(), "Reading GXF grid");
    let file = File::open(path)?;
    read_gxf(BufReader::new(file), header)
}

fn read_gxf<R: BufRead>(
    reader: R,
    header: Option<&GridHeader>,
) -> GxfResult<(GxfHeader, RasterGrid)> {
    let mut lines = reader.lines();
    let mut line_no = 0;

    let keywords = scan_header(&mut lines, &mut line_no)?;
    let grid_header = match header {
        Some(header) => header.clone(),
        None => keywords.to_grid_header()?,
    };
    grid_header.validate()?;

    debug!(
        rows = grid_header.rows,
        cols = grid_header.cols,
        data_start = line_no + 1,
        "Found GXF data section"
    );

    let mut tokenizer = GridTokenizer::new(grid_header.len(), grid_header.null_value);
    for line in lines {
        line_no += 1;
        tokenizer.feed_line(&line?, line_no)?;
    }
    let values = tokenizer.finish()?;

    let grid = RasterGrid::new(grid_header, values)?;
    debug!(
        samples = grid.len(),
        valid = grid.valid_count(),
        "Parsed GXF grid"
    );
    Ok((keywords, grid))
}

/// Consume header lines up to and including the `#GRID` marker.
fn scan_header<R: BufRead>(lines: &mut Lines<R>, line_no: &mut usize) -> GxfResult<GxfHeader> {
    let mut header = GxfHeader::default();

    for line in lines.by_ref() {
        let line = line?;
        *line_no += 1;

        let trimmed = line.trim();
        if trimmed.split_whitespace().any(|token| token == GRID_MARKER) {
            return Ok(header);
        }

        if trimmed.starts_with('#') {
            let name = trimmed.split_whitespace().next().unwrap_or(trimmed);
            header.begin(name, *line_no);
        } else if !trimmed.is_empty() {
            header.push_value(trimmed);
        }
    }

    Err(GxfError::MissingGridMarker {
        marker: GRID_MARKER,
        lines_read: *line_no,
    })
}
