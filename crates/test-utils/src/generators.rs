//! Test data generators for synthetic survey grids.
//!
//! These generators create predictable, verifiable value fields and the GXF
//! text that carries them, so parser and pipeline tests can check every
//! sample against a closed-form expectation.

/// Creates a linear value field `row_coef * row + col_coef * col`.
///
/// # Returns
///
/// A `Vec<f64>` in row-major order (row 0 first, then row 1, etc.)
///
/// # Example
///
/// ```
/// use test_utils::linear_field;
///
/// let field = linear_field(4, 3, 2.0, 3.0);
/// assert_eq!(field.len(), 12);
/// assert_eq!(field[0], 0.0);  // row 0, col 0
/// assert_eq!(field[1], 3.0);  // row 0, col 1
/// assert_eq!(field[3], 2.0);  // row 1, col 0
/// ```
pub fn linear_field(rows: usize, cols: usize, row_coef: f64, col_coef: f64) -> Vec<f64> {
    let mut data = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            data.push(row_coef * row as f64 + col_coef * col as f64);
        }
    }
    data
}

/// Creates a field resembling a magnetic anomaly: a dipole-like bump over a
/// regional gradient, in nanotesla.
///
/// Values are smooth and bounded (roughly -300..600), which keeps
/// interpolation tolerances meaningful.
pub fn create_anomaly_grid(rows: usize, cols: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(rows * cols);
    let cy = rows as f64 * 0.45;
    let cx = cols as f64 * 0.55;
    let scale = (rows.max(cols) as f64 / 6.0).max(1.0);

    for row in 0..rows {
        for col in 0..cols {
            let dy = (row as f64 - cy) / scale;
            let dx = (col as f64 - cx) / scale;
            let r2 = dx * dx + dy * dy;
            let dipole = 500.0 * (-r2).exp() - 250.0 * (-(r2 + 2.0 * dy + 1.0)).exp();
            let regional = 0.5 * row as f64 - 0.25 * col as f64;
            data.push(dipole + regional);
        }
    }
    data
}

/// Lays out `values` as text lines whose token counts cycle through
/// `pattern`.
///
/// A pattern such as `[5, 2, 7]` deliberately misaligns text lines with grid
/// rows. Zero entries produce blank lines.
///
/// # Example
///
/// ```
/// use test_utils::wrap_tokens;
///
/// let text = wrap_tokens(&[1.0, 2.0, 3.0], &[2]);
/// assert_eq!(text, "1 2\n3\n");
/// ```
pub fn wrap_tokens(values: &[f64], pattern: &[usize]) -> String {
    assert!(
        pattern.iter().any(|&n| n > 0),
        "pattern must contain a non-zero line length"
    );

    let mut out = String::new();
    let mut index = 0;
    let mut step = 0;

    while index < values.len() {
        let take = pattern[step % pattern.len()];
        step += 1;

        let end = (index + take).min(values.len());
        let line: Vec<String> = values[index..end].iter().map(format_token).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
        index = end;
    }
    out
}

/// Format a value the way GXF writers do; NaN is written as the USGS null
/// sentinel.
fn format_token(value: &f64) -> String {
    if value.is_nan() {
        "-1e32".to_string()
    } else {
        format!("{}", value)
    }
}

/// Geometry used to build a synthetic GXF document.
#[derive(Debug, Clone, Copy)]
pub struct GxfGeometry {
    pub rows: usize,
    pub cols: usize,
    pub x_origin: f64,
    pub y_origin: f64,
    pub dx: f64,
    pub dy: f64,
}

impl GxfGeometry {
    /// Unit-spaced grid at the origin.
    pub fn unit(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            x_origin: 0.0,
            y_origin: 0.0,
            dx: 1.0,
            dy: 1.0,
        }
    }
}

/// Builds a complete GXF document: title and geometry keywords, the `#GRID`
/// marker, then the data wrapped according to `pattern`.
///
/// NaN values are written as `-1e32` and declared with `#DUMMY`.
pub fn gxf_document(title: &str, geometry: GxfGeometry, values: &[f64], pattern: &[usize]) -> String {
    let mut out = String::new();
    let keywords = [
        ("#TITLE", format!("\"{}\"", title)),
        ("#POINTS", geometry.cols.to_string()),
        ("#ROWS", geometry.rows.to_string()),
        ("#PTSEPARATION", geometry.dx.to_string()),
        ("#RWSEPARATION", geometry.dy.to_string()),
        ("#XORIGIN", geometry.x_origin.to_string()),
        ("#YORIGIN", geometry.y_origin.to_string()),
        ("#ROTATION", "0".to_string()),
        ("#SENSE", "1".to_string()),
        ("#DUMMY", "-1e32".to_string()),
    ];

    for (name, value) in keywords {
        out.push_str(name);
        out.push('\n');
        out.push_str(&value);
        out.push_str("\n\n");
    }
    out.push_str("#GRID\n");
    out.push_str(&wrap_tokens(values, pattern));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_field_values() {
        let field = linear_field(4, 3, 2.0, 3.0);
        for row in 0..4 {
            for col in 0..3 {
                assert_eq!(field[row * 3 + col], (2 * row + 3 * col) as f64);
            }
        }
    }

    #[test]
    fn test_wrap_tokens_cycles_pattern() {
        let values: Vec<f64> = (0..6).map(|v| v as f64).collect();
        let text = wrap_tokens(&values, &[4, 0, 1]);
        assert_eq!(text, "0 1 2 3\n\n4\n5\n");
    }

    #[test]
    fn test_wrap_tokens_writes_null_sentinel() {
        let text = wrap_tokens(&[1.5, f64::NAN], &[2]);
        assert_eq!(text, "1.5 -1e32\n");
    }

    #[test]
    fn test_anomaly_grid_is_finite() {
        let grid = create_anomaly_grid(20, 30);
        assert_eq!(grid.len(), 600);
        assert!(grid.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_gxf_document_layout() {
        let doc = gxf_document("t", GxfGeometry::unit(1, 2), &[1.0, 2.0], &[1]);
        assert!(doc.contains("#POINTS\n2\n"));
        assert!(doc.contains("#ROWS\n1\n"));
        assert!(doc.ends_with("#GRID\n1\n2\n"));
    }
}
