//! Token packer for the GXF data section.
//!
//! GXF writers wrap rows at arbitrary widths, so a row of the grid can span
//! several text lines and a single text line can hold the tail of one row and
//! the head of the next. The tokenizer ignores line structure entirely: every
//! token lands at the next free slot of a rows x cols buffer, and only the
//! total count is checked.
//!
//! The buffer grows as tokens arrive. The declared size comes from the file
//! header and is not trusted for an up-front allocation.

use crate::error::{GxfError, GxfResult};

/// Values reserved before the first token is read.
const INITIAL_RESERVE: usize = 1 << 20;

/// Accumulates data tokens into a row-major buffer of fixed capacity.
#[derive(Debug)]
pub struct GridTokenizer {
    buffer: Vec<f64>,
    capacity: usize,
    null_bits: u64,
}

impl GridTokenizer {
    /// Create a tokenizer for `capacity` values.
    ///
    /// Tokens whose parsed bit pattern equals `null_value` are stored as NaN.
    pub fn new(capacity: usize, null_value: f64) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity.min(INITIAL_RESERVE)),
            capacity,
            null_bits: null_value.to_bits(),
        }
    }

    /// Number of values stored so far.
    pub fn fill(&self) -> usize {
        self.buffer.len()
    }

    /// Total number of values expected.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tokenize one line of text.
    pub fn feed_line(&mut self, line: &str, line_no: usize) -> GxfResult<()> {
        for token in line.split_whitespace() {
            let value: f64 = token.parse().map_err(|_| GxfError::InvalidToken {
                line: line_no,
                token: token.to_string(),
            })?;

            if self.buffer.len() == self.capacity {
                return Err(GxfError::TooManyValues {
                    line: line_no,
                    expected: self.capacity,
                });
            }

            self.buffer.push(if value.to_bits() == self.null_bits {
                f64::NAN
            } else {
                value
            });
        }
        Ok(())
    }

    /// Return the packed buffer, failing if it is not exactly full.
    pub fn finish(self) -> GxfResult<Vec<f64>> {
        if self.buffer.len() != self.capacity {
            return Err(GxfError::TooFewValues {
                expected: self.capacity,
                found: self.buffer.len(),
            });
        }
        Ok(self.buffer)
    }
}
