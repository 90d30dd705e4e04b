//! Error types shared by the forest-loss pipeline crates.

use thiserror::Error;

/// Result type alias using LossError.
pub type LossResult<T> = Result<T, LossError>;

/// Errors raised by the shared data model.
#[derive(Debug, Error)]
pub enum LossError {
    /// Two grids combined in one operation disagree in dimensions.
    #[error("grid shape mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    ShapeMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },

    /// Backing buffer length does not match the declared dimensions.
    #[error("grid data length {len} does not match {width}x{height}")]
    DataLengthMismatch {
        len: usize,
        width: usize,
        height: usize,
    },

    /// A grid was declared with a zero-cell axis.
    #[error("grid dimensions must be nonzero, got {width}x{height}")]
    ZeroDimension { width: usize, height: usize },

    /// Grids combined in one operation have different coordinate references.
    #[error("coordinate reference mismatch: {left} vs {right}")]
    CrsMismatch { left: String, right: String },
}
