//! Error types for pyramid aggregation.

use thiserror::Error;

/// Result type alias for pyramid operations.
pub type Result<T> = std::result::Result<T, PyramidError>;

/// Errors that can occur while building a pyramid.
#[derive(Debug, Error)]
pub enum PyramidError {
    /// Bands at one level disagree in dimensions or CRS. Fatal for that level.
    #[error(transparent)]
    Grid(#[from] loss_common::LossError),

    /// Zoom-level table or scaling maxima are malformed. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// A requested block factor would merge more source cells than the
    /// configured ceiling allows; the caller must pre-reduce in smaller steps.
    #[error(
        "block factor {block_factor} yields a {cells}-cell footprint, exceeding the ceiling of {max_cells}"
    )]
    FootprintExceeded {
        block_factor: usize,
        cells: usize,
        max_cells: usize,
    },

    /// The build was cancelled between work units.
    #[error("pyramid build cancelled")]
    Cancelled,
}

impl PyramidError {
    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
