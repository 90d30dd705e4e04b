//! Error types for tile packing and export.

use thiserror::Error;

/// Result type alias using TilerError.
pub type TilerResult<T> = Result<T, TilerError>;

/// Errors raised while packing, encoding, or persisting tiles.
#[derive(Debug, Error)]
pub enum TilerError {
    /// Bands handed to the packer disagree in dimensions or CRS.
    #[error(transparent)]
    Grid(#[from] loss_common::LossError),

    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    Encode(String),

    /// The persistence collaborator rejected a tile.
    #[error("failed to store tile {key}: {message}")]
    Storage { key: String, message: String },

    /// Malformed exporter configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
