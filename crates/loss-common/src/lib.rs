//! Common types shared across the forest-loss tile pipeline.

pub mod error;
pub mod raster;
pub mod tile;

pub use error::{LossError, LossResult};
pub use raster::{CrsId, RasterGrid};
pub use tile::{TileCoord, TileKey};
