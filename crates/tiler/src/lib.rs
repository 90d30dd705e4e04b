//! Quantization, PNG encoding, and tile export for finished pyramid levels.
//!
//! A level's four float bands are packed into one RGBA byte raster
//! (R = year offset, G = quantity, B = secondary quantity, A = uncertainty),
//! sliced into fixed-size tiles, encoded as PNG, and handed to a
//! [`TileSink`] keyed by `(threshold, z, x, y)`.

pub mod error;
pub mod export;
pub mod png;
pub mod quantize;
pub mod sink;

pub use error::{TilerError, TilerResult};
pub use export::{ExportReport, TileExporter};
pub use png::encode_rgba_png;
pub use quantize::{pack, ClampStats, PackedRaster};
pub use sink::{ObjectStoreSink, TileSink};
