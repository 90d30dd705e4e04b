//! Multi-Resolution Pyramid Aggregation for Forest-Loss Rasters
//!
//! This crate turns co-registered native-resolution rasters (year of loss,
//! carbon-loss quantity, biomass, uncertainty) into a sequence of coarser
//! zoom levels ready for quantization and tile export. It provides:
//!
//! - **Block reduction**: fixed-footprint groups of source cells collapse
//!   into one destination cell under Sum, Mean, or DominantByWeight
//! - **Dominant-year selection**: an aggregated cell's year is the year of
//!   the contributing cell carrying the most loss, not a mode or a maximum
//! - **Level-by-level folding**: each coarser level is derived from the
//!   immediately finer one, never recomputed from native data
//!
//! # Architecture
//!
//! ```text
//! native bands (year, quantity, secondary, uncertainty)
//!      │
//!      ▼
//! PyramidBuilder::build ──► emits native level as-is
//!      │
//!      ├─► BlockReducer: Sum(quantity), Sum(secondary), Mean(uncertainty)
//!      │
//!      ├─► BlockReducer: DominantByWeight(year, weights = input quantity)
//!      │
//!      └─► emits coarser level, which becomes the next step's input
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pyramid::{PyramidBuilder, ZoomConfig};
//!
//! let config = ZoomConfig::from_env()?;
//! config.validate()?;
//!
//! let builder = PyramidBuilder::new(config);
//! builder.build(native_bands, |level| {
//!     // quantize and export this level's bands
//!     Ok(())
//! })?;
//! ```

pub mod builder;
pub mod config;
pub mod dominant;
pub mod error;
pub mod reduce;
pub mod testdata;

pub use builder::{LevelBands, PyramidBuilder, PyramidLevel};
pub use config::{ScalingConfig, ZoomConfig, ZoomLevel};
pub use dominant::{dominant_year, WeightedCell};
pub use error::{PyramidError, Result};
pub use reduce::{BlockReducer, Reducer};
