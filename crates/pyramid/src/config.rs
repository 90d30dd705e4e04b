//! Run configuration: zoom-level table and quantization scaling.

use crate::error::{PyramidError, Result};
use serde::{Deserialize, Serialize};

/// One zoom level: an index and its ground resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomLevel {
    /// Zoom index. Higher means finer; the largest index is native.
    pub zoom: u32,
    /// Ground distance per cell in meters at this level.
    pub resolution_m: f64,
}

/// Ordered zoom-level table plus the reduction ceiling and canopy threshold
/// in force for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoomConfig {
    /// Levels ordered finest (native) to coarsest (overview).
    pub levels: Vec<ZoomLevel>,

    /// Maximum number of source cells that may merge into one destination
    /// cell in a single reduction step.
    pub max_block_cells: usize,

    /// Canopy-cover threshold (percent) the source rasters were masked to.
    /// Carried into tile keys; the masking itself happens upstream.
    pub canopy_threshold: u8,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        // Native 30m Landsat-class cells, halving resolution per level down
        // to a coarse overview.
        let levels = (0..=6)
            .rev()
            .map(|zoom| ZoomLevel {
                zoom,
                resolution_m: 30.0 * f64::from(2u32.pow(6 - zoom)),
            })
            .collect();

        Self {
            levels,
            max_block_cells: 65536,
            canopy_threshold: 30,
        }
    }
}

impl ZoomConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PYRAMID_MAX_BLOCK_CELLS") {
            if let Ok(cells) = val.parse() {
                config.max_block_cells = cells;
            }
        }

        if let Ok(val) = std::env::var("CANOPY_THRESHOLD") {
            if let Ok(threshold) = val.parse() {
                config.canopy_threshold = threshold;
            }
        }

        if let Ok(val) = std::env::var("PYRAMID_LEVELS") {
            if let Ok(levels) = serde_json::from_str(&val) {
                config.levels = levels;
            }
        }

        config
    }

    /// Validate the zoom table.
    ///
    /// Resolutions must be strictly increasing as zoom decreases, zoom
    /// indices strictly decreasing, and the table must hold at least the
    /// native level. Surfaced before any reduction begins.
    pub fn validate(&self) -> Result<()> {
        if self.levels.is_empty() {
            return Err(PyramidError::config("zoom level table is empty"));
        }

        if self.max_block_cells == 0 {
            return Err(PyramidError::config("max_block_cells must be > 0"));
        }

        for pair in self.levels.windows(2) {
            let (finer, coarser) = (&pair[0], &pair[1]);
            if coarser.zoom >= finer.zoom {
                return Err(PyramidError::config(format!(
                    "zoom indices must strictly decrease: {} then {}",
                    finer.zoom, coarser.zoom
                )));
            }
            if coarser.resolution_m <= finer.resolution_m {
                return Err(PyramidError::config(format!(
                    "resolutions must strictly increase toward coarse levels: \
                     zoom {} at {}m then zoom {} at {}m",
                    finer.zoom, finer.resolution_m, coarser.zoom, coarser.resolution_m
                )));
            }
        }

        Ok(())
    }

    /// The native (finest) level.
    pub fn native(&self) -> &ZoomLevel {
        &self.levels[0]
    }

    /// Number of configured levels including native.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Output dimensions at each level for a native grid of the given size.
    ///
    /// Useful for sizing estimates before a build.
    pub fn level_dimensions(&self, width: usize, height: usize) -> Vec<(u32, usize, usize)> {
        let native_res = self.native().resolution_m;
        self.levels
            .iter()
            .map(|level| {
                let factor = (level.resolution_m / native_res).round() as usize;
                let factor = factor.max(1);
                (
                    level.zoom,
                    (width + factor - 1) / factor,
                    (height + factor - 1) / factor,
                )
            })
            .collect()
    }
}

/// Per-band quantization maxima and the year-offset reference.
///
/// The domain maxima are deliberately external configuration: the right
/// ceilings depend on the dataset vintage and are still being calibrated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingConfig {
    /// Quantity (carbon-loss) value that maps to intensity 255.
    pub quantity_max: f32,

    /// Secondary quantity (biomass) value that maps to intensity 255.
    pub secondary_max: f32,

    /// Uncertainty value that maps to intensity 255.
    pub uncertainty_max: f32,

    /// Calendar year corresponding to year-offset 0. Offsets 1-15 encode the
    /// years following it.
    pub reference_year: u16,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            quantity_max: 900.0,
            secondary_max: 400.0,
            uncertainty_max: 100.0,
            reference_year: 2000,
        }
    }
}

impl ScalingConfig {
    /// Load scaling configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SCALE_QUANTITY_MAX") {
            if let Ok(max) = val.parse() {
                config.quantity_max = max;
            }
        }

        if let Ok(val) = std::env::var("SCALE_SECONDARY_MAX") {
            if let Ok(max) = val.parse() {
                config.secondary_max = max;
            }
        }

        if let Ok(val) = std::env::var("SCALE_UNCERTAINTY_MAX") {
            if let Ok(max) = val.parse() {
                config.uncertainty_max = max;
            }
        }

        if let Ok(val) = std::env::var("SCALE_REFERENCE_YEAR") {
            if let Ok(year) = val.parse() {
                config.reference_year = year;
            }
        }

        config
    }

    /// Validate the scaling maxima.
    pub fn validate(&self) -> Result<()> {
        if self.quantity_max <= 0.0 {
            return Err(PyramidError::config("quantity_max must be > 0"));
        }
        if self.secondary_max <= 0.0 {
            return Err(PyramidError::config("secondary_max must be > 0"));
        }
        if self.uncertainty_max <= 0.0 {
            return Err(PyramidError::config("uncertainty_max must be > 0"));
        }
        Ok(())
    }
}
