//! Level-by-level pyramid construction.
//!
//! The builder walks the configured zoom table from the native (finest)
//! level to the coarsest, handing each finished level to a consumer callback
//! before folding it into the next. Each coarser level is derived from its
//! immediate predecessor only: Sum and Mean are associative across
//! successive groupings, and the dominant-year rule is correct under folding
//! precisely because every step re-derives its weights from the quantities
//! aggregated in the step before it. At most two levels' rasters are alive
//! at any moment.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::ZoomConfig;
use crate::error::{PyramidError, Result};
use crate::reduce::{BlockReducer, Reducer};
use loss_common::RasterGrid;
use tracing::{debug, info};

/// The four co-registered bands describing one zoom level.
#[derive(Debug, Clone)]
pub struct LevelBands {
    /// Year of the dominant loss event per cell.
    pub year: RasterGrid,
    /// Carbon-loss quantity per cell.
    pub quantity: RasterGrid,
    /// Secondary quantity (biomass loss) per cell.
    pub secondary: RasterGrid,
    /// Uncertainty per cell.
    pub uncertainty: RasterGrid,
}

impl LevelBands {
    /// Construct a band set, verifying all bands share one shape and CRS.
    pub fn new(
        year: RasterGrid,
        quantity: RasterGrid,
        secondary: RasterGrid,
        uncertainty: RasterGrid,
    ) -> Result<Self> {
        year.check_same_shape(&quantity)?;
        year.check_same_shape(&secondary)?;
        year.check_same_shape(&uncertainty)?;
        Ok(Self {
            year,
            quantity,
            secondary,
            uncertainty,
        })
    }

    pub fn width(&self) -> usize {
        self.year.width()
    }

    pub fn height(&self) -> usize {
        self.year.height()
    }
}

/// One finished pyramid level.
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    /// Zoom index from the configured table.
    pub zoom: u32,
    /// Configured ground resolution for this level, meters per cell.
    pub resolution_m: f64,
    pub bands: LevelBands,
}

/// Drives block reduction across the ordered zoom-level sequence.
pub struct PyramidBuilder {
    config: ZoomConfig,
    reducer: BlockReducer,
    cancel: Option<Arc<AtomicBool>>,
}

impl PyramidBuilder {
    pub fn new(config: ZoomConfig) -> Self {
        let reducer = BlockReducer::new(config.max_block_cells);
        Self {
            config,
            reducer,
            cancel: None,
        }
    }

    /// Attach a cancellation flag, checked between levels and between bands
    /// within a level.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Build every configured level from `native`, handing each finished
    /// level to `consume` in finest-to-coarsest order.
    ///
    /// The native level is emitted as-is; every later level folds forward
    /// from its immediate predecessor. The consumer owns nothing beyond the
    /// borrow it is given, so the build never retains more than the current
    /// level and the one being derived from it.
    pub fn build<F>(&self, native: LevelBands, mut consume: F) -> Result<()>
    where
        F: FnMut(&PyramidLevel) -> Result<()>,
    {
        self.config.validate()?;

        let native_level = self.config.native();
        info!(
            zoom = native_level.zoom,
            width = native.width(),
            height = native.height(),
            levels = self.config.num_levels(),
            "building pyramid"
        );

        let mut current = PyramidLevel {
            zoom: native_level.zoom,
            resolution_m: native_level.resolution_m,
            bands: native,
        };
        consume(&current)?;

        for target in &self.config.levels[1..] {
            self.check_cancelled()?;

            let factor = block_factor(current.resolution_m, target.resolution_m)?;
            debug!(
                from_zoom = current.zoom,
                to_zoom = target.zoom,
                factor,
                "reducing level"
            );

            let bands = self.reduce_level(&current.bands, factor)?;
            current = PyramidLevel {
                zoom: target.zoom,
                resolution_m: target.resolution_m,
                bands,
            };
            consume(&current)?;
        }

        info!("pyramid build complete");
        Ok(())
    }

    /// Apply one z+1 -> z transition to a band set.
    ///
    /// Quantity and secondary sum, uncertainty averages, and the year band
    /// follows the dominant contributor weighted by the input level's
    /// already-aggregated quantity.
    fn reduce_level(&self, bands: &LevelBands, factor: usize) -> Result<LevelBands> {
        let quantity = self.reducer.reduce(&bands.quantity, factor, Reducer::Sum)?;
        self.check_cancelled()?;

        let secondary = self.reducer.reduce(&bands.secondary, factor, Reducer::Sum)?;
        self.check_cancelled()?;

        let uncertainty = self
            .reducer
            .reduce(&bands.uncertainty, factor, Reducer::Mean)?;
        self.check_cancelled()?;

        let year = self.reducer.reduce(
            &bands.year,
            factor,
            Reducer::DominantByWeight {
                weights: &bands.quantity,
            },
        )?;

        LevelBands::new(year, quantity, secondary, uncertainty)
    }

    fn check_cancelled(&self) -> Result<()> {
        if let Some(cancel) = &self.cancel {
            if cancel.load(Ordering::Relaxed) {
                return Err(PyramidError::Cancelled);
            }
        }
        Ok(())
    }
}

/// Derive the integer block factor for a resolution step.
///
/// The ratio must be integral to within a small tolerance; anything else
/// means the zoom table does not describe block-aligned levels.
fn block_factor(finer_resolution_m: f64, coarser_resolution_m: f64) -> Result<usize> {
    let ratio = coarser_resolution_m / finer_resolution_m;
    let factor = ratio.round();

    if factor < 2.0 || (ratio - factor).abs() > 0.01 {
        return Err(PyramidError::config(format!(
            "resolution step {}m -> {}m is not an integer block factor",
            finer_resolution_m, coarser_resolution_m
        )));
    }

    Ok(factor as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZoomLevel;
    use loss_common::CrsId;

    fn grid(data: Vec<f32>, width: usize, height: usize) -> RasterGrid {
        RasterGrid::from_data(data, width, height, 30.0, CrsId::Epsg4326).unwrap()
    }

    fn two_step_config() -> ZoomConfig {
        ZoomConfig {
            levels: vec![
                ZoomLevel { zoom: 2, resolution_m: 30.0 },
                ZoomLevel { zoom: 1, resolution_m: 60.0 },
                ZoomLevel { zoom: 0, resolution_m: 120.0 },
            ],
            max_block_cells: 256,
            canopy_threshold: 30,
        }
    }

    fn native_4x4() -> LevelBands {
        let n = f32::NAN;
        let quantity = grid(
            vec![
                10.0, 0.0, 0.0, 0.0, //
                0.0, 50.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 5.0,
            ],
            4,
            4,
        );
        let year = grid(
            vec![
                1.0, n, n, n, //
                n, 7.0, n, n, //
                n, n, n, n, //
                n, n, n, 3.0,
            ],
            4,
            4,
        );
        let secondary = grid(vec![1.0; 16], 4, 4);
        let uncertainty = grid(vec![4.0; 16], 4, 4);
        LevelBands::new(year, quantity, secondary, uncertainty).unwrap()
    }

    #[test]
    fn test_band_shape_validation() {
        let year = grid(vec![1.0; 16], 4, 4);
        let quantity = grid(vec![1.0; 9], 3, 3);
        let secondary = grid(vec![1.0; 16], 4, 4);
        let uncertainty = grid(vec![1.0; 16], 4, 4);

        assert!(LevelBands::new(year, quantity, secondary, uncertainty).is_err());
    }

    #[test]
    fn test_block_factor_derivation() {
        assert_eq!(block_factor(30.0, 60.0).unwrap(), 2);
        assert_eq!(block_factor(30.0, 480.0).unwrap(), 16);
        assert!(block_factor(30.0, 75.0).is_err());
        assert!(block_factor(30.0, 30.0).is_err());
    }

    #[test]
    fn test_build_emits_all_levels_finest_first() {
        let builder = PyramidBuilder::new(two_step_config());
        let mut seen = Vec::new();

        builder
            .build(native_4x4(), |level| {
                seen.push((level.zoom, level.bands.width(), level.bands.height()));
                Ok(())
            })
            .unwrap();

        assert_eq!(seen, vec![(2, 4, 4), (1, 2, 2), (0, 1, 1)]);
    }

    #[test]
    fn test_folded_sum_matches_direct_total() {
        let builder = PyramidBuilder::new(two_step_config());
        let mut coarsest_quantity = None;

        builder
            .build(native_4x4(), |level| {
                if level.zoom == 0 {
                    coarsest_quantity = level.bands.quantity.get(0, 0);
                }
                Ok(())
            })
            .unwrap();

        // Two 2x steps must preserve the native total: associativity of Sum.
        assert_eq!(coarsest_quantity, Some(65.0));
    }

    #[test]
    fn test_dominant_year_survives_folding() {
        let builder = PyramidBuilder::new(two_step_config());
        let mut coarsest_year = None;

        builder
            .build(native_4x4(), |level| {
                if level.zoom == 0 {
                    coarsest_year = level.bands.year.get(0, 0);
                }
                Ok(())
            })
            .unwrap();

        // The quantity-50 event dominates every aggregate it joins.
        assert_eq!(coarsest_year, Some(7.0));
    }

    #[test]
    fn test_uncertainty_uses_mean() {
        let builder = PyramidBuilder::new(two_step_config());
        let mut coarsest = None;

        builder
            .build(native_4x4(), |level| {
                if level.zoom == 0 {
                    coarsest = level.bands.uncertainty.get(0, 0);
                }
                Ok(())
            })
            .unwrap();

        assert_eq!(coarsest, Some(4.0));
    }

    #[test]
    fn test_cancellation_stops_build() {
        let cancel = Arc::new(AtomicBool::new(false));
        let builder = PyramidBuilder::new(two_step_config()).with_cancel(cancel.clone());

        let mut emitted = 0;
        let result = builder.build(native_4x4(), |_level| {
            emitted += 1;
            // Request cancellation after the native level is consumed.
            cancel.store(true, Ordering::Relaxed);
            Ok(())
        });

        assert!(matches!(result, Err(PyramidError::Cancelled)));
        assert_eq!(emitted, 1);
    }

    #[test]
    fn test_consumer_error_propagates() {
        let builder = PyramidBuilder::new(two_step_config());
        let result = builder.build(native_4x4(), |_level| {
            Err(PyramidError::config("consumer failed"))
        });
        assert!(matches!(result, Err(PyramidError::Config(_))));
    }
}
