//! Block reduction: collapse fixed-size groups of source cells into one
//! destination cell.
//!
//! Grouping is a fixed function of destination index and block factor, so
//! identical inputs always reduce to identical outputs. Groups at the right
//! and bottom grid edges may be partial; a partial group still reduces over
//! whatever valid cells it contains. Independent destination rows share no
//! state, so reduction is parallelized across rows with rayon.

use crate::dominant::{dominant_year, WeightedCell};
use crate::error::{PyramidError, Result};
use loss_common::RasterGrid;
use rayon::prelude::*;

/// Per-band reduction rule applied to each group of source cells.
///
/// `DominantByWeight` needs a second grid supplying the weight of every
/// source cell; a cell contributes to the selection only when both its value
/// and its weight are set.
#[derive(Debug, Clone, Copy)]
pub enum Reducer<'a> {
    /// Destination value = sum of valid source values; unset if none.
    Sum,
    /// Destination value = arithmetic mean of valid source values; unset if none.
    Mean,
    /// Destination value = source value at the maximum-weight cell; unset if
    /// no valid (value, weight) pair exists. Ties go to the lowest value.
    DominantByWeight { weights: &'a RasterGrid },
}

/// Reduces a grid by an integer block factor along both axes.
///
/// The footprint ceiling bounds how many source cells may merge into one
/// destination cell in a single step; callers needing a larger overall ratio
/// must reduce in multiple steps.
#[derive(Debug, Clone)]
pub struct BlockReducer {
    max_block_cells: usize,
}

impl BlockReducer {
    pub fn new(max_block_cells: usize) -> Self {
        Self { max_block_cells }
    }

    /// Reduce `source` by `block_factor`, producing a grid of
    /// `ceil(width / factor) x ceil(height / factor)` cells.
    ///
    /// The destination grid's resolution is the source resolution times the
    /// block factor.
    pub fn reduce(
        &self,
        source: &RasterGrid,
        block_factor: usize,
        reducer: Reducer<'_>,
    ) -> Result<RasterGrid> {
        if block_factor == 0 {
            return Err(PyramidError::config("block factor must be >= 1"));
        }

        let cells = block_factor * block_factor;
        if cells > self.max_block_cells {
            return Err(PyramidError::FootprintExceeded {
                block_factor,
                cells,
                max_cells: self.max_block_cells,
            });
        }

        if let Reducer::DominantByWeight { weights } = reducer {
            source.check_same_shape(weights)?;
        }

        let width = source.width();
        let height = source.height();
        let dest_width = (width + block_factor - 1) / block_factor;
        let dest_height = (height + block_factor - 1) / block_factor;

        let mut output = vec![f32::NAN; dest_width * dest_height];

        output
            .par_chunks_mut(dest_width)
            .enumerate()
            .for_each(|(dest_row, row_out)| {
                let row_start = dest_row * block_factor;
                let row_end = (row_start + block_factor).min(height);

                for (dest_col, out) in row_out.iter_mut().enumerate() {
                    let col_start = dest_col * block_factor;
                    let col_end = (col_start + block_factor).min(width);

                    *out = reduce_group(
                        source,
                        &reducer,
                        col_start..col_end,
                        row_start..row_end,
                    );
                }
            });

        Ok(RasterGrid::from_data(
            output,
            dest_width,
            dest_height,
            source.resolution_m() * block_factor as f64,
            source.crs(),
        )?)
    }
}

/// Reduce one rectangular group of source cells to a single value.
///
/// Returns NaN (unset) when the group holds no valid contributors.
fn reduce_group(
    source: &RasterGrid,
    reducer: &Reducer<'_>,
    cols: std::ops::Range<usize>,
    rows: std::ops::Range<usize>,
) -> f32 {
    match reducer {
        Reducer::Sum => {
            let mut sum = 0.0f32;
            let mut any = false;
            for row in rows {
                for col in cols.clone() {
                    if let Some(v) = source.get(col, row) {
                        sum += v;
                        any = true;
                    }
                }
            }
            if any {
                sum
            } else {
                f32::NAN
            }
        }
        Reducer::Mean => {
            let mut sum = 0.0f32;
            let mut count = 0usize;
            for row in rows {
                for col in cols.clone() {
                    if let Some(v) = source.get(col, row) {
                        sum += v;
                        count += 1;
                    }
                }
            }
            if count == 0 {
                f32::NAN
            } else {
                sum / count as f32
            }
        }
        Reducer::DominantByWeight { weights } => {
            let pairs = rows.flat_map(|row| {
                let cols = cols.clone();
                cols.filter_map(move |col| {
                    match (source.get(col, row), weights.get(col, row)) {
                        (Some(year), Some(weight)) => Some(WeightedCell::new(year, weight)),
                        _ => None,
                    }
                })
            });
            dominant_year(pairs).unwrap_or(f32::NAN)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loss_common::{CrsId, LossError};

    fn grid(data: Vec<f32>, width: usize, height: usize) -> RasterGrid {
        RasterGrid::from_data(data, width, height, 30.0, CrsId::Epsg4326).unwrap()
    }

    #[test]
    fn test_sum_over_valid_members_only() {
        let source = grid(vec![1.0, f32::NAN, 3.0, 4.0], 2, 2);
        let reducer = BlockReducer::new(256);

        let out = reducer.reduce(&source, 2, Reducer::Sum).unwrap();
        assert_eq!(out.width(), 1);
        assert_eq!(out.height(), 1);
        assert_eq!(out.get(0, 0), Some(8.0));
    }

    #[test]
    fn test_all_unset_group_stays_unset() {
        let source = grid(vec![f32::NAN; 4], 2, 2);
        let reducer = BlockReducer::new(256);

        let out = reducer.reduce(&source, 2, Reducer::Sum).unwrap();
        assert_eq!(out.get(0, 0), None);

        let out = reducer.reduce(&source, 2, Reducer::Mean).unwrap();
        assert_eq!(out.get(0, 0), None);
    }

    #[test]
    fn test_mean_ignores_unset() {
        let source = grid(vec![1.0, f32::NAN, 3.0, 4.0], 2, 2);
        let reducer = BlockReducer::new(256);

        let out = reducer.reduce(&source, 2, Reducer::Mean).unwrap();
        let mean = out.get(0, 0).unwrap();
        assert!((mean - 8.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_edge_groups() {
        // 3x3 reduced by 2: four groups, three of them partial.
        let source = grid((1..=9).map(|v| v as f32).collect(), 3, 3);
        let reducer = BlockReducer::new(256);

        let out = reducer.reduce(&source, 2, Reducer::Sum).unwrap();
        assert_eq!(out.width(), 2);
        assert_eq!(out.height(), 2);
        // [1 2; 4 5] = 12, [3; 6] = 9, [7 8] = 15, [9] = 9
        assert_eq!(out.get(0, 0), Some(12.0));
        assert_eq!(out.get(1, 0), Some(9.0));
        assert_eq!(out.get(0, 1), Some(15.0));
        assert_eq!(out.get(1, 1), Some(9.0));
    }

    #[test]
    fn test_dominant_by_weight_picks_heaviest_cell() {
        let years = grid(vec![1.0, 7.0, f32::NAN, 3.0], 2, 2);
        let weights = grid(vec![10.0, 50.0, f32::NAN, 5.0], 2, 2);
        let reducer = BlockReducer::new(256);

        let out = reducer
            .reduce(&years, 2, Reducer::DominantByWeight { weights: &weights })
            .unwrap();
        assert_eq!(out.get(0, 0), Some(7.0));
    }

    #[test]
    fn test_dominant_requires_matching_weight_shape() {
        let years = grid(vec![1.0; 4], 2, 2);
        let weights = grid(vec![1.0; 6], 3, 2);
        let reducer = BlockReducer::new(256);

        let result = reducer.reduce(&years, 2, Reducer::DominantByWeight { weights: &weights });
        assert!(matches!(
            result,
            Err(PyramidError::Grid(LossError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn test_dominant_skips_cells_missing_either_side() {
        // Year set but weight unset, and weight set but year unset: neither
        // is a valid pair, so only (3.0, 5.0) remains.
        let years = grid(vec![9.0, f32::NAN, 3.0, f32::NAN], 2, 2);
        let weights = grid(vec![f32::NAN, 80.0, 5.0, f32::NAN], 2, 2);
        let reducer = BlockReducer::new(256);

        let out = reducer
            .reduce(&years, 2, Reducer::DominantByWeight { weights: &weights })
            .unwrap();
        assert_eq!(out.get(0, 0), Some(3.0));
    }

    #[test]
    fn test_footprint_ceiling_enforced() {
        let source = grid(vec![1.0; 64], 8, 8);
        let reducer = BlockReducer::new(4);

        assert!(reducer.reduce(&source, 2, Reducer::Sum).is_ok());
        assert!(matches!(
            reducer.reduce(&source, 4, Reducer::Sum),
            Err(PyramidError::FootprintExceeded { .. })
        ));
    }

    #[test]
    fn test_zero_width_source_cannot_be_built() {
        // Reduction chunks output by destination row width, so sources with
        // an empty axis are rejected at grid construction.
        assert!(RasterGrid::from_data(vec![], 0, 8, 30.0, CrsId::Epsg4326).is_err());
    }

    #[test]
    fn test_reduction_is_deterministic() {
        let data: Vec<f32> = (0..64).map(|v| (v * 7 % 13) as f32).collect();
        let source = grid(data, 8, 8);
        let reducer = BlockReducer::new(256);

        let a = reducer.reduce(&source, 4, Reducer::Sum).unwrap();
        let b = reducer.reduce(&source, 4, Reducer::Sum).unwrap();
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn test_spec_end_to_end_block() {
        // 4x4 block: quantity sums to 65, dominant year follows the
        // quantity-50 cell.
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
        let n = f32::NAN;
        let years = grid(
            vec![
                1.0, n, n, n, //
                n, 7.0, n, n, //
                n, n, n, n, //
                n, n, n, 3.0,
            ],
            4,
            4,
        );
        let reducer = BlockReducer::new(256);

        let total = reducer.reduce(&quantity, 4, Reducer::Sum).unwrap();
        assert_eq!(total.get(0, 0), Some(65.0));

        let year = reducer
            .reduce(&years, 4, Reducer::DominantByWeight { weights: &quantity })
            .unwrap();
        assert_eq!(year.get(0, 0), Some(7.0));
    }
}
