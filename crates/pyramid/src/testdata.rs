//! Synthetic loss rasters for tests and the runner's synthetic mode.
//!
//! The generators are deterministic arithmetic over cell indices, so tests
//! can assert exact aggregates and repeated runs produce identical tiles.

use crate::builder::LevelBands;
use crate::error::Result;
use loss_common::{CrsId, RasterGrid};

/// Fraction of cells carrying a loss event in the synthetic pattern.
const LOSS_CELL_PERIOD: usize = 7;

/// Create a quantity grid where cell (col, row) holds `col * 1000 + row`
/// when the cell index is a multiple of the loss period, and is unset
/// otherwise. The mixed pattern exercises partial groups and unset handling.
///
/// Panics if either dimension is zero; callers supply real grid sizes.
pub fn sparse_quantity_grid(width: usize, height: usize, resolution_m: f64) -> RasterGrid {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let idx = row * width + col;
            if idx % LOSS_CELL_PERIOD == 0 {
                data.push((col * 1000 + row) as f32);
            } else {
                data.push(f32::NAN);
            }
        }
    }
    // Length is width * height by construction.
    RasterGrid::from_data(data, width, height, resolution_m, CrsId::Epsg4326)
        .expect("synthetic grids use nonzero dimensions")
}

/// Create a year grid co-registered with [`sparse_quantity_grid`]: cells
/// carrying loss get a year offset in 1..=15 derived from their position.
///
/// Panics if either dimension is zero; callers supply real grid sizes.
pub fn sparse_year_grid(width: usize, height: usize, resolution_m: f64) -> RasterGrid {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let idx = row * width + col;
            if idx % LOSS_CELL_PERIOD == 0 {
                data.push((idx % 15 + 1) as f32);
            } else {
                data.push(f32::NAN);
            }
        }
    }
    RasterGrid::from_data(data, width, height, resolution_m, CrsId::Epsg4326)
        .expect("synthetic grids use nonzero dimensions")
}

/// Build a complete synthetic native band set.
///
/// Secondary quantity is half the primary, uncertainty is a flat 10 on loss
/// cells; both stay unset where the quantity band is unset.
pub fn synthetic_bands(width: usize, height: usize, resolution_m: f64) -> Result<LevelBands> {
    let quantity = sparse_quantity_grid(width, height, resolution_m);
    let year = sparse_year_grid(width, height, resolution_m);

    let secondary_data: Vec<f32> = quantity.data().iter().map(|v| v * 0.5).collect();
    let secondary = RasterGrid::from_data(
        secondary_data,
        width,
        height,
        resolution_m,
        CrsId::Epsg4326,
    )?;

    let uncertainty_data: Vec<f32> = quantity
        .data()
        .iter()
        .map(|v| if v.is_nan() { f32::NAN } else { 10.0 })
        .collect();
    let uncertainty = RasterGrid::from_data(
        uncertainty_data,
        width,
        height,
        resolution_m,
        CrsId::Epsg4326,
    )?;

    LevelBands::new(year, quantity, secondary, uncertainty)
}
