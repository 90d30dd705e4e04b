//! Quantization of float bands into a packed 8-bit RGBA raster.
//!
//! Channel layout, fixed by the tile output contract:
//!
//! - **R**: year offset (0-15 from the reference year), truncated, never
//!   rescaled
//! - **G**: quantity (carbon loss), linearly rescaled against the configured
//!   maximum
//! - **B**: secondary quantity (biomass), rescaled the same way
//! - **A**: uncertainty, rescaled, floored at 1 for valid cells
//!
//! A cell is valid when its quantity band is set; unset cells pack to four
//! zero bytes, i.e. a wholly transparent pixel. Values above a configured
//! maximum clamp to 255 and are counted so that miscalibrated maxima show up
//! in logs instead of silently saturating.

use crate::error::TilerResult;
use pyramid::{LevelBands, ScalingConfig};
use rayon::prelude::*;

/// Highest encodable year offset.
const YEAR_OFFSET_MAX: f32 = 15.0;

/// A packed RGBA raster for one zoom level.
#[derive(Debug, Clone)]
pub struct PackedRaster {
    /// RGBA bytes, 4 per cell, row-major.
    pub pixels: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl PackedRaster {
    /// RGBA bytes of the cell at (col, row).
    pub fn pixel(&self, col: usize, row: usize) -> Option<[u8; 4]> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let i = (row * self.width + col) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }
}

/// Counts of values that exceeded a configured maximum and were clamped.
///
/// Reported after packing for calibration review; clamping itself is a local
/// recovery, not an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClampStats {
    pub quantity: u64,
    pub secondary: u64,
    pub uncertainty: u64,
}

impl ClampStats {
    pub fn total(&self) -> u64 {
        self.quantity + self.secondary + self.uncertainty
    }

    fn merge(self, other: ClampStats) -> ClampStats {
        ClampStats {
            quantity: self.quantity + other.quantity,
            secondary: self.secondary + other.secondary,
            uncertainty: self.uncertainty + other.uncertainty,
        }
    }
}

/// Pack a level's bands into one RGBA raster.
///
/// Fails with a shape error if the bands disagree in dimensions; per-value
/// overflow never fails, it clamps and counts.
pub fn pack(bands: &LevelBands, scaling: &ScalingConfig) -> TilerResult<(PackedRaster, ClampStats)> {
    bands.year.check_same_shape(&bands.quantity)?;
    bands.year.check_same_shape(&bands.secondary)?;
    bands.year.check_same_shape(&bands.uncertainty)?;

    let width = bands.width();
    let height = bands.height();
    let mut pixels = vec![0u8; width * height * 4];

    let stats = pixels
        .par_chunks_mut(width * 4)
        .enumerate()
        .map(|(row, row_pixels)| {
            let mut stats = ClampStats::default();

            for col in 0..width {
                // Quantity defines validity: no loss mass, no pixel.
                let Some(quantity) = bands.quantity.get(col, row) else {
                    continue;
                };

                let (g, clamped) = scale_to_byte(quantity, scaling.quantity_max);
                if clamped {
                    stats.quantity += 1;
                }

                let b = match bands.secondary.get(col, row) {
                    Some(v) => {
                        let (b, clamped) = scale_to_byte(v, scaling.secondary_max);
                        if clamped {
                            stats.secondary += 1;
                        }
                        b
                    }
                    None => 0,
                };

                let a = match bands.uncertainty.get(col, row) {
                    Some(v) => {
                        let (a, clamped) = scale_to_byte(v, scaling.uncertainty_max);
                        if clamped {
                            stats.uncertainty += 1;
                        }
                        // Valid cells must stay distinguishable from unset
                        // (alpha 0) ones.
                        a.max(1)
                    }
                    None => 1,
                };

                let r = year_offset_byte(bands.year.get(col, row));

                let i = col * 4;
                row_pixels[i] = r;
                row_pixels[i + 1] = g;
                row_pixels[i + 2] = b;
                row_pixels[i + 3] = a;
            }

            stats
        })
        .reduce(ClampStats::default, ClampStats::merge);

    Ok((
        PackedRaster {
            pixels,
            width,
            height,
        },
        stats,
    ))
}

/// Linearly rescale `v` from `[0, max]` into `[0, 255]`, truncating to an
/// integer. Returns the byte and whether the input exceeded `max`.
///
/// Inputs at or above `max` map to 255 and never wrap; negative inputs floor
/// at 0.
fn scale_to_byte(v: f32, max: f32) -> (u8, bool) {
    if v >= max {
        (255, v > max)
    } else if v <= 0.0 {
        (0, false)
    } else {
        ((v / max * 255.0) as u8, false)
    }
}

/// Truncate a year value to the 0-15 offset range. Unset years encode as 0.
fn year_offset_byte(year: Option<f32>) -> u8 {
    match year {
        Some(v) => v.clamp(0.0, YEAR_OFFSET_MAX) as u8,
        None => 0,
    }
}
