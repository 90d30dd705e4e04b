//! Georeferenced raster grids with explicit per-cell validity.
//!
//! A [`RasterGrid`] is a single-band 2-D array of `f32` samples at one
//! resolution. Cells may be unset ("no observation"); unset cells are stored
//! as NaN and never contribute to any aggregation. Grids are immutable once
//! constructed; coarser pyramid levels supersede rather than mutate them.

use crate::error::{LossError, LossResult};
use serde::{Deserialize, Serialize};

/// Coordinate reference identifier for a grid.
///
/// No coordinate transformation happens inside this crate; the identifier is
/// carried along so that co-registration can be checked, not computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrsId {
    /// WGS84 geographic (EPSG:4326).
    Epsg4326,
    /// Web Mercator (EPSG:3857).
    Epsg3857,
}

impl std::fmt::Display for CrsId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Epsg4326 => write!(f, "EPSG:4326"),
            Self::Epsg3857 => write!(f, "EPSG:3857"),
        }
    }
}

/// A single-band georeferenced grid of `f32` cell values.
///
/// Row-major storage, top-to-bottom. NaN marks an unset cell.
#[derive(Debug, Clone)]
pub struct RasterGrid {
    data: Vec<f32>,
    width: usize,
    height: usize,
    /// Ground distance covered by one cell, in meters.
    resolution_m: f64,
    crs: CrsId,
}

impl RasterGrid {
    /// Construct a grid from row-major samples.
    ///
    /// Returns `ZeroDimension` if either axis is empty and
    /// `DataLengthMismatch` if the buffer does not hold exactly
    /// `width * height` samples. Every grid in the pipeline passes through
    /// here, so downstream reduction and packing can rely on nonzero
    /// dimensions.
    pub fn from_data(
        data: Vec<f32>,
        width: usize,
        height: usize,
        resolution_m: f64,
        crs: CrsId,
    ) -> LossResult<Self> {
        if width == 0 || height == 0 {
            return Err(LossError::ZeroDimension { width, height });
        }
        if data.len() != width * height {
            return Err(LossError::DataLengthMismatch {
                len: data.len(),
                width,
                height,
            });
        }
        Ok(Self {
            data,
            width,
            height,
            resolution_m,
            crs,
        })
    }

    /// Construct a fully-unset grid of the given dimensions.
    pub fn unset(
        width: usize,
        height: usize,
        resolution_m: f64,
        crs: CrsId,
    ) -> LossResult<Self> {
        Self::from_data(vec![f32::NAN; width * height], width, height, resolution_m, crs)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Ground distance per cell in meters.
    pub fn resolution_m(&self) -> f64 {
        self.resolution_m
    }

    pub fn crs(&self) -> CrsId {
        self.crs
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw row-major samples, NaN for unset cells.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Value at (col, row), or `None` if out of bounds or unset.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let v = self.data[row * self.width + col];
        if v.is_nan() {
            None
        } else {
            Some(v)
        }
    }

    /// Whether the cell at (col, row) holds a value.
    pub fn is_set(&self, col: usize, row: usize) -> bool {
        self.get(col, row).is_some()
    }

    /// Iterate over all valid cells as (col, row, value).
    pub fn valid_cells(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.data.iter().enumerate().filter_map(move |(i, &v)| {
            if v.is_nan() {
                None
            } else {
                Some((i % self.width, i / self.width, v))
            }
        })
    }

    /// Number of valid cells.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    /// Check that another grid matches this one in dimensions and CRS.
    ///
    /// Returns `ShapeMismatch` or `CrsMismatch` so that callers combining two
    /// grids in one operation fail before touching any data.
    pub fn check_same_shape(&self, other: &RasterGrid) -> LossResult<()> {
        if self.width != other.width || self.height != other.height {
            return Err(LossError::ShapeMismatch {
                expected_width: self.width,
                expected_height: self.height,
                width: other.width,
                height: other.height,
            });
        }
        if self.crs != other.crs {
            return Err(LossError::CrsMismatch {
                left: self.crs.to_string(),
                right: other.crs.to_string(),
            });
        }
        Ok(())
    }
}
