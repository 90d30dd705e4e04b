//! Tile coordinates and storage keys for exported pyramid tiles.

use serde::{Deserialize, Serialize};

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level.
    pub z: u32,
    /// Column (x).
    pub x: u32,
    /// Row (y).
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Storage key for a persisted tile: canopy threshold plus tile coordinate.
///
/// Tiles for different canopy thresholds live side by side, so the threshold
/// is part of the key, not ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileKey {
    /// Canopy-cover threshold (percent) the run was masked to.
    pub threshold: u8,
    pub coord: TileCoord,
}

impl TileKey {
    pub fn new(threshold: u8, coord: TileCoord) -> Self {
        Self { threshold, coord }
    }

    /// Storage path following the `<threshold>_<z>/<x>/<y>` convention.
    pub fn storage_path(&self) -> String {
        format!(
            "{}_{}/{}/{}.png",
            self.threshold, self.coord.z, self.coord.x, self.coord.y
        )
    }
}

impl std::fmt::Display for TileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.threshold, self.coord)
    }
}

/// Number of tiles needed to cover `extent` cells at `tile_size` cells per
/// tile, counting a trailing partial tile.
pub fn tile_count(extent: usize, tile_size: usize) -> usize {
    (extent + tile_size - 1) / tile_size
}
