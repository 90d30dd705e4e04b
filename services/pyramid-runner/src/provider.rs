//! Loading native-resolution band files from disk.
//!
//! Bands arrive as raw little-endian `f32` rasters, one file per band,
//! already co-registered and masked to the run's canopy threshold upstream.
//! NaN samples mark unset cells.

use anyhow::{bail, Context, Result};
use loss_common::{CrsId, RasterGrid};
use pyramid::LevelBands;
use std::path::Path;
use tracing::info;

/// Load the four native bands from `dir`.
pub fn load_bands(
    dir: &Path,
    width: usize,
    height: usize,
    resolution_m: f64,
) -> Result<LevelBands> {
    let load = |name: &str| -> Result<RasterGrid> {
        let path = dir.join(name);
        let data = read_band(&path, width, height)
            .with_context(|| format!("loading band {}", path.display()))?;
        Ok(RasterGrid::from_data(
            data,
            width,
            height,
            resolution_m,
            CrsId::Epsg4326,
        )?)
    };

    let year = load("year.f32")?;
    let quantity = load("quantity.f32")?;
    let secondary = load("secondary.f32")?;
    let uncertainty = load("uncertainty.f32")?;

    info!(
        width,
        height,
        valid_loss_cells = quantity.valid_count(),
        "loaded native bands"
    );

    Ok(LevelBands::new(year, quantity, secondary, uncertainty)?)
}

/// Read one raw little-endian f32 band file.
fn read_band(path: &Path, width: usize, height: usize) -> Result<Vec<f32>> {
    let bytes = std::fs::read(path)?;
    let expected = width * height * 4;
    if bytes.len() != expected {
        bail!(
            "band file holds {} bytes, expected {} for {}x{}",
            bytes.len(),
            expected,
            width,
            height
        );
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_band(dir: &Path, name: &str, values: &[f32]) {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        std::fs::write(dir.join(name), bytes).unwrap();
    }

    #[test]
    fn test_load_bands_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        write_band(dir.path(), "year.f32", &[1.0, f32::NAN, 3.0, 4.0]);
        write_band(dir.path(), "quantity.f32", &[10.0, f32::NAN, 30.0, 40.0]);
        write_band(dir.path(), "secondary.f32", &[5.0, f32::NAN, 15.0, 20.0]);
        write_band(dir.path(), "uncertainty.f32", &[1.0, f32::NAN, 1.0, 1.0]);

        let bands = load_bands(dir.path(), 2, 2, 30.0).unwrap();
        assert_eq!(bands.quantity.get(0, 0), Some(10.0));
        assert_eq!(bands.quantity.get(1, 0), None);
        assert_eq!(bands.year.get(1, 1), Some(4.0));
    }

    #[test]
    fn test_zero_width_bands_rejected() {
        // A zero-byte file matches the declared 0x2 extent, but degenerate
        // grids must still fail instead of reaching reduction.
        let dir = tempfile::tempdir().unwrap();
        for name in ["year.f32", "quantity.f32", "secondary.f32", "uncertainty.f32"] {
            write_band(dir.path(), name, &[]);
        }

        assert!(load_bands(dir.path(), 0, 2, 30.0).is_err());
    }

    #[test]
    fn test_wrong_length_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_band(dir.path(), "year.f32", &[1.0, 2.0, 3.0]);

        assert!(load_bands(dir.path(), 2, 2, 30.0).is_err());
    }
}
