//! Slicing a packed level into fixed-size tiles and exporting them.
//!
//! Tiles are encoded in parallel with rayon, then written through the sink
//! with bounded concurrency. A failed write is recorded against its key and
//! never aborts the rest of the level: the pyramid is deterministic, so any
//! failed tile can be retried later without rebuilding.

use crate::error::{TilerError, TilerResult};
use crate::png::encode_rgba_png;
use crate::quantize::PackedRaster;
use crate::sink::TileSink;
use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use loss_common::{tile::tile_count, TileCoord, TileKey};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{info, warn};

/// Maximum tile writes in flight per level.
const WRITE_CONCURRENCY: usize = 8;

/// Outcome of exporting one level.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Tiles written successfully.
    pub written: usize,
    /// Tiles the sink rejected, with enough context for targeted retry.
    pub failed: Vec<(TileKey, String)>,
}

/// Slices packed levels into tiles and hands them to a [`TileSink`].
pub struct TileExporter {
    sink: Arc<dyn TileSink>,
    tile_size: usize,
}

impl TileExporter {
    pub fn new(sink: Arc<dyn TileSink>, tile_size: usize) -> TilerResult<Self> {
        if tile_size == 0 {
            return Err(TilerError::Config("tile_size must be > 0".to_string()));
        }
        Ok(Self { sink, tile_size })
    }

    /// Export every tile of one packed level.
    ///
    /// Edge tiles are padded with transparent pixels to the full tile size.
    pub async fn export_level(
        &self,
        threshold: u8,
        zoom: u32,
        packed: &PackedRaster,
    ) -> TilerResult<ExportReport> {
        let cols = tile_count(packed.width, self.tile_size);
        let rows = tile_count(packed.height, self.tile_size);

        let coords: Vec<(u32, u32)> = (0..rows as u32)
            .flat_map(|ty| (0..cols as u32).map(move |tx| (tx, ty)))
            .collect();

        // CPU-bound part first: slice and encode all tiles in parallel.
        let encoded: Vec<(TileKey, Vec<u8>)> = coords
            .par_iter()
            .map(|&(tx, ty)| {
                let pixels = self.slice_tile(packed, tx, ty);
                let png = encode_rgba_png(&pixels, self.tile_size, self.tile_size)?;
                let key = TileKey::new(threshold, TileCoord::new(zoom, tx, ty));
                Ok((key, png))
            })
            .collect::<TilerResult<Vec<_>>>()?;

        // Then the I/O, with bounded concurrency and per-tile failure capture.
        let mut report = ExportReport::default();
        let mut in_flight = FuturesUnordered::new();
        let mut pending = encoded.into_iter();

        loop {
            while in_flight.len() < WRITE_CONCURRENCY {
                match pending.next() {
                    Some((key, png)) => in_flight.push(async move {
                        let result = self.sink.put_tile(&key, Bytes::from(png)).await;
                        (key, result)
                    }),
                    None => break,
                }
            }

            match in_flight.next().await {
                Some((_, Ok(()))) => report.written += 1,
                Some((key, Err(e))) => {
                    warn!(key = %key, error = %e, "tile write failed");
                    report.failed.push((key, e.to_string()));
                }
                None => break,
            }
        }

        info!(
            zoom,
            threshold,
            written = report.written,
            failed = report.failed.len(),
            "level export finished"
        );
        Ok(report)
    }

    /// Extract one tile's RGBA pixels, padding past-edge cells transparent.
    fn slice_tile(&self, packed: &PackedRaster, tx: u32, ty: u32) -> Vec<u8> {
        let size = self.tile_size;
        let mut pixels = vec![0u8; size * size * 4];

        let col0 = tx as usize * size;
        let row0 = ty as usize * size;
        let copy_cols = size.min(packed.width.saturating_sub(col0));
        let copy_rows = size.min(packed.height.saturating_sub(row0));

        for row in 0..copy_rows {
            let src_start = ((row0 + row) * packed.width + col0) * 4;
            let dst_start = row * size * 4;
            pixels[dst_start..dst_start + copy_cols * 4]
                .copy_from_slice(&packed.pixels[src_start..src_start + copy_cols * 4]);
        }

        pixels
    }
}
