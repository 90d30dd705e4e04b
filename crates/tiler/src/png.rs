//! PNG encoding for packed tile data.
//!
//! Tiles are always written as 8-bit RGBA (color type 6): the four channels
//! are data bands, not display colors, so indexed encoding would corrupt the
//! contract. Encoding is hand-rolled over `flate2` and `crc32fast` to keep
//! the dependency surface small.

use crate::error::{TilerError, TilerResult};
use std::io::Write;

/// PNG file signature.
const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Encode RGBA pixel data (4 bytes per pixel) as a PNG image.
pub fn encode_rgba_png(pixels: &[u8], width: usize, height: usize) -> TilerResult<Vec<u8>> {
    if pixels.len() != width * height * 4 {
        return Err(TilerError::Encode(format!(
            "pixel buffer holds {} bytes, expected {} for {}x{} RGBA",
            pixels.len(),
            width * height * 4,
            width,
            height
        )));
    }

    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);

    // IHDR
    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(6); // color type: RGBA
    ihdr.push(0); // compression method
    ihdr.push(0); // filter method
    ihdr.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr);

    // IDAT
    let idat = compress_scanlines(pixels, width, height)
        .map_err(|e| TilerError::Encode(format!("IDAT compression failed: {}", e)))?;
    write_chunk(&mut png, b"IDAT", &idat);

    // IEND
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Prefix each scanline with a filter byte (0 = none) and zlib-compress.
fn compress_scanlines(pixels: &[u8], width: usize, height: usize) -> std::io::Result<Vec<u8>> {
    let row_bytes = width * 4;
    let mut raw = Vec::with_capacity(height * (1 + row_bytes));

    for y in 0..height {
        raw.push(0); // filter type: none
        let start = y * row_bytes;
        raw.extend_from_slice(&pixels[start..start + row_bytes]);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&raw)?;
    encoder.finish()
}

/// Write one length-prefixed, CRC-suffixed PNG chunk.
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}
