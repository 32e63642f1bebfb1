// SPDX-License-Identifier: GPL-3.0-only

//! Still image encoding and storage
//!
//! Stills are written as uncompressed 24-bit BMP: a 14-byte file header,
//! a 40-byte BITMAPINFOHEADER, then bottom-up rows of BGR pixels padded to
//! 4-byte boundaries. Encoding happens fully in memory before any file is
//! created, so a failed capture never leaves a partial file behind.

use crate::constants::{
    BMP_BITS_PER_PIXEL, BMP_FILE_HEADER_SIZE, BMP_INFO_HEADER_SIZE, BMP_PIXEL_DATA_OFFSET,
};
use crate::convert;
use crate::device::SensorFormat;
use crate::errors::{CameraError, CameraResult};
use std::path::Path;
use tracing::info;

/// Fields read back from a BMP header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BmpHeader {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u16,
    pub image_size: u32,
}

/// Bytes per padded BMP row for a 24bpp image
fn padded_row_size(width: u32) -> usize {
    (width as usize * 3).div_ceil(4) * 4
}

/// Encode a frame as an uncompressed 24-bit BMP
pub fn encode_bmp(
    width: u32,
    height: u32,
    format: SensorFormat,
    data: &[u8],
) -> CameraResult<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(CameraError::Configuration(
            "still size must be non-zero".to_string(),
        ));
    }
    let rgb = convert::to_rgb24(format, data, width, height)?;

    let row_size = padded_row_size(width);
    let image_size = row_size * height as usize;
    let file_size = BMP_PIXEL_DATA_OFFSET as usize + image_size;

    let mut out = Vec::with_capacity(file_size);

    // File header
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(file_size as u32).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&BMP_PIXEL_DATA_OFFSET.to_le_bytes());

    // BITMAPINFOHEADER; positive height means bottom-up row order
    out.extend_from_slice(&(BMP_INFO_HEADER_SIZE as u32).to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(height as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&BMP_BITS_PER_PIXEL.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(image_size as u32).to_le_bytes());
    out.extend_from_slice(&2835u32.to_le_bytes());
    out.extend_from_slice(&2835u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());

    // Pixel rows, bottom-up, RGB swapped to BGR
    let src_row = width as usize * 3;
    for y in (0..height as usize).rev() {
        let row = &rgb[y * src_row..y * src_row + src_row];
        for pixel in row.chunks_exact(3) {
            out.push(pixel[2]);
            out.push(pixel[1]);
            out.push(pixel[0]);
        }
        out.resize(out.len() + (row_size - src_row), 0);
    }

    Ok(out)
}

/// Parse the headers of an encoded BMP
pub fn parse_bmp_header(data: &[u8]) -> CameraResult<BmpHeader> {
    if data.len() < BMP_FILE_HEADER_SIZE + BMP_INFO_HEADER_SIZE {
        return Err(CameraError::Configuration(
            "buffer too small for a BMP header".to_string(),
        ));
    }
    if &data[0..2] != b"BM" {
        return Err(CameraError::Configuration(
            "missing BM signature".to_string(),
        ));
    }

    let read_u32 = |offset: usize| u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]]);
    let read_u16 = |offset: usize| u16::from_le_bytes([data[offset], data[offset + 1]]);

    Ok(BmpHeader {
        width: read_u32(18),
        height: read_u32(22),
        bits_per_pixel: read_u16(28),
        image_size: read_u32(34),
    })
}

/// Encode and write a still to `path`. The file is only created once the
/// encoded image exists in memory.
pub fn write_still(
    path: &Path,
    width: u32,
    height: u32,
    format: SensorFormat,
    data: &[u8],
) -> CameraResult<()> {
    let encoded = encode_bmp(width, height, format, data)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &encoded)?;

    info!(
        path = %path.display(),
        width,
        height,
        bytes = encoded.len(),
        "Still image saved"
    );
    Ok(())
}
