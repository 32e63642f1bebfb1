// SPDX-License-Identifier: GPL-3.0-only

//! Pixel format conversion for still encoding
//!
//! The still encoder works in RGB24; these converters lift the sensor
//! formats it may receive. Used on the still path only, never in the
//! per-frame preview loop.

use crate::device::SensorFormat;
use crate::errors::{CameraError, CameraResult};

/// Convert packed YUYV (YUV 4:2:2) to RGB24.
///
/// YUYV format: Y0 U Y1 V - each 4-byte group encodes 2 pixels.
/// Uses BT.601 coefficients for YUV to RGB conversion.
pub fn yuyv_to_rgb24(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);

    for chunk in data.chunks_exact(4) {
        let y0 = chunk[0] as f32;
        let u = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v = chunk[3] as f32 - 128.0;

        for y in [y0, y1] {
            let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
            let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
            let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

            rgb.push(r);
            rgb.push(g);
            rgb.push(b);

            if rgb.len() >= pixel_count * 3 {
                break;
            }
        }
        if rgb.len() >= pixel_count * 3 {
            break;
        }
    }

    rgb
}

/// Convert little-endian RGB565 to RGB24.
///
/// Each 16-bit pixel packs 5 bits red, 6 bits green, 5 bits blue. The
/// channels are expanded by bit replication so full-scale values map to 255.
pub fn rgb565_to_rgb24(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);

    for chunk in data.chunks_exact(2).take(pixel_count) {
        let v = u16::from_le_bytes([chunk[0], chunk[1]]);
        let r5 = ((v >> 11) & 0x1F) as u8;
        let g6 = ((v >> 5) & 0x3F) as u8;
        let b5 = (v & 0x1F) as u8;

        rgb.push((r5 << 3) | (r5 >> 2));
        rgb.push((g6 << 2) | (g6 >> 4));
        rgb.push((b5 << 3) | (b5 >> 2));
    }

    rgb
}

/// Convert a frame in any supported sensor format to RGB24
pub fn to_rgb24(format: SensorFormat, data: &[u8], width: u32, height: u32) -> CameraResult<Vec<u8>> {
    let needed = width as usize * height as usize * format.bytes_per_pixel();
    if data.len() < needed {
        return Err(CameraError::Configuration(format!(
            "frame buffer too small: {} bytes, need {}",
            data.len(),
            needed
        )));
    }

    Ok(match format {
        SensorFormat::Rgb24 => data[..needed].to_vec(),
        SensorFormat::Rgb565 => rgb565_to_rgb24(data, width, height),
        SensorFormat::Yuyv => yuyv_to_rgb24(data, width, height),
    })
}
