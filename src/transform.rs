// SPDX-License-Identifier: GPL-3.0-only

//! Zoom/crop transform
//!
//! Converts a full-resolution frame plus a zoom factor into a cropped,
//! rescaled preview frame. Nearest-neighbor resampling driven by 16.16
//! fixed-point step accumulators keeps floating point out of the per-pixel
//! loop for predictable latency. Pixels are treated as opaque `bpp`-byte
//! units, so the same code serves RGB565, RGB24 and packed YUV sources.

use crate::constants::{ZOOM_MAX_PERCENT, ZOOM_MIN_PERCENT};
use crate::errors::{CameraError, CameraResult};

/// Fixed-point fraction bits for the step accumulators
const FP_SHIFT: u32 = 16;

/// A crop rectangle in source-frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Compute the centered crop rectangle for a zoom factor.
///
/// The crop is `(src * 100 / zoom_percent)` on each axis; at 100 percent it
/// equals the full source frame. The zoom factor is clamped to the supported
/// range, so the result always lies within the source bounds.
pub fn crop_for_zoom(src_width: u32, src_height: u32, zoom_percent: u32) -> CropRect {
    let zoom = zoom_percent.clamp(ZOOM_MIN_PERCENT, ZOOM_MAX_PERCENT);
    let crop_width = (src_width * 100 / zoom).max(1).min(src_width);
    let crop_height = (src_height * 100 / zoom).max(1).min(src_height);
    CropRect {
        x: (src_width - crop_width) / 2,
        y: (src_height - crop_height) / 2,
        width: crop_width,
        height: crop_height,
    }
}

/// Crop and rescale `src` into `dst`.
///
/// `dst` is resized to `dst_width * dst_height * bpp` and completely
/// overwritten. Sampled source coordinates are clamped to `[0, dim - 1]`,
/// so no out-of-bounds read is possible regardless of rounding.
pub fn zoom_crop(
    src: &[u8],
    src_width: u32,
    src_height: u32,
    bpp: usize,
    zoom_percent: u32,
    dst: &mut Vec<u8>,
    dst_width: u32,
    dst_height: u32,
) -> CameraResult<()> {
    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 || bpp == 0 {
        return Err(CameraError::Configuration(
            "transform dimensions must be non-zero".to_string(),
        ));
    }
    let needed = src_width as usize * src_height as usize * bpp;
    if src.len() < needed {
        return Err(CameraError::Configuration(format!(
            "source buffer too small: {} bytes, need {}",
            src.len(),
            needed
        )));
    }

    let crop = crop_for_zoom(src_width, src_height, zoom_percent);
    let x_step = (u64::from(crop.width) << FP_SHIFT) / u64::from(dst_width);
    let y_step = (u64::from(crop.height) << FP_SHIFT) / u64::from(dst_height);

    dst.clear();
    dst.resize(dst_width as usize * dst_height as usize * bpp, 0);

    let src_row = src_width as usize * bpp;
    let dst_row = dst_width as usize * bpp;

    let mut y_acc: u64 = 0;
    for dy in 0..dst_height as usize {
        let sy = (u64::from(crop.y) + (y_acc >> FP_SHIFT)).min(u64::from(src_height - 1)) as usize;
        let src_base = sy * src_row;
        let dst_base = dy * dst_row;

        let mut x_acc: u64 = 0;
        for dx in 0..dst_width as usize {
            let sx =
                (u64::from(crop.x) + (x_acc >> FP_SHIFT)).min(u64::from(src_width - 1)) as usize;
            let s = src_base + sx * bpp;
            let d = dst_base + dx * bpp;
            dst[d..d + bpp].copy_from_slice(&src[s..s + bpp]);
            x_acc += x_step;
        }
        y_acc += y_step;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_crop_at_100_percent() {
        let crop = crop_for_zoom(640, 480, 100);
        assert_eq!(
            crop,
            CropRect {
                x: 0,
                y: 0,
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn test_centered_crop_at_200_percent() {
        let crop = crop_for_zoom(640, 480, 200);
        assert_eq!(
            crop,
            CropRect {
                x: 160,
                y: 120,
                width: 320,
                height: 240
            }
        );
    }

    #[test]
    fn test_crop_within_bounds_for_all_zoom_levels() {
        for zoom in 100..=400 {
            let crop = crop_for_zoom(640, 480, zoom);
            assert!(crop.width >= 1 && crop.height >= 1, "zoom {}", zoom);
            assert!(crop.x + crop.width <= 640, "zoom {}", zoom);
            assert!(crop.y + crop.height <= 480, "zoom {}", zoom);
        }
    }

    #[test]
    fn test_out_of_range_zoom_clamped() {
        assert_eq!(crop_for_zoom(640, 480, 50), crop_for_zoom(640, 480, 100));
        assert_eq!(crop_for_zoom(640, 480, 9999), crop_for_zoom(640, 480, 400));
    }

    #[test]
    fn test_output_dimensions() {
        let src = vec![0u8; 640 * 480 * 2];
        let mut dst = Vec::new();
        zoom_crop(&src, 640, 480, 2, 100, &mut dst, 360, 270).expect("transform");
        assert_eq!(dst.len(), 360 * 270 * 2);
    }

    #[test]
    fn test_identity_path_preserves_corner_pixels() {
        // 4x4 source, 1 byte per pixel, scaled to 4x4 at zoom 100: exact copy
        let src: Vec<u8> = (0..16).collect();
        let mut dst = Vec::new();
        zoom_crop(&src, 4, 4, 1, 100, &mut dst, 4, 4).expect("transform");
        assert_eq!(dst, src);
    }

    #[test]
    fn test_zoom_samples_from_center() {
        // 4x4 source at zoom 400 crops the center 1x1; every output pixel
        // samples that single source pixel.
        let mut src = vec![0u8; 16];
        src[1 * 4 + 1] = 0xAB; // crop origin at (1,1)
        let mut dst = Vec::new();
        zoom_crop(&src, 4, 4, 1, 400, &mut dst, 2, 2).expect("transform");
        assert_eq!(dst, vec![0xAB; 4]);
    }

    #[test]
    fn test_sampled_coordinates_never_exceed_source() {
        // Upscale a tiny frame to a large destination at max zoom. A panic
        // here would indicate an out-of-bounds sample.
        let src = vec![7u8; 3 * 3 * 2];
        let mut dst = Vec::new();
        zoom_crop(&src, 3, 3, 2, 400, &mut dst, 360, 270).expect("transform");
        assert!(dst.iter().all(|&b| b == 7));
    }

    #[test]
    fn test_undersized_source_rejected() {
        let src = vec![0u8; 10];
        let mut dst = Vec::new();
        let result = zoom_crop(&src, 640, 480, 2, 100, &mut dst, 360, 270);
        assert!(matches!(result, Err(CameraError::Configuration(_))));
    }
}
