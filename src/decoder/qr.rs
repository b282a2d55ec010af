// SPDX-License-Identifier: GPL-3.0-only

//! QR code decoding engine
//!
//! Converts camera frames to grayscale and searches for QR codes using the
//! rqrr crate. Frames are downscaled to a processing cap first; codes are
//! typically large enough in the frame to survive that.

use super::DecodeEngine;
use crate::backends::camera::types::{CameraFrame, PixelFormat};
use crate::constants::DECODE_MAX_DIMENSION;

use image::GrayImage;
use tracing::{debug, trace};

/// rqrr-backed QR engine
pub struct QrEngine {
    /// Maximum dimension for processing (frames are downscaled to this)
    max_dimension: u32,
}

impl QrEngine {
    pub fn new() -> Self {
        Self {
            max_dimension: DECODE_MAX_DIMENSION,
        }
    }

    /// Engine with a custom processing cap
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self { max_dimension }
    }
}

impl Default for QrEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeEngine for QrEngine {
    fn name(&self) -> &'static str {
        "rqrr"
    }

    fn decode(&mut self, frame: &CameraFrame) -> Option<String> {
        let start = std::time::Instant::now();

        let gray = luma_image(frame, self.max_dimension)?;
        let conversion_time = start.elapsed();

        let mut prepared = rqrr::PreparedImage::prepare(gray);
        let grids = prepared.detect_grids();

        trace!(
            grids = grids.len(),
            conversion_ms = conversion_time.as_millis(),
            total_ms = start.elapsed().as_millis(),
            "QR detection pass complete"
        );

        for grid in grids {
            match grid.decode() {
                Ok((_meta, content)) => {
                    debug!(
                        content_len = content.len(),
                        total_ms = start.elapsed().as_millis(),
                        "Decoded QR code"
                    );
                    return Some(content);
                }
                Err(e) => {
                    debug!(error = %e, "Grid detected but failed to decode");
                }
            }
        }

        None
    }
}

/// Convert a frame to a grayscale image, downscaling to `max_dimension`
///
/// Sampling is nearest-neighbour and stride-aware; out-of-range reads
/// (truncated driver buffers) yield black pixels instead of panicking.
fn luma_image(frame: &CameraFrame, max_dimension: u32) -> Option<GrayImage> {
    if frame.width == 0 || frame.height == 0 {
        return None;
    }

    let (dst_width, dst_height, scale) = if frame.width > max_dimension
        || frame.height > max_dimension
    {
        let scale = (frame.width as f32 / max_dimension as f32)
            .max(frame.height as f32 / max_dimension as f32);
        (
            ((frame.width as f32 / scale) as u32).max(1),
            ((frame.height as f32 / scale) as u32).max(1),
            scale,
        )
    } else {
        (frame.width, frame.height, 1.0)
    };

    let mut luma = Vec::with_capacity((dst_width * dst_height) as usize);
    for dy in 0..dst_height {
        let sy = ((dy as f32 * scale) as u32).min(frame.height - 1);
        for dx in 0..dst_width {
            let sx = ((dx as f32 * scale) as u32).min(frame.width - 1);
            luma.push(sample_luma(frame, sx, sy));
        }
    }

    GrayImage::from_raw(dst_width, dst_height, luma)
}

/// Sample the luma value of one pixel
fn sample_luma(frame: &CameraFrame, x: u32, y: u32) -> u8 {
    let data = &frame.data;
    let row = (y * frame.stride) as usize;

    match frame.format {
        PixelFormat::Gray8 => data.get(row + x as usize).copied().unwrap_or(0),
        // YUYV packs Y0 U Y1 V, so every pixel's luma byte sits at x*2
        PixelFormat::Yuyv => data.get(row + (x as usize) * 2).copied().unwrap_or(0),
        PixelFormat::Rgb24 => rgb_luma(data, row + (x as usize) * 3),
        PixelFormat::Rgba => rgb_luma(data, row + (x as usize) * 4),
    }
}

/// BT.601 integer luma from an RGB triple at `idx`
fn rgb_luma(data: &[u8], idx: usize) -> u8 {
    let r = data.get(idx).copied().unwrap_or(0) as u32;
    let g = data.get(idx + 1).copied().unwrap_or(0) as u32;
    let b = data.get(idx + 2).copied().unwrap_or(0) as u32;
    ((77 * r + 150 * g + 29 * b) >> 8) as u8
}
