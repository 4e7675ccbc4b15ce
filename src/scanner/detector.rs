// SPDX-License-Identifier: GPL-3.0-only

//! QR code detection
//!
//! This module implements QR code recognition using the rqrr crate.
//! Frames are reduced to a luma plane, optionally downscaled, and searched
//! for QR grids. Each grid becomes a [`MetadataObject`] with its bounds in
//! normalized frame coordinates and, when decoding succeeds, its payload.

use crate::backends::camera::CameraFrame;
use crate::constants::detector::DEFAULT_MAX_DIMENSION;
use crate::scanner::metadata::{FrameRegion, MetadataObject, Symbology};
use tracing::{debug, trace};

/// Recognizer used by the metadata output stage
pub trait CodeDetector: Send {
    /// Symbologies this detector can report
    fn supported_types(&self) -> &[Symbology];

    /// Recognize codes in a frame, in detection order
    fn detect(&self, frame: &CameraFrame) -> Vec<MetadataObject>;
}

/// QR code detector
///
/// Optimized for real-time processing with frame downscaling.
#[derive(Debug, Clone)]
pub struct QrDetector {
    /// Maximum dimension for processing (frames are downscaled to this)
    max_dimension: u32,
}

impl Default for QrDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDetector {
    /// Create a new QR detector with default settings
    pub fn new() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    /// Create a QR detector with custom max dimension
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }
}

impl CodeDetector for QrDetector {
    fn supported_types(&self) -> &[Symbology] {
        &[Symbology::Qr]
    }

    fn detect(&self, frame: &CameraFrame) -> Vec<MetadataObject> {
        detect_sync(frame, self.max_dimension)
    }
}

fn detect_sync(frame: &CameraFrame, max_dimension: u32) -> Vec<MetadataObject> {
    let start = std::time::Instant::now();

    let width = frame.width;
    let height = frame.height;
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let (luma, proc_width, proc_height, scale) = if width > max_dimension
        || height > max_dimension
    {
        let scale = (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32);
        let new_width = ((width as f32 / scale) as u32).max(1);
        let new_height = ((height as f32 / scale) as u32).max(1);
        (
            downscale_luma(frame, new_width, new_height),
            new_width,
            new_height,
            scale,
        )
    } else {
        (luma_plane(frame), width, height, 1.0)
    };

    trace!(
        proc_width,
        proc_height,
        scale,
        conversion_ms = start.elapsed().as_millis(),
        "Prepared luma plane"
    );

    let row = proc_width as usize;
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(proc_width as usize, proc_height as usize, |x, y| {
            luma[y * row + x]
        });
    let grids = prepared.detect_grids();

    let mut objects = Vec::with_capacity(grids.len());
    for grid in grids {
        // Corners are in processed pixels; scale back to the source frame
        let corners: Vec<(f32, f32)> = grid
            .bounds
            .iter()
            .map(|p| (p.x as f32 * scale, p.y as f32 * scale))
            .collect();
        let bounds = FrameRegion::from_corners(&corners, width, height);

        let value = match grid.decode() {
            Ok((_meta, content)) => Some(content),
            Err(e) => {
                debug!(error = %e, "Failed to decode QR code");
                None
            }
        };

        debug!(
            value = ?value,
            x = bounds.x,
            y = bounds.y,
            width = bounds.width,
            height = bounds.height,
            "Detected QR code"
        );

        objects.push(MetadataObject {
            symbology: Symbology::Qr,
            value,
            bounds,
        });
    }

    if !objects.is_empty() {
        debug!(
            count = objects.len(),
            total_ms = start.elapsed().as_millis(),
            "QR detection found codes"
        );
    }

    objects
}

/// Extract a tightly packed luma plane, dropping stride padding
fn luma_plane(frame: &CameraFrame) -> Vec<u8> {
    let mut result = Vec::with_capacity((frame.width * frame.height) as usize);
    for y in 0..frame.height {
        for x in 0..frame.width {
            result.push(frame.luma_at(x, y));
        }
    }
    result
}

/// Downscale to a luma plane using bilinear interpolation
fn downscale_luma(frame: &CameraFrame, dst_width: u32, dst_height: u32) -> Vec<u8> {
    let src_width = frame.width;
    let src_height = frame.height;

    let mut result = Vec::with_capacity((dst_width * dst_height) as usize);

    let x_ratio = src_width as f32 / dst_width as f32;
    let y_ratio = src_height as f32 / dst_height as f32;

    for y in 0..dst_height {
        for x in 0..dst_width {
            let src_x = x as f32 * x_ratio;
            let src_y = y as f32 * y_ratio;

            let x0 = src_x as u32;
            let y0 = src_y as u32;
            let x1 = (x0 + 1).min(src_width - 1);
            let y1 = (y0 + 1).min(src_height - 1);

            let x_frac = src_x - x0 as f32;
            let y_frac = src_y - y0 as f32;

            let p00 = frame.luma_at(x0, y0) as f32;
            let p01 = frame.luma_at(x1, y0) as f32;
            let p10 = frame.luma_at(x0, y1) as f32;
            let p11 = frame.luma_at(x1, y1) as f32;

            let value = p00 * (1.0 - x_frac) * (1.0 - y_frac)
                + p01 * x_frac * (1.0 - y_frac)
                + p10 * (1.0 - x_frac) * y_frac
                + p11 * x_frac * y_frac;

            result.push(value as u8);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::PixelFormat;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_luma_plane_without_stride() {
        // 2x2 RGBA frame with extra stride padding
        let data: Vec<u8> = vec![
            255, 255, 255, 255, // White pixel
            0, 0, 0, 255,       // Black pixel
            0, 0,               // stride padding
            0, 0, 0, 255,       // Black pixel
            255, 255, 255, 255, // White pixel
            0, 0,               // stride padding
        ];

        let frame = CameraFrame {
            width: 2,
            height: 2,
            data: Arc::from(data.as_slice()),
            format: PixelFormat::RGBA,
            stride: 10,
            captured_at: Instant::now(),
        };

        assert_eq!(luma_plane(&frame), vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_downscale_luma() {
        // 4x2 gray gradient
        let data: Vec<u8> = vec![
            0, 85, 170, 255, // Row 0
            0, 85, 170, 255, // Row 1
        ];
        let frame = CameraFrame::packed(4, 2, PixelFormat::Gray8, data);

        let result = downscale_luma(&frame, 2, 1);
        assert_eq!(result.len(), 2);

        // First pixel samples around (0,0), second around (2,0)
        assert!(result[0] < 100);
        assert!(result[1] > 150);
    }

    #[test]
    fn test_blank_frame_has_no_codes() {
        let frame = CameraFrame::packed(64, 48, PixelFormat::Gray8, vec![255; 64 * 48]);
        assert!(QrDetector::new().detect(&frame).is_empty());
    }

    #[test]
    fn test_empty_frame_has_no_codes() {
        let frame = CameraFrame::packed(0, 0, PixelFormat::RGBA, Vec::new());
        assert!(QrDetector::new().detect(&frame).is_empty());
    }

    #[test]
    fn test_supports_only_qr() {
        assert_eq!(QrDetector::default().supported_types(), &[Symbology::Qr]);
    }
}
