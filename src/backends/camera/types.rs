// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use std::sync::Arc;
use std::time::Instant;

/// Device information from V4L2 capability
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    /// Name of the device (V4L2 card)
    pub card: String,
    /// Driver name (V4L2 driver)
    pub driver: String,
    /// Bus the device is attached to (e.g., usb-0000:00:14.0-1)
    pub bus: String,
}

/// Represents a camera device
#[derive(Debug, Clone)]
pub struct CameraDevice {
    pub name: String,
    pub path: String, // Device node or source identifier
    pub device_info: Option<DeviceInfo>,
}

/// Pixel layouts a frame source can deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit RGBA, 4 bytes per pixel
    RGBA,
    /// 8-bit luma only
    Gray8,
    /// Packed 4:2:2, Y0 U Y1 V
    YUYV,
}

impl PixelFormat {
    /// Bytes used by one pixel in a packed row
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::RGBA => 4,
            PixelFormat::Gray8 => 1,
            PixelFormat::YUYV => 2,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelFormat::RGBA => write!(f, "RGBA"),
            PixelFormat::Gray8 => write!(f, "GREY"),
            PixelFormat::YUYV => write!(f, "YUYV"),
        }
    }
}

/// A single captured frame
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Bytes per row, including any padding
    pub stride: u32,
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap tightly packed pixel data
    pub fn packed(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width * format.bytes_per_pixel(),
            data: Arc::from(data.into_boxed_slice()),
            format,
            captured_at: Instant::now(),
        }
    }

    /// Luma value at (x, y), clamped to the frame
    pub fn luma_at(&self, x: u32, y: u32) -> u8 {
        match self.format {
            PixelFormat::Gray8 => self.rgb_at(x, y).0,
            PixelFormat::YUYV => {
                if self.width == 0 || self.height == 0 {
                    return 0;
                }
                let x = x.min(self.width - 1);
                let y = y.min(self.height - 1);
                let idx = (y * self.stride + x * 2) as usize;
                self.data.get(idx).copied().unwrap_or(0)
            }
            // BT.601 weights
            PixelFormat::RGBA => {
                let (r, g, b) = self.rgb_at(x, y);
                ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
            }
        }
    }

    /// RGB value at (x, y), clamped to the frame
    pub fn rgb_at(&self, x: u32, y: u32) -> (u8, u8, u8) {
        if self.width == 0 || self.height == 0 {
            return (0, 0, 0);
        }
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        let data = &self.data;

        match self.format {
            PixelFormat::RGBA => {
                let idx = (y * self.stride + x * 4) as usize;
                if idx + 2 < data.len() {
                    (data[idx], data[idx + 1], data[idx + 2])
                } else {
                    (0, 0, 0)
                }
            }
            PixelFormat::Gray8 => {
                let idx = (y * self.stride + x) as usize;
                match data.get(idx) {
                    Some(&v) => (v, v, v),
                    None => (0, 0, 0),
                }
            }
            PixelFormat::YUYV => {
                // Two pixels share chroma: Y0 U Y1 V
                let pair_x = (x & !1) as usize;
                let base = (y as usize) * (self.stride as usize) + pair_x * 2;
                if base + 3 >= data.len() {
                    return (0, 0, 0);
                }
                let luma = if x & 1 == 0 {
                    data[base]
                } else {
                    data[base + 2]
                };
                yuv_to_rgb(luma, data[base + 1], data[base + 3])
            }
        }
    }
}

/// Convert YUV (BT.601) to RGB
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Failed to initialize the capture device
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Format not supported
    FormatNotSupported(String),
    /// Device is already owned by another session
    Busy,
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::Busy => write!(f, "Camera is busy"),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_sampling_respects_stride() {
        // 2x2 RGBA frame with 2 bytes of padding per row
        let data: Vec<u8> = vec![
            255, 0, 0, 255, 0, 255, 0, 255, 0, 0, // row 0
            0, 0, 255, 255, 255, 255, 255, 255, 0, 0, // row 1
        ];
        let frame = CameraFrame {
            width: 2,
            height: 2,
            data: Arc::from(data.as_slice()),
            format: PixelFormat::RGBA,
            stride: 10,
            captured_at: Instant::now(),
        };

        assert_eq!(frame.rgb_at(0, 0), (255, 0, 0));
        assert_eq!(frame.rgb_at(1, 0), (0, 255, 0));
        assert_eq!(frame.rgb_at(0, 1), (0, 0, 255));
        assert_eq!(frame.rgb_at(1, 1), (255, 255, 255));
        assert_eq!(frame.luma_at(1, 1), 255);
        // Out of range coordinates clamp to the last pixel
        assert_eq!(frame.rgb_at(9, 9), (255, 255, 255));
    }

    #[test]
    fn test_yuyv_luma_uses_y_samples() {
        // Y0=10 U=128 Y1=200 V=128
        let frame = CameraFrame::packed(2, 1, PixelFormat::YUYV, vec![10, 128, 200, 128]);
        assert_eq!(frame.luma_at(0, 0), 10);
        assert_eq!(frame.luma_at(1, 0), 200);
        // Neutral chroma gives gray
        assert_eq!(frame.rgb_at(1, 0), (200, 200, 200));
    }

    #[test]
    fn test_empty_frame_samples_black() {
        let frame = CameraFrame::packed(0, 0, PixelFormat::Gray8, Vec::new());
        assert_eq!(frame.rgb_at(0, 0), (0, 0, 0));
        assert_eq!(frame.luma_at(3, 3), 0);
    }
}
