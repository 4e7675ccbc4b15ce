// SPDX-License-Identifier: MPL-2.0

//! Live preview layer
//!
//! The preview layer is sized to the screen when scanning starts and shows
//! the latest captured frame scaled by its [`VideoGravity`]. It also maps
//! metadata bounds (normalized frame coordinates) into its own coordinate
//! space so the overlay box lines up with the code on screen.

use crate::backends::camera::CameraFrame;
use crate::scanner::metadata::FrameRegion;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How frames are scaled into the preview bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoGravity {
    /// Stretch to fill the bounds, ignoring aspect ratio
    Resize,
    /// Fit within the bounds, maintaining aspect ratio (letterboxing)
    Aspect,
    /// Fill the bounds, maintaining aspect ratio (cropping)
    #[default]
    AspectFill,
}

/// Size of the preview surface
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PreviewSize {
    pub width: f32,
    pub height: f32,
}

impl PreviewSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Rectangle in preview coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PreviewRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PreviewRect {
    /// The empty rectangle used when no code is visible
    pub const ZERO: PreviewRect = PreviewRect {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Preview surface attached to a capture session
#[derive(Debug, Clone)]
pub struct PreviewLayer {
    size: PreviewSize,
    gravity: VideoGravity,
    mirrored: bool,
    frame: Option<Arc<CameraFrame>>,
}

impl PreviewLayer {
    pub fn new(size: PreviewSize, gravity: VideoGravity) -> Self {
        Self {
            size,
            gravity,
            mirrored: false,
            frame: None,
        }
    }

    /// Flip horizontally (front cameras)
    pub fn with_mirrored(mut self, mirrored: bool) -> Self {
        self.mirrored = mirrored;
        self
    }

    pub fn size(&self) -> PreviewSize {
        self.size
    }

    pub fn set_size(&mut self, size: PreviewSize) {
        self.size = size;
    }

    /// Latest frame shown by the layer
    pub fn frame(&self) -> Option<&Arc<CameraFrame>> {
        self.frame.as_ref()
    }

    pub fn set_frame(&mut self, frame: Arc<CameraFrame>) {
        self.frame = Some(frame);
    }

    /// Where the video content lands inside the layer
    ///
    /// With [`VideoGravity::AspectFill`] the rectangle extends past the layer
    /// bounds on the cropped axis. Without a frame the content is assumed to
    /// fill the layer exactly.
    pub fn video_rect(&self) -> PreviewRect {
        let full = PreviewRect {
            x: 0.0,
            y: 0.0,
            width: self.size.width,
            height: self.size.height,
        };

        let Some(frame) = &self.frame else {
            return full;
        };
        if frame.width == 0 || frame.height == 0 || self.gravity == VideoGravity::Resize {
            return full;
        }

        let scale_x = self.size.width / frame.width as f32;
        let scale_y = self.size.height / frame.height as f32;
        let scale = if self.gravity == VideoGravity::Aspect {
            scale_x.min(scale_y)
        } else {
            scale_x.max(scale_y)
        };

        let width = frame.width as f32 * scale;
        let height = frame.height as f32 * scale;
        PreviewRect {
            x: (self.size.width - width) / 2.0,
            y: (self.size.height - height) / 2.0,
            width,
            height,
        }
    }

    /// Map normalized frame bounds into layer coordinates
    pub fn transformed_bounds(&self, bounds: &FrameRegion) -> PreviewRect {
        let video = self.video_rect();

        let x = if self.mirrored {
            1.0 - bounds.x - bounds.width
        } else {
            bounds.x
        };

        PreviewRect {
            x: video.x + x * video.width,
            y: video.y + bounds.y * video.height,
            width: bounds.width * video.width,
            height: bounds.height * video.height,
        }
    }

    /// Map a layer point back to frame pixel coordinates
    ///
    /// Returns `None` for points outside the video content (letterbox bars)
    /// or when there is no frame.
    pub fn frame_point(&self, x: f32, y: f32) -> Option<(u32, u32)> {
        let frame = self.frame.as_ref()?;
        if frame.width == 0 || frame.height == 0 {
            return None;
        }
        let video = self.video_rect();
        if video.is_empty() {
            return None;
        }

        let nx = (x - video.x) / video.width;
        let ny = (y - video.y) / video.height;
        if !(0.0..1.0).contains(&nx) || !(0.0..1.0).contains(&ny) {
            return None;
        }

        let nx = if self.mirrored { 1.0 - nx } else { nx };
        let fx = ((nx * frame.width as f32) as u32).min(frame.width - 1);
        let fy = ((ny * frame.height as f32) as u32).min(frame.height - 1);
        Some((fx, fy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::PixelFormat;

    fn layer_with_frame(gravity: VideoGravity, frame_w: u32, frame_h: u32) -> PreviewLayer {
        let mut layer = PreviewLayer::new(PreviewSize::new(200.0, 100.0), gravity);
        let pixels = (frame_w * frame_h) as usize;
        layer.set_frame(Arc::new(CameraFrame::packed(
            frame_w,
            frame_h,
            PixelFormat::Gray8,
            vec![0; pixels],
        )));
        layer
    }

    fn assert_rect(rect: PreviewRect, x: f32, y: f32, width: f32, height: f32) {
        assert!((rect.x - x).abs() < 0.01, "x: {} != {}", rect.x, x);
        assert!((rect.y - y).abs() < 0.01, "y: {} != {}", rect.y, y);
        assert!((rect.width - width).abs() < 0.01, "w: {} != {}", rect.width, width);
        assert!((rect.height - height).abs() < 0.01, "h: {} != {}", rect.height, height);
    }

    #[test]
    fn test_aspect_letterboxes() {
        // Square frame in a 2:1 layer: pillarboxed, centered
        let layer = layer_with_frame(VideoGravity::Aspect, 100, 100);
        assert_rect(layer.video_rect(), 50.0, 0.0, 100.0, 100.0);
    }

    #[test]
    fn test_aspect_fill_crops() {
        // Square frame in a 2:1 layer: scaled to width, cropped top and bottom
        let layer = layer_with_frame(VideoGravity::AspectFill, 100, 100);
        assert_rect(layer.video_rect(), 0.0, -50.0, 200.0, 200.0);
    }

    #[test]
    fn test_resize_stretches() {
        let layer = layer_with_frame(VideoGravity::Resize, 100, 100);
        assert_rect(layer.video_rect(), 0.0, 0.0, 200.0, 100.0);
    }

    #[test]
    fn test_transformed_bounds_follow_gravity() {
        let region = FrameRegion {
            x: 0.25,
            y: 0.25,
            width: 0.5,
            height: 0.5,
        };

        let fill = layer_with_frame(VideoGravity::AspectFill, 100, 100);
        assert_rect(fill.transformed_bounds(&region), 50.0, 0.0, 100.0, 100.0);

        let fit = layer_with_frame(VideoGravity::Aspect, 100, 100);
        assert_rect(fit.transformed_bounds(&region), 75.0, 25.0, 50.0, 50.0);
    }

    #[test]
    fn test_mirrored_bounds_flip_horizontally() {
        let layer = layer_with_frame(VideoGravity::Resize, 100, 100).with_mirrored(true);
        let region = FrameRegion {
            x: 0.0,
            y: 0.0,
            width: 0.25,
            height: 0.5,
        };
        assert_rect(layer.transformed_bounds(&region), 150.0, 0.0, 50.0, 50.0);
    }

    #[test]
    fn test_bounds_without_frame_fill_layer() {
        let layer = PreviewLayer::new(PreviewSize::new(80.0, 40.0), VideoGravity::AspectFill);
        let region = FrameRegion {
            x: 0.5,
            y: 0.5,
            width: 0.5,
            height: 0.5,
        };
        assert_rect(layer.transformed_bounds(&region), 40.0, 20.0, 40.0, 20.0);
    }

    #[test]
    fn test_frame_point_skips_letterbox() {
        let layer = layer_with_frame(VideoGravity::Aspect, 100, 100);
        assert_eq!(layer.frame_point(10.0, 50.0), None);
        assert_eq!(layer.frame_point(50.0, 0.0), Some((0, 0)));
        assert_eq!(layer.frame_point(149.0, 99.0), Some((99, 99)));
    }

    #[test]
    fn test_frame_point_on_empty_frame() {
        for gravity in [VideoGravity::Resize, VideoGravity::Aspect, VideoGravity::AspectFill] {
            let layer = layer_with_frame(gravity, 0, 0);
            assert_eq!(layer.frame_point(100.0, 50.0), None);
        }
    }
}
