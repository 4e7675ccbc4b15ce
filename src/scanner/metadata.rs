// SPDX-License-Identifier: MPL-2.0

//! Metadata objects reported by the capture pipeline
//!
//! Every processed frame yields a list of [`MetadataObject`]s, one per
//! recognized machine-readable code, in the order the detector found them.

use crate::backends::camera::CameraFrame;
use crate::errors::ScanError;
use crate::scanner::detector::CodeDetector;
use std::sync::Arc;
use tracing::debug;

/// Machine-readable code symbologies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbology {
    Qr,
    Ean13,
    Code128,
}

impl std::fmt::Display for Symbology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Symbology::Qr => "QR",
            Symbology::Ean13 => "EAN-13",
            Symbology::Code128 => "Code 128",
        };
        write!(f, "{}", name)
    }
}

/// A rectangular region within a frame
///
/// Coordinates are normalized (0.0 to 1.0) relative to the frame dimensions.
/// This allows easy transformation to preview coordinates regardless of
/// the actual frame size or preview gravity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameRegion {
    /// Left edge (0.0 = left of frame, 1.0 = right of frame)
    pub x: f32,
    /// Top edge (0.0 = top of frame, 1.0 = bottom of frame)
    pub y: f32,
    /// Width as fraction of frame width
    pub width: f32,
    /// Height as fraction of frame height
    pub height: f32,
}

impl FrameRegion {
    /// Axis-aligned bounding box of a set of corner points
    ///
    /// Points are in pixels of a `frame_width` x `frame_height` image and are
    /// clamped to it.
    pub fn from_corners(points: &[(f32, f32)], frame_width: u32, frame_height: u32) -> Self {
        if points.is_empty() || frame_width == 0 || frame_height == 0 {
            return Self::default();
        }

        let fw = frame_width as f32;
        let fh = frame_height as f32;
        let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
        let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
        for &(x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        let min_x = min_x.clamp(0.0, fw);
        let max_x = max_x.clamp(0.0, fw);
        let min_y = min_y.clamp(0.0, fh);
        let max_y = max_y.clamp(0.0, fh);

        Self {
            x: min_x / fw,
            y: min_y / fh,
            width: (max_x - min_x) / fw,
            height: (max_y - min_y) / fh,
        }
    }
}

/// One recognized code in a frame
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataObject {
    /// Symbology of the code
    pub symbology: Symbology,
    /// Decoded payload; `None` when the code was located but could not be decoded
    pub value: Option<String>,
    /// Bounding box in normalized frame coordinates
    pub bounds: FrameRegion,
}

impl MetadataObject {
    /// A QR code with a decoded payload
    pub fn qr(value: impl Into<String>, bounds: FrameRegion) -> Self {
        Self {
            symbology: Symbology::Qr,
            value: Some(value.into()),
            bounds,
        }
    }
}

/// Result of processing one frame
#[derive(Debug, Clone, Default)]
pub struct CaptureOutput {
    /// The frame for the preview layer
    pub frame: Option<Arc<CameraFrame>>,
    /// Recognized codes, in detection order
    pub objects: Vec<MetadataObject>,
}

/// Metadata-recognition stage of a capture session
///
/// Wraps a detector and reports only the object types it was configured
/// for. Until [`MetadataOutput::set_object_types`] is called nothing is
/// reported.
pub struct MetadataOutput {
    detector: Box<dyn CodeDetector>,
    object_types: Vec<Symbology>,
}

impl MetadataOutput {
    pub fn new(detector: Box<dyn CodeDetector>) -> Self {
        Self {
            detector,
            object_types: Vec::new(),
        }
    }

    /// Types currently reported
    pub fn object_types(&self) -> &[Symbology] {
        &self.object_types
    }

    /// Restrict reporting to `types`
    ///
    /// Fails without changing the configuration if any type is unsupported.
    pub fn set_object_types(&mut self, types: &[Symbology]) -> Result<(), ScanError> {
        let available = self.detector.supported_types();
        if let Some(unsupported) = types.iter().find(|t| !available.contains(*t)) {
            return Err(ScanError::UnsupportedObjectType(*unsupported));
        }

        self.object_types = types.to_vec();
        debug!(types = ?self.object_types, "Configured metadata object types");
        Ok(())
    }

    /// Run recognition on a frame
    pub fn process(&self, frame: &CameraFrame) -> Vec<MetadataObject> {
        if self.object_types.is_empty() {
            return Vec::new();
        }

        let mut objects = self.detector.detect(frame);
        objects.retain(|object| self.object_types.contains(&object.symbology));
        objects
    }
}
