// SPDX-License-Identifier: GPL-3.0-only

//! Image file frame source
//!
//! Replays still images as a camera stream. Useful for scanning a code that
//! was saved as a picture and for driving the scanner without hardware.

use super::types::*;
use super::{CameraBackend, FrameSource};
use crate::constants::{file_formats, file_source as timing};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Backend that exposes a list of image files as a single camera
#[derive(Debug, Clone)]
pub struct ImageFileBackend {
    paths: Vec<PathBuf>,
    looping: bool,
    frame_interval: Duration,
}

impl ImageFileBackend {
    /// Create a backend over the given images, played once
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            looping: false,
            frame_interval: timing::IMAGE_STREAM_FRAME_DURATION,
        }
    }

    /// Restart from the first image after the last one
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Override the delay between frames
    pub fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.frame_interval = frame_interval;
        self
    }
}

impl CameraBackend for ImageFileBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        let Some(first) = self.paths.first() else {
            return Vec::new();
        };

        vec![CameraDevice {
            name: format!("Image files ({})", self.paths.len()),
            path: format!("file://{}", first.display()),
            device_info: None,
        }]
    }

    fn open(&self, device: &CameraDevice) -> BackendResult<Box<dyn FrameSource>> {
        info!(device = %device.name, "Opening image file source");

        let frames = self
            .paths
            .iter()
            .map(|path| load_image_as_frame(path))
            .collect::<BackendResult<Vec<_>>>()?;

        Ok(Box::new(ImageFileSource {
            frames,
            looping: self.looping,
            frame_interval: self.frame_interval,
        }))
    }
}

/// Load an image file as an RGBA frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !file_formats::is_image_extension(&extension) {
        return Err(BackendError::FormatNotSupported(format!(
            "Unsupported file format: {}",
            path.display()
        )));
    }

    let img = image::open(path).map_err(|e| {
        BackendError::InitializationFailed(format!(
            "Failed to load image '{}': {}",
            path.display(),
            e
        ))
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    debug!(path = %path.display(), width, height, "Image loaded");

    Ok(CameraFrame::packed(
        width,
        height,
        PixelFormat::RGBA,
        rgba.into_raw(),
    ))
}

struct ImageFileSource {
    frames: Vec<CameraFrame>,
    looping: bool,
    frame_interval: Duration,
}

impl FrameSource for ImageFileSource {
    fn stream(
        self: Box<Self>,
        running: &AtomicBool,
        sink: &mut dyn FnMut(CameraFrame),
    ) -> BackendResult<()> {
        if self.frames.is_empty() {
            return Ok(());
        }

        'outer: loop {
            for frame in &self.frames {
                if !running.load(Ordering::SeqCst) {
                    break 'outer;
                }

                let mut frame = frame.clone();
                frame.captured_at = Instant::now();
                sink(frame);

                std::thread::sleep(self.frame_interval);
            }

            if !self.looping {
                break;
            }
        }

        debug!("Image file source finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_image(dir: &Path, name: &str, shade: u8) -> PathBuf {
        let path = dir.join(name);
        image::GrayImage::from_pixel(4, 3, image::Luma([shade]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_no_paths_means_no_device() {
        let backend = ImageFileBackend::new(Vec::new());
        assert!(backend.enumerate_cameras().is_empty());
        assert!(matches!(
            backend.default_device(),
            Err(BackendError::DeviceNotFound(_))
        ));
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let result = load_image_as_frame(Path::new("/tmp/code.txt"));
        assert!(matches!(result, Err(BackendError::FormatNotSupported(_))));
    }

    #[test]
    fn test_missing_file_fails_on_open() {
        let backend = ImageFileBackend::new(vec![PathBuf::from("/nonexistent/code.png")]);
        let device = backend.default_device().unwrap();
        assert!(matches!(
            backend.open(&device),
            Err(BackendError::InitializationFailed(_))
        ));
    }

    #[test]
    fn test_streams_each_image_once() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_test_image(dir.path(), "a.png", 10);
        let second = write_test_image(dir.path(), "b.png", 200);

        let backend =
            ImageFileBackend::new(vec![first, second]).with_frame_interval(Duration::ZERO);
        let device = backend.default_device().unwrap();
        let source = backend.open(&device).unwrap();

        let running = AtomicBool::new(true);
        let mut frames = Vec::new();
        source
            .stream(&running, &mut |frame| frames.push(frame))
            .unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].format, PixelFormat::RGBA);
        assert_eq!((frames[0].width, frames[0].height), (4, 3));
        assert_eq!(frames[0].luma_at(0, 0), 10);
        assert_eq!(frames[1].luma_at(3, 2), 200);
    }

    #[test]
    fn test_looping_source_stops_when_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "a.png", 50);

        let backend = ImageFileBackend::new(vec![path])
            .looping(true)
            .with_frame_interval(Duration::ZERO);
        let device = backend.default_device().unwrap();
        let source = backend.open(&device).unwrap();

        let running = AtomicBool::new(true);
        let mut count = 0;
        source
            .stream(&running, &mut |_| {
                count += 1;
                if count == 5 {
                    running.store(false, Ordering::SeqCst);
                }
            })
            .unwrap();

        assert_eq!(count, 5);
    }
}
