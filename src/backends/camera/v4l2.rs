// SPDX-License-Identifier: GPL-3.0-only

//! Direct V4L2 capture
//!
//! Opens a `/dev/videoN` node with the v4l crate, negotiates a pixel format
//! the detector can read and streams frames through memory-mapped buffers.

use super::types::*;
use super::{CameraBackend, FrameSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

/// Formats tried in order during negotiation
const PREFERRED_FOURCCS: [&[u8; 4]; 3] = [b"YUYV", b"GREY", b"MJPG"];

/// Number of mmap buffers queued on the device
const BUFFER_COUNT: u32 = 4;

/// Pause after a failed dequeue before trying again
const RETRY_DELAY: Duration = Duration::from_millis(10);

/// Wire format of the negotiated stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamFormat {
    Yuyv,
    Grey,
    Mjpeg,
}

impl StreamFormat {
    fn from_fourcc(repr: &[u8; 4]) -> Option<Self> {
        match repr {
            b"YUYV" => Some(Self::Yuyv),
            b"GREY" => Some(Self::Grey),
            b"MJPG" => Some(Self::Mjpeg),
            _ => None,
        }
    }
}

/// Backend over V4L2 capture nodes
#[derive(Debug, Clone)]
pub struct V4l2Backend {
    /// Explicit device node; the first capture node is used when unset
    device_path: Option<String>,
    width: u32,
    height: u32,
}

impl V4l2Backend {
    /// Create a backend requesting the given capture resolution
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            device_path: None,
            width,
            height,
        }
    }

    /// Pin the backend to a specific device node
    pub fn with_device_path(mut self, device_path: Option<String>) -> Self {
        self.device_path = device_path;
        self
    }
}

impl CameraBackend for V4l2Backend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        enumerate_v4l2_cameras()
    }

    fn default_device(&self) -> BackendResult<CameraDevice> {
        match &self.device_path {
            Some(path) => enumerate_v4l2_cameras()
                .into_iter()
                .find(|camera| &camera.path == path)
                .ok_or_else(|| BackendError::DeviceNotFound(path.clone())),
            None => enumerate_v4l2_cameras()
                .into_iter()
                .next()
                .ok_or_else(|| BackendError::DeviceNotFound("No cameras found".to_string())),
        }
    }

    fn open(&self, device: &CameraDevice) -> BackendResult<Box<dyn FrameSource>> {
        info!(device = %device.name, path = %device.path, "Opening V4L2 device");

        let dev = Device::with_path(&device.path).map_err(|e| {
            BackendError::InitializationFailed(format!(
                "Failed to open V4L2 device {}: {}",
                device.path, e
            ))
        })?;

        let mut format = dev
            .format()
            .map_err(|e| BackendError::InitializationFailed(format!("Failed to query format: {}", e)))?;
        format.width = self.width;
        format.height = self.height;

        let mut negotiated = None;
        for fourcc in PREFERRED_FOURCCS {
            format.fourcc = v4l::FourCC::new(fourcc);
            match dev.set_format(&format) {
                Ok(actual) if actual.fourcc == format.fourcc => {
                    negotiated = Some(actual);
                    break;
                }
                Ok(actual) => {
                    debug!(requested = ?format.fourcc, got = ?actual.fourcc, "Format not accepted");
                }
                Err(e) => {
                    debug!(requested = ?format.fourcc, error = %e, "Could not set format");
                }
            }
        }

        let actual = negotiated.ok_or_else(|| {
            BackendError::FormatNotSupported(format!(
                "{} accepts none of YUYV, GREY, MJPG",
                device.path
            ))
        })?;
        let stream_format = StreamFormat::from_fourcc(&actual.fourcc.repr).ok_or_else(|| {
            BackendError::FormatNotSupported(format!("Unexpected fourcc {:?}", actual.fourcc))
        })?;

        info!(
            width = actual.width,
            height = actual.height,
            stride = actual.stride,
            fourcc = ?actual.fourcc,
            "Set V4L2 format"
        );

        Ok(Box::new(V4l2Source {
            device: dev,
            path: device.path.clone(),
            width: actual.width,
            height: actual.height,
            stride: actual.stride,
            stream_format,
        }))
    }
}

/// Enumerate V4L2 nodes that can capture video
pub fn enumerate_v4l2_cameras() -> Vec<CameraDevice> {
    let mut cameras = Vec::new();

    for node in v4l::context::enum_devices() {
        let path = node.path().to_string_lossy().to_string();
        let dev = match Device::with_path(node.path()) {
            Ok(dev) => dev,
            Err(e) => {
                debug!(path = %path, error = %e, "Skipping unreadable device");
                continue;
            }
        };
        let caps = match dev.query_caps() {
            Ok(caps) => caps,
            Err(e) => {
                debug!(path = %path, error = %e, "Failed to query capabilities");
                continue;
            }
        };
        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            continue;
        }

        cameras.push(CameraDevice {
            name: node.name().unwrap_or_else(|| caps.card.clone()),
            path,
            device_info: Some(DeviceInfo {
                card: caps.card,
                driver: caps.driver,
                bus: caps.bus,
            }),
        });
    }

    cameras.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(count = cameras.len(), "Enumerated V4L2 cameras");
    cameras
}

/// An opened and configured V4L2 node
struct V4l2Source {
    device: Device,
    path: String,
    width: u32,
    height: u32,
    stride: u32,
    stream_format: StreamFormat,
}

impl V4l2Source {
    fn to_frame(&self, buf: &[u8]) -> Option<CameraFrame> {
        match self.stream_format {
            StreamFormat::Yuyv | StreamFormat::Grey => {
                let format = if self.stream_format == StreamFormat::Yuyv {
                    PixelFormat::YUYV
                } else {
                    PixelFormat::Gray8
                };
                let stride = self.stride.max(self.width * format.bytes_per_pixel());
                if (buf.len() as u64) < stride as u64 * self.height as u64 {
                    return None;
                }
                let mut frame = CameraFrame::packed(self.width, self.height, format, buf.to_vec());
                frame.stride = stride;
                Some(frame)
            }
            StreamFormat::Mjpeg => {
                match image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg) {
                    Ok(img) => {
                        let rgba = img.to_rgba8();
                        let (width, height) = rgba.dimensions();
                        Some(CameraFrame::packed(
                            width,
                            height,
                            PixelFormat::RGBA,
                            rgba.into_raw(),
                        ))
                    }
                    Err(e) => {
                        debug!(error = %e, "Failed to decode MJPEG frame");
                        None
                    }
                }
            }
        }
    }
}

impl FrameSource for V4l2Source {
    fn stream(
        self: Box<Self>,
        running: &AtomicBool,
        sink: &mut dyn FnMut(CameraFrame),
    ) -> BackendResult<()> {
        let mut stream = MmapStream::with_buffers(&self.device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| {
                BackendError::InitializationFailed(format!("Failed to create buffer stream: {}", e))
            })?;

        info!(path = %self.path, "V4L2 capture stream started");

        let mut frame_num: u64 = 0;
        while running.load(Ordering::SeqCst) {
            match stream.next() {
                Ok((buf, meta)) => {
                    frame_num += 1;
                    match self.to_frame(buf) {
                        Some(frame) => sink(frame),
                        None => {
                            if frame_num % 30 == 0 {
                                warn!(
                                    frame = frame_num,
                                    sequence = meta.sequence,
                                    size = buf.len(),
                                    "Dropped malformed frame"
                                );
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to capture frame");
                    std::thread::sleep(RETRY_DELAY);
                }
            }
        }

        info!(path = %self.path, frames = frame_num, "V4L2 capture loop ended");
        Ok(())
    }
}
