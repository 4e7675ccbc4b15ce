// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! The scanner never talks to camera hardware directly. It asks a
//! [`CameraBackend`] for its default device and opens it as a
//! [`FrameSource`], which is then driven from the capture thread.
//!
//! ```text
//! ┌─────────────────────┐
//! │  ScannerController  │
//! └──────────┬──────────┘
//!            │ default_device() / open()
//!            ▼
//! ┌─────────────────────┐
//! │ CameraBackend Trait │
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌──────┐  ┌──────────┐
//!   │ V4L2 │  │ ImageFile│
//!   └──────┘  └──────────┘
//! ```

pub mod file_source;
pub mod types;
pub mod v4l2;

pub use file_source::ImageFileBackend;
pub use types::*;
pub use v4l2::V4l2Backend;

use std::sync::atomic::AtomicBool;

/// Camera collaborator used by the scanner
pub trait CameraBackend {
    /// Enumerate available capture devices on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Acquire the default video capture device
    ///
    /// The default implementation picks the first enumerated device.
    fn default_device(&self) -> BackendResult<CameraDevice> {
        self.enumerate_cameras()
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::DeviceNotFound("No cameras found".to_string()))
    }

    /// Open a device and negotiate its capture format
    ///
    /// Errors here are setup failures: the device could not be opened or
    /// rejected the requested configuration.
    fn open(&self, device: &CameraDevice) -> BackendResult<Box<dyn FrameSource>>;
}

/// An opened, configured frame producer
///
/// Sources are moved onto the capture thread, so the actual streaming
/// resources (mmap buffers, decoders) only live for the duration of
/// [`FrameSource::stream`].
pub trait FrameSource: Send {
    /// Push frames into `sink` until `running` is cleared or the source ends
    fn stream(
        self: Box<Self>,
        running: &AtomicBool,
        sink: &mut dyn FnMut(CameraFrame),
    ) -> BackendResult<()>;
}
