// SPDX-License-Identifier: GPL-3.0-only

//! Capture session
//!
//! A session owns an opened frame source for its whole lifetime. Frames are
//! pulled and run through the metadata stage on a dedicated capture thread;
//! the resulting [`CaptureOutput`]s are handed to the main context over a
//! bounded channel, so the controller never sees concurrent callbacks.
//!
//! Camera devices are exclusive: a device path can be claimed by at most one
//! running session in the process. A [`DeviceClaim`] is taken before the
//! device is opened and released only after the capture thread has exited.

use crate::backends::camera::{BackendError, CameraDevice, FrameSource};
use crate::constants::capture::OUTPUT_CHANNEL_CAPACITY;
use crate::errors::ScanError;
use crate::scanner::metadata::{CaptureOutput, MetadataOutput};
use futures::StreamExt;
use futures::channel::mpsc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

/// Capture output sender type
pub type OutputSender = mpsc::Sender<CaptureOutput>;

/// Capture output receiver type
pub type OutputReceiver = mpsc::Receiver<CaptureOutput>;

/// Device paths owned by running sessions
static CLAIMED_DEVICES: LazyLock<Mutex<HashSet<String>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

/// Exclusive ownership of a camera device, released on drop
#[derive(Debug)]
pub struct DeviceClaim {
    path: String,
}

impl DeviceClaim {
    /// Claim `path`, failing with [`BackendError::Busy`] if a session owns it
    pub fn acquire(path: &str) -> Result<Self, ScanError> {
        let mut claimed = CLAIMED_DEVICES
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !claimed.insert(path.to_string()) {
            warn!(path, "Camera device already owned by another session");
            return Err(ScanError::Backend(BackendError::Busy));
        }
        Ok(Self {
            path: path.to_string(),
        })
    }
}

impl Drop for DeviceClaim {
    fn drop(&mut self) {
        let mut claimed = CLAIMED_DEVICES
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        claimed.remove(&self.path);
        debug!(path = %self.path, "Released camera device");
    }
}

/// Stops a session from another thread (e.g. a signal handler)
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Ask the capture thread to finish; the output channel closes once it has
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A running capture pipeline
pub struct CaptureSession {
    id: Uuid,
    device: CameraDevice,
    running: Arc<AtomicBool>,
    receiver: OutputReceiver,
    thread_handle: Option<std::thread::JoinHandle<()>>,
    claim: Option<DeviceClaim>,
}

impl CaptureSession {
    /// Start streaming `source` through `output`
    ///
    /// `claim` must cover `device`; it is held until the capture thread exits.
    pub fn start(
        device: CameraDevice,
        claim: DeviceClaim,
        source: Box<dyn FrameSource>,
        output: MetadataOutput,
    ) -> Result<Self, ScanError> {
        debug_assert_eq!(claim.path, device.path);
        let id = Uuid::new_v4();

        let (sender, receiver) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let span = info_span!("scan_session", id = %id, device = %device.path);
        let thread_handle = std::thread::Builder::new()
            .name("qr-capture".to_string())
            .spawn(move || {
                let _enter = span.enter();
                capture_loop(source, output, sender, &running_clone);
            })
            .map_err(|e| ScanError::ThreadSpawn(e.to_string()))?;

        info!(id = %id, device = %device.name, "Capture session started");

        Ok(Self {
            id,
            device,
            running,
            receiver,
            thread_handle: Some(thread_handle),
            claim: Some(claim),
        })
    }

    pub fn device(&self) -> &CameraDevice {
        &self.device
    }

    /// True until the session is stopped or its source ends
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.running.clone())
    }

    /// Next output already delivered to the main context, without blocking
    pub fn try_next_output(&mut self) -> Option<CaptureOutput> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next output; `None` once the capture thread has ended
    pub async fn next_output(&mut self) -> Option<CaptureOutput> {
        self.receiver.next().await
    }

    /// Stop capturing and release the device
    ///
    /// Blocks until the capture thread has exited.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        // Unblock a sender waiting on a full channel
        self.receiver.close();

        if let Some(handle) = self.thread_handle.take() {
            match handle.join() {
                Ok(()) => info!(id = %self.id, "Capture session stopped"),
                Err(_) => warn!(id = %self.id, "Capture thread panicked"),
            }
        }

        self.claim.take();
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Main capture loop running in a separate thread
fn capture_loop(
    source: Box<dyn FrameSource>,
    output: MetadataOutput,
    mut sender: OutputSender,
    running: &AtomicBool,
) {
    let mut frame_num: u64 = 0;
    let mut dropped: u64 = 0;

    let result = source.stream(running, &mut |frame| {
        frame_num += 1;
        let objects = output.process(&frame);
        let capture = CaptureOutput {
            frame: Some(Arc::new(frame)),
            objects,
        };

        if let Err(e) = sender.try_send(capture) {
            if e.is_disconnected() {
                running.store(false, Ordering::SeqCst);
            } else {
                dropped += 1;
                if dropped % 30 == 1 {
                    debug!(frame = frame_num, dropped, "Capture output dropped (channel full)");
                }
            }
        }
    });

    if let Err(e) = result {
        error!(error = %e, "Capture loop failed");
    }

    running.store(false, Ordering::SeqCst);
    info!(frames = frame_num, dropped, "Capture loop ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{BackendResult, CameraFrame, PixelFormat};
    use crate::scanner::detector::QrDetector;
    use crate::scanner::metadata::Symbology;

    /// Emits `count` blank frames, then ends
    struct BlankSource {
        count: usize,
    }

    impl FrameSource for BlankSource {
        fn stream(
            self: Box<Self>,
            running: &AtomicBool,
            sink: &mut dyn FnMut(CameraFrame),
        ) -> BackendResult<()> {
            for _ in 0..self.count {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                sink(CameraFrame::packed(8, 8, PixelFormat::Gray8, vec![255; 64]));
            }
            Ok(())
        }
    }

    /// Streams until stopped
    struct EndlessSource;

    impl FrameSource for EndlessSource {
        fn stream(
            self: Box<Self>,
            running: &AtomicBool,
            _sink: &mut dyn FnMut(CameraFrame),
        ) -> BackendResult<()> {
            while running.load(Ordering::SeqCst) {
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
            Ok(())
        }
    }

    fn device(path: &str) -> CameraDevice {
        CameraDevice {
            name: "Test camera".to_string(),
            path: path.to_string(),
            device_info: None,
        }
    }

    fn qr_output() -> MetadataOutput {
        let mut output = MetadataOutput::new(Box::new(QrDetector::new()));
        output.set_object_types(&[Symbology::Qr]).unwrap();
        output
    }

    fn start(path: &str, source: Box<dyn FrameSource>) -> Result<CaptureSession, ScanError> {
        let claim = DeviceClaim::acquire(path)?;
        CaptureSession::start(device(path), claim, source, qr_output())
    }

    #[test]
    fn test_outputs_arrive_in_order_then_close() {
        let mut session = start("test://session-order", Box::new(BlankSource { count: 3 })).unwrap();

        let mut received = 0;
        while let Some(output) = pollster::block_on(session.next_output()) {
            assert!(output.objects.is_empty());
            assert!(output.frame.is_some());
            received += 1;
        }

        assert_eq!(received, 3);
        assert!(!session.is_running());
    }

    #[test]
    fn test_device_is_exclusive_until_stopped() {
        let path = "test://session-exclusive";
        let first = start(path, Box::new(EndlessSource)).unwrap();

        assert!(matches!(
            DeviceClaim::acquire(path),
            Err(ScanError::Backend(BackendError::Busy))
        ));

        first.stop();

        let third = start(path, Box::new(EndlessSource));
        assert!(third.is_ok());
    }

    #[test]
    fn test_stop_handle_ends_stream() {
        let mut session = start("test://session-stop-handle", Box::new(EndlessSource)).unwrap();

        session.stop_handle().stop();
        assert_eq!(pollster::block_on(session.next_output()).map(|_| ()), None);
        assert!(!session.is_running());
    }

    #[test]
    fn test_claim_released_on_drop() {
        let path = "test://session-claim-drop";
        let claim = DeviceClaim::acquire(path).unwrap();
        assert!(DeviceClaim::acquire(path).is_err());

        drop(claim);
        assert!(DeviceClaim::acquire(path).is_ok());
    }
}
