// SPDX-License-Identifier: GPL-3.0-only

//! QR scan screen controller
//!
//! The controller owns one capture session for the lifetime of the screen and
//! turns per-frame metadata into one of two outcomes:
//!
//! - **Register** (alarm not armed): the first non-empty QR payload becomes the
//!   new disarm code and is handed to [`ScannerDelegate::send_code`].
//! - **Verify** (alarm armed): payloads are compared with the stored code; a
//!   match calls [`ScannerDelegate::stop_alarm`], a mismatch shows
//!   "Unrecognized code" and scanning continues.
//!
//! ```text
//! Idle ──appear──▶ Scanning ──match / code set──▶ Resolved
//!   │                 │  ▲
//!   │                 └──┘ no code / mismatch / other symbology
//!   └─setup error─▶ SetupFailed
//! ```
//!
//! The capture session is always stopped before the delegate is called.

pub mod delegate;
pub mod detector;
pub mod metadata;
pub mod preview;
pub mod session;

pub use delegate::{OutcomeRecorder, ScanOutcome, ScannerDelegate};
pub use detector::{CodeDetector, QrDetector};
pub use metadata::{CaptureOutput, FrameRegion, MetadataObject, MetadataOutput, Symbology};
pub use preview::{PreviewLayer, PreviewRect, PreviewSize, VideoGravity};
pub use session::{CaptureSession, DeviceClaim, StopHandle};

use crate::backends::camera::CameraBackend;
use crate::constants::detector::DEFAULT_MAX_DIMENSION;
use crate::errors::ScanError;
use crate::fl;
use tracing::{debug, error, info, trace};

/// Which decision branch the screen runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanMode {
    /// Register a new disarm code
    Register,
    /// Compare scans against the stored disarm code
    Verify { alarm_code: String },
}

impl ScanMode {
    /// Build the mode from the caller's "alarm is set" flag
    ///
    /// An armed alarm requires the stored code. The code is ignored when the
    /// alarm is not armed.
    pub fn from_flag(alarm_set: bool, alarm_code: Option<String>) -> Result<Self, ScanError> {
        if !alarm_set {
            return Ok(ScanMode::Register);
        }
        alarm_code
            .map(|alarm_code| ScanMode::Verify { alarm_code })
            .ok_or(ScanError::MissingAlarmCode)
    }

    pub fn is_armed(&self) -> bool {
        matches!(self, ScanMode::Verify { .. })
    }
}

/// Text shown in the screen's message label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMessage {
    NoCodeDetected,
    UnrecognizedCode,
    CodeSet,
}

impl ScanMessage {
    /// Localized label text
    pub fn text(&self) -> String {
        match self {
            ScanMessage::NoCodeDetected => fl!("no-code-detected"),
            ScanMessage::UnrecognizedCode => fl!("unrecognized-code"),
            ScanMessage::CodeSet => fl!("code-set"),
        }
    }
}

/// How a scan finished successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    CodeSet,
    AlarmStopped,
}

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Created, screen not shown yet
    Idle,
    /// Capture running, waiting for a usable code
    Scanning,
    /// The camera could not be set up; the screen stays blank
    SetupFailed,
    /// A delegate method was called and the screen dismissed
    Resolved(Resolution),
    /// Dismissed by the user without an outcome
    Closed,
}

/// Screen dismissal request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dismissal {
    pub animated: bool,
}

/// Presentation settings for the scanner
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    pub gravity: VideoGravity,
    pub mirrored: bool,
    pub max_detect_dimension: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            gravity: VideoGravity::default(),
            mirrored: false,
            max_detect_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

/// The QR scan screen controller
pub struct ScannerController<D: ScannerDelegate> {
    mode: ScanMode,
    config: ScannerConfig,
    delegate: D,
    detector: Option<Box<dyn CodeDetector>>,
    state: ScanState,
    session: Option<CaptureSession>,
    preview: Option<PreviewLayer>,
    overlay: PreviewRect,
    message: Option<ScanMessage>,
    dismissal: Option<Dismissal>,
    setup_error: Option<ScanError>,
}

impl<D: ScannerDelegate> ScannerController<D> {
    pub fn new(mode: ScanMode, delegate: D) -> Self {
        Self {
            mode,
            config: ScannerConfig::default(),
            delegate,
            detector: None,
            state: ScanState::Idle,
            session: None,
            preview: None,
            overlay: PreviewRect::ZERO,
            message: None,
            dismissal: None,
            setup_error: None,
        }
    }

    pub fn with_config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default [`QrDetector`] used by the metadata stage
    pub fn with_detector(mut self, detector: Box<dyn CodeDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Screen appeared: acquire the camera and start scanning
    ///
    /// Setup failures are logged and leave the controller in
    /// [`ScanState::SetupFailed`]. The delegate is not told; there is no retry.
    pub fn appear(&mut self, backend: &dyn CameraBackend, size: PreviewSize) {
        if self.state != ScanState::Idle {
            debug!(state = ?self.state, "Scanner already appeared");
            return;
        }

        match self.start_session(backend) {
            Ok(session) => {
                info!(
                    armed = self.mode.is_armed(),
                    device = %session.device().name,
                    "QR scanner started"
                );
                self.preview = Some(
                    PreviewLayer::new(size, self.config.gravity).with_mirrored(self.config.mirrored),
                );
                self.session = Some(session);
                self.state = ScanState::Scanning;
            }
            Err(e) => {
                error!(error = %e, "Failed to start QR scanner");
                self.setup_error = Some(e);
                self.state = ScanState::SetupFailed;
            }
        }
    }

    fn start_session(&mut self, backend: &dyn CameraBackend) -> Result<CaptureSession, ScanError> {
        let device = backend.default_device()?;
        // Claim before opening so a busy device is never touched
        let claim = DeviceClaim::acquire(&device.path)?;
        let source = backend.open(&device)?;

        let detector = self.detector.take().unwrap_or_else(|| {
            Box::new(QrDetector::with_max_dimension(
                self.config.max_detect_dimension,
            ))
        });
        let mut output = MetadataOutput::new(detector);
        output.set_object_types(&[Symbology::Qr])?;

        CaptureSession::start(device, claim, source, output)
    }

    /// Drain every output already delivered to the main context
    ///
    /// Returns the number of outputs handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let Some(output) = self
                .session
                .as_mut()
                .and_then(CaptureSession::try_next_output)
            else {
                break;
            };
            self.handle_output(output);
            handled += 1;
        }
        handled
    }

    /// Wait for the next capture output
    ///
    /// Returns `None` when there is no session or its source has ended.
    pub async fn next_output(&mut self) -> Option<CaptureOutput> {
        match self.session.as_mut() {
            Some(session) => session.next_output().await,
            None => None,
        }
    }

    /// Per-frame callback
    pub fn handle_output(&mut self, output: CaptureOutput) {
        if self.state != ScanState::Scanning {
            return;
        }

        if let (Some(frame), Some(preview)) = (output.frame, self.preview.as_mut()) {
            preview.set_frame(frame);
        }

        self.handle_metadata(&output.objects);
    }

    /// Apply one frame's metadata objects
    ///
    /// Only the first object takes part; the rest of the frame is ignored.
    pub fn handle_metadata(&mut self, objects: &[MetadataObject]) {
        if self.state != ScanState::Scanning {
            return;
        }

        let Some(object) = objects.first() else {
            self.overlay = PreviewRect::ZERO;
            self.message = Some(ScanMessage::NoCodeDetected);
            return;
        };

        if object.symbology != Symbology::Qr {
            trace!(symbology = %object.symbology, "Ignoring non-QR code");
            return;
        }

        self.overlay = self
            .preview
            .as_ref()
            .map(|preview| preview.transformed_bounds(&object.bounds))
            .unwrap_or(PreviewRect::ZERO);

        if let Some(value) = object.value.as_deref().filter(|value| !value.is_empty()) {
            self.process_code(value.to_string());
        }
    }

    fn process_code(&mut self, value: String) {
        let matched = match &self.mode {
            ScanMode::Verify { alarm_code } => Some(*alarm_code == value),
            ScanMode::Register => None,
        };

        match matched {
            Some(true) => {
                info!("Disarm code matched");
                self.stop_capture();
                self.delegate.stop_alarm();
                self.resolve(Resolution::AlarmStopped);
            }
            Some(false) => {
                debug!("Scanned code does not match");
                self.message = Some(ScanMessage::UnrecognizedCode);
            }
            None => {
                info!("Disarm code registered");
                self.message = Some(ScanMessage::CodeSet);
                self.stop_capture();
                self.delegate.send_code(value);
                self.resolve(Resolution::CodeSet);
            }
        }
    }

    fn resolve(&mut self, resolution: Resolution) {
        self.state = ScanState::Resolved(resolution);
        self.dismissal = Some(Dismissal { animated: true });
    }

    fn stop_capture(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop();
        }
    }

    /// Close the screen without an outcome
    pub fn dismiss(&mut self) {
        if self.dismissal.is_some() {
            return;
        }

        self.stop_capture();
        self.state = ScanState::Closed;
        self.dismissal = Some(Dismissal { animated: false });
        info!("QR scanner dismissed");
    }

    /// Resize the preview surface
    pub fn resize_preview(&mut self, size: PreviewSize) {
        if let Some(preview) = self.preview.as_mut() {
            preview.set_size(size);
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn message(&self) -> Option<ScanMessage> {
        self.message
    }

    /// Bounding box of the current code in preview coordinates
    pub fn overlay(&self) -> PreviewRect {
        self.overlay
    }

    pub fn preview(&self) -> Option<&PreviewLayer> {
        self.preview.as_ref()
    }

    pub fn dismissal(&self) -> Option<Dismissal> {
        self.dismissal
    }

    pub fn setup_error(&self) -> Option<&ScanError> {
        self.setup_error.as_ref()
    }

    /// True while a capture session is held
    pub fn is_capturing(&self) -> bool {
        self.session.is_some()
    }

    /// Stop handle for the current session, if any
    pub fn stop_handle(&self) -> Option<StopHandle> {
        self.session.as_ref().map(CaptureSession::stop_handle)
    }

    /// True once the screen was dismissed or setup failed
    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            ScanState::SetupFailed | ScanState::Resolved(_) | ScanState::Closed
        )
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn into_delegate(mut self) -> D {
        self.stop_capture();
        self.delegate
    }
}
