// SPDX-License-Identifier: MPL-2.0

//! snoozescan - the disarm-code QR scanner of an alarm clock
//!
//! This library provides the scan screen: a camera capture session, QR
//! recognition on each frame, a live preview with an overlay around the
//! detected code, and the decision that either registers a new disarm code
//! or stops a ringing alarm.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`scanner`]: Scan screen controller, capture session and QR detection
//! - [`backends`]: Camera backend abstraction (V4L2 devices, image files)
//! - [`terminal`]: Full-screen terminal rendering of the scan screen
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! use snoozescan::backends::camera::V4l2Backend;
//! use snoozescan::scanner::{OutcomeRecorder, PreviewSize, ScanMode, ScannerController};
//!
//! let mode = ScanMode::from_flag(true, Some("ABC123".into()))?;
//! let mut controller = ScannerController::new(mode, OutcomeRecorder::default());
//! controller.appear(&V4l2Backend::new(640, 480), PreviewSize::new(640.0, 480.0));
//! while !controller.is_finished() {
//!     controller.pump();
//! }
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod i18n;
pub mod scanner;
pub mod terminal;

// Re-export commonly used types
pub use config::Config;
pub use errors::{AppError, AppResult, ScanError};
pub use scanner::{ScanMode, ScanOutcome, ScanState, ScannerController, ScannerDelegate};
