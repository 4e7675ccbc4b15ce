// SPDX-License-Identifier: MPL-2.0

//! Error types for the scanner

use crate::backends::camera::BackendError;
use crate::scanner::metadata::Symbology;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Configuration errors
    Config(String),
    /// Filesystem errors
    Io(String),
}

/// Scanner-specific errors
#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    /// The camera collaborator refused the device or its configuration
    Backend(BackendError),
    /// Verify mode was requested without a stored disarm code
    MissingAlarmCode,
    /// The metadata stage cannot recognize the requested symbology
    UnsupportedObjectType(Symbology),
    /// The capture thread could not be spawned
    ThreadSpawn(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Backend(e) => write!(f, "{}", e),
            ScanError::MissingAlarmCode => write!(f, "Alarm is set but no disarm code was given"),
            ScanError::UnsupportedObjectType(symbology) => {
                write!(f, "Metadata output cannot recognize {}", symbology)
            }
            ScanError::ThreadSpawn(msg) => write!(f, "Failed to spawn capture thread: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for ScanError {}

impl From<BackendError> for ScanError {
    fn from(err: BackendError) -> Self {
        ScanError::Backend(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}
