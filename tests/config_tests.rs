// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use snoozescan::scanner::VideoGravity;
use snoozescan::{AppError, Config};
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.device_path, None);
    assert_eq!(config.preview_gravity, VideoGravity::AspectFill);
    assert!(!config.mirror_preview, "Back camera preview is not mirrored");
    assert_eq!(config.max_detect_dimension, 640);
    assert_eq!((config.frame_width, config.frame_height), (640, 480));
    assert_eq!(config.dismiss_animation(), Duration::from_millis(400));
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from(&dir.path().join("config.json")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{ "device_path": "/dev/video2", "preview_gravity": "Aspect", "mirror_preview": true }"#,
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.device_path.as_deref(), Some("/dev/video2"));
    assert_eq!(config.preview_gravity, VideoGravity::Aspect);
    assert_eq!(config.max_detect_dimension, 640);

    let scanner = config.scanner_config();
    assert_eq!(scanner.gravity, VideoGravity::Aspect);
    assert!(scanner.mirrored);
}

#[test]
fn test_malformed_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(Config::load_from(&path), Err(AppError::Config(_))));
}

#[test]
fn test_config_path_is_app_scoped() {
    if let Some(path) = Config::path() {
        assert!(path.ends_with("snoozescan/config.json"));
    }
}

#[test]
fn test_unreadable_path_is_io_error() {
    let dir = tempfile::tempdir().unwrap();

    // A directory exists but cannot be read as a file
    let err = Config::load_from(dir.path()).unwrap_err();
    assert!(matches!(err, AppError::Io(_)));
    assert!(err.to_string().starts_with("I/O error: "));
}
