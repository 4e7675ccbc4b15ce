// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for scanner operations
//!
//! This module provides command-line functionality for:
//! - Scanning interactively in the terminal
//! - Scanning headless until a result or Ctrl+C
//! - Listing available cameras

use clap::Args;
use snoozescan::backends::camera::{CameraBackend, ImageFileBackend, V4l2Backend};
use snoozescan::backends::camera::v4l2::enumerate_v4l2_cameras;
use snoozescan::config::Config;
use snoozescan::scanner::{
    OutcomeRecorder, PreviewSize, ScanMode, ScanOutcome, ScannerController,
};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Options shared by the scan commands
#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// The alarm is armed: verify scans against --code
    #[arg(long)]
    pub armed: bool,

    /// Stored disarm code (required with --armed)
    #[arg(long, value_name = "CODE")]
    pub code: Option<String>,

    /// Capture device path (e.g. /dev/video0), overrides the config file
    #[arg(short, long, value_name = "PATH")]
    pub device: Option<String>,

    /// Scan image files instead of a camera
    #[arg(short, long, value_name = "IMG", num_args = 1.., conflicts_with = "device")]
    pub files: Vec<PathBuf>,

    /// Replay image files until a result or close
    #[arg(long = "loop", requires = "files")]
    pub loop_files: bool,
}

/// Build the scan mode from the command line flags
fn scan_mode(args: &ScanArgs) -> Result<ScanMode, Box<dyn std::error::Error>> {
    if !args.armed && args.code.is_some() {
        warn!("--code is ignored without --armed");
    }
    Ok(ScanMode::from_flag(args.armed, args.code.clone())?)
}

/// Pick the camera collaborator for this run
fn build_backend(args: &ScanArgs, config: &Config) -> Box<dyn CameraBackend> {
    if !args.files.is_empty() {
        debug!(count = args.files.len(), "Using image file backend");
        return Box::new(ImageFileBackend::new(args.files.clone()).looping(args.loop_files));
    }

    let device_path = args.device.clone().or_else(|| config.device_path.clone());
    Box::new(
        V4l2Backend::new(config.frame_width, config.frame_height).with_device_path(device_path),
    )
}

fn print_outcome(outcome: &ScanOutcome, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(outcome)?);
        return Ok(());
    }

    match outcome {
        ScanOutcome::CodeSet { code, .. } => println!("Disarm code set: {}", code),
        ScanOutcome::AlarmStopped { .. } => println!("Alarm stopped"),
    }
    Ok(())
}

/// Run the interactive terminal scan screen
pub fn scan(args: ScanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mode = scan_mode(&args)?;
    let backend = build_backend(&args, &config);

    let outcome = snoozescan::terminal::run(
        mode,
        backend.as_ref(),
        config.scanner_config(),
        config.dismiss_animation(),
    )?;

    match outcome {
        Some(outcome) => print_outcome(&outcome, false),
        None => Err("Scanner closed without a result".into()),
    }
}

/// Scan without a UI until the scan resolves, the source ends, or Ctrl+C
pub fn run_headless(args: ScanArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mode = scan_mode(&args)?;
    let backend = build_backend(&args, &config);

    let mut controller =
        ScannerController::new(mode, OutcomeRecorder::default()).with_config(config.scanner_config());
    controller.appear(
        backend.as_ref(),
        PreviewSize::new(config.frame_width as f32, config.frame_height as f32),
    );

    if let Some(e) = controller.setup_error() {
        return Err(format!("Camera setup failed: {}", e).into());
    }

    // Set up Ctrl+C handler
    if let Some(stop_handle) = controller.stop_handle() {
        ctrlc::set_handler(move || stop_handle.stop())?;
    }

    if !json {
        println!("Scanning... (press Ctrl+C to stop)");
    }

    while !controller.is_finished() {
        match pollster::block_on(controller.next_output()) {
            Some(output) => controller.handle_output(output),
            None => {
                info!("Capture ended before a result");
                controller.dismiss();
            }
        }
    }

    let state = controller.state();
    match controller.into_delegate().into_outcome() {
        Some(outcome) => print_outcome(&outcome, json),
        None => Err(format!("Scan ended without a result ({:?})", state).into()),
    }
}

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let cameras = enumerate_v4l2_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        println!("      Path: {}", camera.path);
        if let Some(info) = &camera.device_info {
            println!("      Driver: {} ({})", info.driver, info.bus);
        }
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_mode_requires_code_when_armed() {
        let args = ScanArgs {
            armed: true,
            ..Default::default()
        };
        assert!(scan_mode(&args).is_err());

        let args = ScanArgs {
            armed: true,
            code: Some("ABC123".to_string()),
            ..Default::default()
        };
        assert_eq!(
            scan_mode(&args).unwrap(),
            ScanMode::Verify {
                alarm_code: "ABC123".to_string()
            }
        );
    }

    #[test]
    fn test_unarmed_scan_registers() {
        let args = ScanArgs {
            code: Some("ignored".to_string()),
            ..Default::default()
        };
        assert_eq!(scan_mode(&args).unwrap(), ScanMode::Register);
    }

    #[test]
    fn test_files_select_image_backend() {
        let args = ScanArgs {
            files: vec![PathBuf::from("/tmp/code.png")],
            ..Default::default()
        };
        let backend = build_backend(&args, &Config::default());
        let cameras = backend.enumerate_cameras();
        assert_eq!(cameras.len(), 1);
        assert!(cameras[0].path.starts_with("file://"));
    }
}
