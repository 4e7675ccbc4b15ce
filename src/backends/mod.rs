// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for frame capture
//!
//! The scanner consumes cameras only through the [`camera::CameraBackend`]
//! trait. Two implementations are provided: V4L2 capture devices and
//! image files replayed as a frame stream.

pub mod camera;
