// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Capture session settings
pub mod capture {
    /// Capture outputs buffered between the capture thread and the main context.
    /// Further frames are dropped until the controller catches up.
    pub const OUTPUT_CHANNEL_CAPACITY: usize = 4;

    /// Requested capture width (QR codes do not need more)
    pub const DEFAULT_FRAME_WIDTH: u32 = 640;

    /// Requested capture height
    pub const DEFAULT_FRAME_HEIGHT: u32 = 480;
}

/// QR detection settings
pub mod detector {
    /// Frames are downscaled so that neither side exceeds this before detection
    pub const DEFAULT_MAX_DIMENSION: u32 = 640;
}

/// Terminal screen timing
pub mod terminal {
    use super::Duration;

    /// Input poll timeout, also bounds the redraw rate (~60fps)
    pub const POLL_INTERVAL: Duration = Duration::from_millis(16);

    /// How long the final state stays visible on an animated dismissal
    pub const DEFAULT_DISMISS_ANIMATION_MS: u64 = 400;
}

/// Supported file formats
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Image file source timing
pub mod file_source {
    use super::Duration;

    /// Frame rate for image streaming (~30fps)
    pub const IMAGE_STREAM_FRAME_DURATION: Duration = Duration::from_millis(33);
}
