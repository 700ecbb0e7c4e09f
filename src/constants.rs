// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants and fixed lookup tables

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output canvas class for composites and animations
///
/// Each format maps to one fixed canvas size used for every composite, and
/// one fixed (smaller) size used for animated bursts. The booth operates in
/// exactly one format at a time; switching formats resets the filter
/// selection and reopens the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Wide landscape print (default)
    #[default]
    Landscape,
    /// Square print with a decorative border applied at print time
    SquareFrame,
    /// Tall strip print
    TallFrame,
}

impl OutputFormat {
    /// All format variants for UI iteration
    pub const ALL: [OutputFormat; 3] = [
        OutputFormat::Landscape,
        OutputFormat::SquareFrame,
        OutputFormat::TallFrame,
    ];

    /// Get display name for the format
    pub fn display_name(&self) -> &'static str {
        match self {
            OutputFormat::Landscape => "Paysage",
            OutputFormat::SquareFrame => "Polaroid",
            OutputFormat::TallFrame => "Mini polaroid",
        }
    }

    /// Target canvas size in pixels for still composites
    pub fn canvas_size(&self) -> (u32, u32) {
        match self {
            OutputFormat::Landscape => (3228, 2160),
            OutputFormat::SquareFrame => (2160, 2160),
            OutputFormat::TallFrame => (1400, 2160),
        }
    }

    /// Target size in pixels for animated bursts (quarter scale of the
    /// still canvas, same aspect ratio)
    pub fn animation_size(&self) -> (u32, u32) {
        match self {
            OutputFormat::Landscape => (807, 540),
            OutputFormat::SquareFrame => (540, 540),
            OutputFormat::TallFrame => (350, 540),
        }
    }

    /// Wire name used in print job payloads
    pub fn wire_name(&self) -> &'static str {
        match self {
            OutputFormat::Landscape => "PAYSAGE",
            OutputFormat::SquareFrame => "POLAROID",
            OutputFormat::TallFrame => "MINIPOLAROID",
        }
    }
}

/// Capture mode: one frame or an animated burst
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureMode {
    /// Single still photo
    #[default]
    Still,
    /// Fixed-count timed sequence combined into one animated image
    Burst,
}

impl CaptureMode {
    /// All mode variants for UI iteration
    pub const ALL: [CaptureMode; 2] = [CaptureMode::Still, CaptureMode::Burst];

    /// Get display name for the mode
    pub fn display_name(&self) -> &'static str {
        match self {
            CaptureMode::Still => "Photo",
            CaptureMode::Burst => "GIF",
        }
    }
}

/// Encoded media kind produced by a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// JPEG still
    Jpeg,
    /// Animated GIF
    Gif,
}

impl MediaKind {
    /// `mode` value sent with multipart uploads
    pub fn upload_mode(&self) -> &'static str {
        match self {
            MediaKind::Jpeg => ".jpg",
            MediaKind::Gif => ".gif",
        }
    }

    /// MIME type of the encoded blob
    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaKind::Jpeg => "image/jpeg",
            MediaKind::Gif => "image/gif",
        }
    }
}

/// Default countdown length for still captures, in seconds
pub const DEFAULT_COUNTDOWN_SECS: u32 = 4;

/// Default number of frames in an animated burst
pub const DEFAULT_BURST_FRAMES: usize = 4;

/// Default countdown length before each burst frame, in seconds
pub const DEFAULT_BURST_COUNTDOWN_SECS: u32 = 3;

/// Settle delay between the flash cue and the actual grab
pub const FLASH_SETTLE: Duration = Duration::from_millis(700);

/// Default frame interval for animated bursts
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(500);

/// JPEG quality for still composites (the high end of the quality ladder)
pub const JPEG_QUALITY: u8 = 92;

/// Probe resolution used by the optional two-phase camera open
pub const PROBE_SIZE: (u32, u32) = (640, 480);

/// Default full capture resolution requested from the camera
pub const DEFAULT_CAPTURE_SIZE: (u32, u32) = (1920, 1080);

/// Allowed print copy range
pub const MIN_PRINT_COPIES: u32 = 1;
/// Allowed print copy range
pub const MAX_PRINT_COPIES: u32 = 6;

/// Clamp a requested copy count into the allowed range.
///
/// Out-of-range values are clamped, never rejected.
pub fn clamp_print_copies(requested: i64) -> u32 {
    requested.clamp(MIN_PRINT_COPIES as i64, MAX_PRINT_COPIES as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_sizes_are_fixed_per_format() {
        assert_eq!(OutputFormat::Landscape.canvas_size(), (3228, 2160));
        assert_eq!(OutputFormat::SquareFrame.canvas_size(), (2160, 2160));
        assert_eq!(OutputFormat::TallFrame.canvas_size(), (1400, 2160));
    }

    #[test]
    fn test_animation_size_keeps_aspect_ratio() {
        for format in OutputFormat::ALL {
            let (cw, ch) = format.canvas_size();
            let (aw, ah) = format.animation_size();
            // Quarter scale in both dimensions
            assert_eq!(aw, cw / 4);
            assert_eq!(ah, ch / 4);
        }
    }

    #[test]
    fn test_clamp_print_copies() {
        assert_eq!(clamp_print_copies(-3), 1);
        assert_eq!(clamp_print_copies(0), 1);
        assert_eq!(clamp_print_copies(1), 1);
        assert_eq!(clamp_print_copies(4), 4);
        assert_eq!(clamp_print_copies(6), 6);
        assert_eq!(clamp_print_copies(99), 6);
    }
}
