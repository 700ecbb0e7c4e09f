// SPDX-License-Identifier: GPL-3.0-only

//! QR retrieval-code scanning
//!
//! Decodes the retrieval code a customer shows to the camera, feeding the
//! backend check-code handoff flow. Frames are converted to grayscale and
//! downscaled before detection to keep this cheap enough to poll.

use crate::backends::camera::types::CameraFrame;
use image::imageops::FilterType;
use tokio::task;
use tracing::{debug, warn};

/// QR code scanner
pub struct QrScanner {
    /// Frames are downscaled so their longest side fits this before decoding
    max_dimension: u32,
}

impl Default for QrScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl QrScanner {
    /// Create a scanner with the default processing resolution
    pub fn new() -> Self {
        // Retrieval codes fill a good part of the frame; 640px is plenty
        Self { max_dimension: 640 }
    }

    /// Create a scanner with a custom processing resolution
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    /// Decode the first readable QR code in the frame, if any.
    ///
    /// Detection runs on the blocking pool; an undecodable or code-free
    /// frame simply yields `None`.
    pub async fn scan(&self, frame: CameraFrame) -> Option<String> {
        let max_dimension = self.max_dimension;

        task::spawn_blocking(move || scan_sync(&frame, max_dimension))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "QR scan task panicked");
                None
            })
    }
}

/// Synchronous QR detection (runs in a blocking task)
fn scan_sync(frame: &CameraFrame, max_dimension: u32) -> Option<String> {
    let rgba = frame.to_rgba_image()?;
    let mut gray = image::DynamicImage::ImageRgba8(rgba).to_luma8();

    if gray.width() > max_dimension || gray.height() > max_dimension {
        let scale =
            (gray.width() as f32 / max_dimension as f32).max(gray.height() as f32 / max_dimension as f32);
        let new_width = (gray.width() as f32 / scale) as u32;
        let new_height = (gray.height() as f32 / scale) as u32;
        gray = image::imageops::resize(&gray, new_width, new_height, FilterType::Triangle);
    }

    let (width, height) = gray.dimensions();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        width as usize,
        height as usize,
        |x, y| gray.get_pixel(x as u32, y as u32).0[0],
    );

    for grid in prepared.detect_grids() {
        match grid.decode() {
            Ok((_meta, content)) => {
                debug!(content = %content, "QR code decoded");
                return Some(content);
            }
            Err(e) => {
                debug!(error = %e, "QR grid failed to decode");
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::PixelFormat;
    use std::sync::Arc;
    use std::time::Instant;

    #[tokio::test]
    async fn test_blank_frame_has_no_code() {
        let data = vec![255u8; 320 * 240 * 4];
        let frame = CameraFrame {
            width: 320,
            height: 240,
            data: Arc::from(data.as_slice()),
            format: PixelFormat::Rgba,
            stride: 320 * 4,
            captured_at: Instant::now(),
        };

        let scanner = QrScanner::new();
        assert!(scanner.scan(frame).await.is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_is_downscaled_before_scanning() {
        let data = vec![128u8; 1920 * 1080 * 4];
        let frame = CameraFrame {
            width: 1920,
            height: 1080,
            data: Arc::from(data.as_slice()),
            format: PixelFormat::Rgba,
            stride: 1920 * 4,
            captured_at: Instant::now(),
        };

        let scanner = QrScanner::with_max_dimension(320);
        assert!(scanner.scan(frame).await.is_none());
    }
}
