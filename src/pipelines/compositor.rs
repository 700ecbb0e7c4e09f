// SPDX-License-Identifier: GPL-3.0-only

//! Still-frame compositing pipeline
//!
//! Turns one raw camera frame plus an optional overlay into an encoded JPEG
//! at the active format's fixed canvas size. The frame is cover-fitted:
//! scaled by `max(target/source)` and centre-cropped, so the output always
//! exactly fills the canvas whatever the source aspect ratio.

use crate::backends::camera::types::CameraFrame;
use crate::constants::{OutputFormat, JPEG_QUALITY};
use crate::errors::CaptureError;
use crate::pipelines::overlay::{self, Overlay};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::sync::Arc;
use tracing::{debug, info};

/// An encoded still, ready for review and upload
#[derive(Debug, Clone)]
pub struct CapturedStill {
    /// JPEG bytes
    pub data: Arc<[u8]>,
    /// Raster width (equals the format canvas width)
    pub width: u32,
    /// Raster height (equals the format canvas height)
    pub height: u32,
}

/// Still-frame compositor
pub struct FrameCompositor {
    jpeg_quality: u8,
}

impl Default for FrameCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCompositor {
    /// Create a compositor at the standard JPEG quality
    pub fn new() -> Self {
        Self {
            jpeg_quality: JPEG_QUALITY,
        }
    }

    /// Scale and crop `source` so it exactly covers a `width`x`height`
    /// canvas: crop to fill, never letterbox.
    pub fn cover_fit(source: &RgbaImage, width: u32, height: u32) -> RgbaImage {
        let (src_w, src_h) = source.dimensions();
        if (src_w, src_h) == (width, height) {
            return source.clone();
        }

        let scale = (width as f64 / src_w as f64).max(height as f64 / src_h as f64);
        let scaled_w = ((src_w as f64 * scale).round() as u32).max(width);
        let scaled_h = ((src_h as f64 * scale).round() as u32).max(height);

        let scaled = imageops::resize(source, scaled_w, scaled_h, FilterType::Triangle);

        let offset_x = (scaled_w - width) / 2;
        let offset_y = (scaled_h - height) / 2;
        imageops::crop_imm(&scaled, offset_x, offset_y, width, height).to_image()
    }

    /// Composite one camera frame against the format canvas and the selected
    /// filter, then encode to JPEG.
    ///
    /// Exactly one still (or an error) per call; nothing is written to the
    /// session on failure. Overlay load failures fail the whole capture.
    pub async fn compose_still(
        &self,
        frame: &CameraFrame,
        format: OutputFormat,
        filter: &Overlay,
    ) -> Result<CapturedStill, CaptureError> {
        let (width, height) = format.canvas_size();
        debug!(
            format = format.display_name(),
            width, height, "Compositing still"
        );

        let source = frame
            .to_rgba_image()
            .ok_or_else(|| CaptureError::Encode("frame buffer too small".to_string()))?;

        let overlay_image = overlay::load_overlay(filter).await?;

        let quality = self.jpeg_quality;
        let jpeg = tokio::task::spawn_blocking(move || {
            let mut canvas = Self::cover_fit(&source, width, height);
            if let Some(overlay_image) = overlay_image {
                draw_overlay(&mut canvas, &overlay_image, width, height);
            }
            encode_jpeg(&canvas, quality)
        })
        .await
        .map_err(|e| CaptureError::Encode(format!("composite task failed: {}", e)))??;

        info!(
            format = format.display_name(),
            bytes = jpeg.len(),
            "Still captured"
        );

        Ok(CapturedStill {
            data: Arc::from(jpeg.as_slice()),
            width,
            height,
        })
    }

    /// Produce one cover-fitted frame for an animated burst, with the filter
    /// composited in (bursts apply the overlay per frame; the animation
    /// encoder takes finished frames only).
    pub fn compose_burst_frame(
        source: &RgbaImage,
        overlay_image: Option<&RgbaImage>,
        width: u32,
        height: u32,
    ) -> RgbaImage {
        let mut canvas = Self::cover_fit(source, width, height);
        if let Some(overlay_image) = overlay_image {
            draw_overlay(&mut canvas, overlay_image, width, height);
        }
        canvas
    }
}

/// Alpha-composite the overlay over the canvas at full canvas size
fn draw_overlay(canvas: &mut RgbaImage, overlay_image: &RgbaImage, width: u32, height: u32) {
    if overlay_image.dimensions() == (width, height) {
        imageops::overlay(canvas, overlay_image, 0, 0);
    } else {
        let resized = imageops::resize(overlay_image, width, height, FilterType::Triangle);
        imageops::overlay(canvas, &resized, 0, 0);
    }
}

/// Encode an RGBA canvas to JPEG (alpha dropped; JPEG carries no alpha)
fn encode_jpeg(canvas: &RgbaImage, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let rgb = image::DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode_image(&rgb)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(bytes)
}
