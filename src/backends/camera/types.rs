// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera frame sources

use image::RgbaImage;
use std::sync::Arc;
use std::time::Instant;

/// Pixel layout of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit RGBA, 4 bytes per pixel
    Rgba,
    /// Packed YUV 4:2:2, 2 bytes per pixel (what most UVC webcams deliver)
    Yuyv,
}

/// A single captured video frame
///
/// Frame data is reference counted so frames can move through the pipeline
/// without copying pixel data.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Raw pixel data
    pub data: Arc<[u8]>,
    /// Pixel layout of `data`
    pub format: PixelFormat,
    /// Bytes per row, including any padding
    pub stride: u32,
    /// When this frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Convert the frame to an RGBA image, stripping stride padding.
    ///
    /// Returns `None` when the buffer is too small for the declared
    /// dimensions.
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        match self.format {
            PixelFormat::Rgba => {
                let rgba = copy_rgba_without_stride(self)?;
                RgbaImage::from_raw(self.width, self.height, rgba)
            }
            PixelFormat::Yuyv => {
                let rgba = yuyv_to_rgba(self)?;
                RgbaImage::from_raw(self.width, self.height, rgba)
            }
        }
    }
}

/// Which way the camera should face, mirroring the browser constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    /// Selfie camera, facing the customer
    #[default]
    User,
    /// Rear camera
    Environment,
    /// No preference
    Any,
}

/// Requested camera stream constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConstraints {
    /// Requested width in pixels
    pub width: u32,
    /// Requested height in pixels
    pub height: u32,
    /// Requested camera orientation
    pub facing: FacingMode,
}

impl CameraConstraints {
    /// Constraints for a given resolution, facing the customer
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            facing: FacingMode::User,
        }
    }
}

/// Identity of an opened frame source, for logging
#[derive(Debug, Clone, Default)]
pub struct SourceDescriptor {
    /// Human-readable device name
    pub name: String,
    /// Driver or backend identifier
    pub driver: String,
}

/// Copy RGBA frame data without stride padding
fn copy_rgba_without_stride(frame: &CameraFrame) -> Option<Vec<u8>> {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let stride = frame.stride as usize;

    let mut result = Vec::with_capacity(width * height * 4);

    for y in 0..height {
        let row_start = y * stride;
        let row_end = row_start + width * 4;
        if row_end > frame.data.len() {
            return None;
        }
        result.extend_from_slice(&frame.data[row_start..row_end]);
    }

    Some(result)
}

/// Expand packed YUYV data to RGBA, stripping stride padding
fn yuyv_to_rgba(frame: &CameraFrame) -> Option<Vec<u8>> {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let stride = frame.stride as usize;

    let mut result = Vec::with_capacity(width * height * 4);

    for y in 0..height {
        let row_start = y * stride;
        // Each 4-byte group encodes two horizontally adjacent pixels
        for pair_x in (0..width).step_by(2) {
            let offset = row_start + pair_x * 2;
            if offset + 3 >= frame.data.len() {
                return None;
            }
            let y0 = frame.data[offset];
            let u = frame.data[offset + 1];
            let y1 = frame.data[offset + 2];
            let v = frame.data[offset + 3];

            let (r, g, b) = yuv_to_rgb(y0, u, v);
            result.extend_from_slice(&[r, g, b, 255]);

            if pair_x + 1 < width {
                let (r, g, b) = yuv_to_rgb(y1, u, v);
                result.extend_from_slice(&[r, g, b, 255]);
            }
        }
    }

    Some(result)
}

/// Convert YUV values to RGB using the ITU-R BT.601 formula
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y_f = f32::from(y);
    let u_f = f32::from(u) - 128.0;
    let v_f = f32::from(v) - 128.0;

    let r = y_f + 1.402 * v_f;
    let g = y_f - 0.344_14 * u_f - 0.714_14 * v_f;
    let b = y_f + 1.772 * u_f;

    let clamp = |val: f32| val.clamp(0.0, 255.0) as u8;
    (clamp(r), clamp(g), clamp(b))
}
