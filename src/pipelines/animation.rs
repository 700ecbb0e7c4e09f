// SPDX-License-Identifier: GPL-3.0-only

//! Animation encoding
//!
//! Wraps an ordered burst of frames into one animated GIF at the format's
//! animation dimensions. The GIF encoder is the most failure-prone external
//! call in the pipeline; its errors are surfaced explicitly, never
//! swallowed.

use crate::errors::CaptureError;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// An encoded animation, ready for review and upload
#[derive(Debug, Clone)]
pub struct CapturedAnimation {
    /// GIF bytes
    pub data: Arc<[u8]>,
    /// Raster width
    pub width: u32,
    /// Raster height
    pub height: u32,
    /// Number of encoded frames
    pub frame_count: usize,
}

/// Encode an ordered frame sequence into a looping animated GIF.
///
/// Every frame must already match `width`x`height`; a mismatch is an encode
/// error, not a silent resize. An empty sequence is rejected.
pub async fn encode(
    frames: Vec<RgbaImage>,
    width: u32,
    height: u32,
    frame_interval: Duration,
) -> Result<CapturedAnimation, CaptureError> {
    if frames.is_empty() {
        return Err(CaptureError::Encode("no frames to encode".to_string()));
    }
    for (index, frame) in frames.iter().enumerate() {
        if frame.dimensions() != (width, height) {
            return Err(CaptureError::Encode(format!(
                "frame {} is {}x{}, expected {}x{}",
                index,
                frame.width(),
                frame.height(),
                width,
                height
            )));
        }
    }

    let frame_count = frames.len();
    debug!(frame_count, width, height, "Encoding animation");

    let data = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, CaptureError> {
        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut bytes, 10);
            encoder
                .set_repeat(Repeat::Infinite)
                .map_err(|e| CaptureError::Encode(e.to_string()))?;

            let delay = Delay::from_saturating_duration(frame_interval);
            for frame in frames {
                encoder
                    .encode_frame(Frame::from_parts(frame, 0, 0, delay))
                    .map_err(|e| CaptureError::Encode(e.to_string()))?;
            }
        }
        Ok(bytes)
    })
    .await
    .map_err(|e| CaptureError::Encode(format!("encode task failed: {}", e)))??;

    info!(frame_count, bytes = data.len(), "Animation encoded");

    Ok(CapturedAnimation {
        data: Arc::from(data.as_slice()),
        width,
        height,
        frame_count,
    })
}
