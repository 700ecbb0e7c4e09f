// SPDX-License-Identifier: GPL-3.0-only

//! Burst sequencing
//!
//! Runs a fixed number of countdown+grab rounds and hands the collected
//! frames to the animation encoder. Rounds are inherently sequential: each
//! one waits for its own countdown, and there is only one camera.

use crate::backends::camera::MediaHandle;
use crate::constants::OutputFormat;
use crate::errors::CaptureError;
use crate::pipelines::compositor::FrameCompositor;
use crate::pipelines::countdown::CountdownTimer;
use crate::pipelines::overlay::{self, Overlay};
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Collect exactly `frame_count` cover-fitted frames, one per countdown.
///
/// The sequence is all-or-nothing: a failure (or cancellation) in any round
/// aborts the burst and no partial sequence is returned. The active filter
/// is composited into each frame; the animation encoder receives finished
/// frames only.
pub async fn capture_burst(
    media: &mut MediaHandle,
    countdown: &mut CountdownTimer,
    frame_count: usize,
    per_frame_seconds: u32,
    format: OutputFormat,
    filter: &Overlay,
    cancel: &Arc<AtomicBool>,
) -> Result<Vec<RgbaImage>, CaptureError> {
    let (width, height) = format.animation_size();
    info!(
        frame_count,
        per_frame_seconds,
        format = format.display_name(),
        "Burst capture starting"
    );

    // Load the overlay once for the whole burst; fail-closed before the
    // first countdown rather than mid-sequence.
    let overlay_image = overlay::load_overlay(filter).await?;

    let mut frames = Vec::with_capacity(frame_count);

    for round in 0..frame_count {
        countdown.run(per_frame_seconds, cancel).await?;

        if cancel.load(Ordering::SeqCst) {
            return Err(CaptureError::Cancelled);
        }

        let frame = media.current_frame()?;
        let source = frame
            .to_rgba_image()
            .ok_or_else(|| CaptureError::Encode("frame buffer too small".to_string()))?;

        let overlay_for_round = overlay_image.clone();
        let composed = tokio::task::spawn_blocking(move || {
            FrameCompositor::compose_burst_frame(
                &source,
                overlay_for_round.as_deref(),
                width,
                height,
            )
        })
        .await
        .map_err(|e| CaptureError::Encode(format!("burst frame task failed: {}", e)))?;

        debug!(round, "Burst frame grabbed");
        frames.push(composed);
    }

    debug_assert_eq!(frames.len(), frame_count);
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::test_pattern::{TestPattern, TestPatternOpener};
    use crate::backends::camera::types::CameraConstraints;
    use crate::backends::camera::MediaSource;

    fn open_media() -> MediaSource {
        let mut media = MediaSource::new(Box::new(TestPatternOpener::new(TestPattern::Gradient)));
        media.open(&CameraConstraints::new(640, 480)).unwrap();
        media
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_produces_exactly_n_frames() {
        let mut media = open_media();
        let (mut countdown, _rx) = CountdownTimer::new();
        let cancel = Arc::new(AtomicBool::new(false));

        for n in [1usize, 3, 4] {
            let frames = capture_burst(
                media.handle_mut().unwrap(),
                &mut countdown,
                n,
                1,
                OutputFormat::SquareFrame,
                &Overlay::none(),
                &cancel,
            )
            .await
            .unwrap();

            assert_eq!(frames.len(), n);
            let expected = OutputFormat::SquareFrame.animation_size();
            for frame in &frames {
                assert_eq!(frame.dimensions(), expected);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_burst_yields_no_partial_sequence() {
        let mut media = open_media();
        let (mut countdown, _rx) = CountdownTimer::new();
        let cancel = Arc::new(AtomicBool::new(true));

        let result = capture_burst(
            media.handle_mut().unwrap(),
            &mut countdown,
            4,
            2,
            OutputFormat::Landscape,
            &Overlay::none(),
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(CaptureError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_overlay_aborts_before_any_countdown() {
        let mut media = open_media();
        let (mut countdown, _rx) = CountdownTimer::new();
        let cancel = Arc::new(AtomicBool::new(false));
        let filter = Overlay::new("absent", "/does/not/exist.png");

        let result = capture_burst(
            media.handle_mut().unwrap(),
            &mut countdown,
            4,
            1,
            OutputFormat::TallFrame,
            &filter,
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(CaptureError::OverlayLoad { .. })));
    }
}
