// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the capture pipeline
//!
//! Exercises the compositor, burst sequencer, and animation encoder end to
//! end over the synthetic frame source, without hardware.

use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;
use photomaton::backends::camera::test_pattern::{TestPattern, TestPatternOpener};
use photomaton::backends::camera::types::CameraConstraints;
use photomaton::backends::camera::MediaSource;
use photomaton::constants::DEFAULT_FRAME_INTERVAL;
use photomaton::pipelines::animation;
use photomaton::pipelines::burst;
use photomaton::pipelines::compositor::FrameCompositor;
use photomaton::pipelines::countdown::CountdownTimer;
use photomaton::pipelines::overlay::Overlay;
use photomaton::OutputFormat;
use std::io::Cursor;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

fn open_media(width: u32, height: u32, pattern: TestPattern) -> MediaSource {
    let mut media = MediaSource::new(Box::new(TestPatternOpener::new(pattern)));
    media.open(&CameraConstraints::new(width, height)).unwrap();
    media
}

#[tokio::test]
async fn test_still_dimensions_for_all_formats_and_aspects() {
    let compositor = FrameCompositor::new();

    // Wide, tall, and square sources must all cover every format canvas
    for (src_w, src_h) in [(1280, 720), (480, 640), (500, 500)] {
        let mut media = open_media(src_w, src_h, TestPattern::Gradient);
        let frame = media.handle_mut().unwrap().current_frame().unwrap();

        for format in OutputFormat::ALL {
            let still = compositor
                .compose_still(&frame, format, &Overlay::none())
                .await
                .unwrap();

            let decoded = image::load_from_memory(&still.data).unwrap();
            assert_eq!(
                (decoded.width(), decoded.height()),
                format.canvas_size(),
                "source {}x{} into {:?}",
                src_w,
                src_h,
                format
            );
        }
    }
}

#[tokio::test]
async fn test_cover_fit_leaves_no_letterbox_bars() {
    // A solid magenta source must fill the whole canvas: letterboxing would
    // leave rows or columns of non-source pixels at the borders.
    let mut media = open_media(1280, 720, TestPattern::Solid(255, 0, 255));
    let frame = media.handle_mut().unwrap().current_frame().unwrap();

    let compositor = FrameCompositor::new();
    let still = compositor
        .compose_still(&frame, OutputFormat::TallFrame, &Overlay::none())
        .await
        .unwrap();

    let decoded = image::load_from_memory(&still.data).unwrap().to_rgb8();
    for (x, y) in [
        (0, 0),
        (decoded.width() - 1, 0),
        (0, decoded.height() - 1),
        (decoded.width() - 1, decoded.height() - 1),
        (decoded.width() / 2, decoded.height() / 2),
    ] {
        let pixel = decoded.get_pixel(x, y).0;
        // JPEG is lossy; magenta must still dominate at every corner
        assert!(
            pixel[0] > 200 && pixel[1] < 60 && pixel[2] > 200,
            "pixel at ({}, {}) is {:?}",
            x,
            y,
            pixel
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_burst_to_animation_round_trip() {
    let mut media = open_media(640, 480, TestPattern::ColorBars);
    let (mut countdown, _cues) = CountdownTimer::new();
    let cancel = Arc::new(AtomicBool::new(false));

    let frames = burst::capture_burst(
        media.handle_mut().unwrap(),
        &mut countdown,
        4,
        1,
        OutputFormat::SquareFrame,
        &Overlay::none(),
        &cancel,
    )
    .await
    .unwrap();
    assert_eq!(frames.len(), 4);

    let (width, height) = OutputFormat::SquareFrame.animation_size();
    let encoded = animation::encode(frames, width, height, DEFAULT_FRAME_INTERVAL)
        .await
        .unwrap();

    let decoder = GifDecoder::new(Cursor::new(encoded.data.to_vec())).unwrap();
    let decoded = decoder.into_frames().collect_frames().unwrap();
    assert_eq!(decoded.len(), 4);
    assert_eq!(decoded[0].buffer().dimensions(), (width, height));
}

#[tokio::test]
async fn test_filter_overlay_is_composited_into_the_still() {
    // Build an opaque red overlay on disk, select it as the filter, and
    // check the output pixels took it.
    let dir = std::env::temp_dir().join("photomaton-pipeline-test");
    std::fs::create_dir_all(&dir).unwrap();
    let overlay_path = dir.join("red.png");
    let overlay_image =
        image::RgbaImage::from_pixel(64, 64, image::Rgba([255, 0, 0, 255]));
    overlay_image.save(&overlay_path).unwrap();

    let mut media = open_media(640, 480, TestPattern::Solid(0, 0, 255));
    let frame = media.handle_mut().unwrap().current_frame().unwrap();

    let compositor = FrameCompositor::new();
    let filter = Overlay::new("red", overlay_path.to_string_lossy());
    let still = compositor
        .compose_still(&frame, OutputFormat::SquareFrame, &filter)
        .await
        .unwrap();

    let decoded = image::load_from_memory(&still.data).unwrap().to_rgb8();
    let center = decoded.get_pixel(decoded.width() / 2, decoded.height() / 2).0;
    assert!(center[0] > 200 && center[2] < 60, "center is {:?}", center);

    std::fs::remove_file(&overlay_path).ok();
}

#[test]
fn test_media_source_close_is_idempotent_across_sessions() {
    let mut media = open_media(320, 240, TestPattern::Gradient);

    media.close();
    media.close();
    assert!(!media.is_open());

    // A fresh open after repeated closes still works
    media.open(&CameraConstraints::new(320, 240)).unwrap();
    assert!(media.is_open());
    assert!(media.handle_mut().unwrap().current_frame().is_ok());
}
