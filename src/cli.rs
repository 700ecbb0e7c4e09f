// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for booth operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Taking a single composited photo
//! - Capturing an animated burst

use chrono::Local;
use photomaton::backends::camera::test_pattern::{TestPattern, TestPatternOpener};
use photomaton::backends::camera::types::{CameraConstraints, CameraFrame};
use photomaton::backends::camera::v4l2::{enumerate_devices, V4l2Opener};
use photomaton::backends::camera::{MediaSource, SourceOpener};
use photomaton::constants::{MediaKind, DEFAULT_CAPTURE_SIZE, DEFAULT_FRAME_INTERVAL};
use photomaton::errors::CameraError;
use photomaton::persistence::{HttpPersistence, Persistence};
use photomaton::pipelines::animation;
use photomaton::pipelines::burst;
use photomaton::pipelines::compositor::FrameCompositor;
use photomaton::pipelines::countdown::{CountdownCue, CountdownTimer};
use photomaton::pipelines::overlay::Overlay;
use photomaton::OutputFormat;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let cameras = enumerate_devices();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    for camera in cameras {
        println!("  [{}] {}", camera.index, camera.name);
    }

    Ok(())
}

/// Take one composited photo and write it to disk
pub fn take_photo(
    camera_index: usize,
    format: OutputFormat,
    pattern: bool,
    output: Option<PathBuf>,
    upload: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let mut media = open_source(camera_index, pattern)?;
        let frame = wait_for_frame(&mut media).await?;

        println!(
            "Capture format: {} ({}x{})",
            format.display_name(),
            format.canvas_size().0,
            format.canvas_size().1
        );

        let compositor = FrameCompositor::new();
        let still = compositor
            .compose_still(&frame, format, &Overlay::none())
            .await?;

        let path = resolve_output(output, "photo", "jpg")?;
        tokio::fs::write(&path, &still.data[..]).await?;
        println!("Photo saved: {}", path.display());

        if let Some(base_url) = upload {
            let persistence = HttpPersistence::new(base_url)?;
            let remote = persistence.upload(&still.data, MediaKind::Jpeg).await?;
            println!("Uploaded as: {}", remote);
        }

        media.close();
        Ok(())
    })
}

/// Capture an animated burst and write the GIF to disk
pub fn take_burst(
    camera_index: usize,
    format: OutputFormat,
    frames: usize,
    countdown_seconds: u32,
    pattern: bool,
    output: Option<PathBuf>,
    upload: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let mut media = open_source(camera_index, pattern)?;
        wait_for_frame(&mut media).await?;

        let (mut countdown, cue_rx) = CountdownTimer::new();
        let cancel = Arc::new(AtomicBool::new(false));

        // Echo countdown ticks to the terminal while the burst runs
        let mut cues = cue_rx;
        let printer = tokio::spawn(async move {
            while cues.changed().await.is_ok() {
                match *cues.borrow() {
                    CountdownCue::Tick(n) => println!("  {}...", n),
                    CountdownCue::Flash => println!("  *flash*"),
                    CountdownCue::Idle => {}
                }
            }
        });

        let collected = burst::capture_burst(
            media.handle_mut()?,
            &mut countdown,
            frames,
            countdown_seconds,
            format,
            &Overlay::none(),
            &cancel,
        )
        .await?;

        let (width, height) = format.animation_size();
        let encoded = animation::encode(collected, width, height, DEFAULT_FRAME_INTERVAL).await?;
        printer.abort();

        let path = resolve_output(output, "burst", "gif")?;
        tokio::fs::write(&path, &encoded.data[..]).await?;
        println!(
            "Animation saved: {} ({} frames)",
            path.display(),
            encoded.frame_count
        );

        if let Some(base_url) = upload {
            let persistence = HttpPersistence::new(base_url)?;
            let remote = persistence.upload(&encoded.data, MediaKind::Gif).await?;
            println!("Uploaded as: {}", remote);
        }

        media.close();
        Ok(())
    })
}

/// Open the chosen frame source at the default capture resolution
fn open_source(
    camera_index: usize,
    pattern: bool,
) -> Result<MediaSource, Box<dyn std::error::Error>> {
    let opener: Box<dyn SourceOpener> = if pattern {
        Box::new(TestPatternOpener::new(TestPattern::ColorBars))
    } else {
        Box::new(V4l2Opener::new(camera_index))
    };

    let mut media = MediaSource::new(opener);
    let (width, height) = DEFAULT_CAPTURE_SIZE;
    media.open(&CameraConstraints::new(width, height))?;
    Ok(media)
}

/// Poll until the capture loop delivers its first frame
async fn wait_for_frame(media: &mut MediaSource) -> Result<CameraFrame, CameraError> {
    for _ in 0..100 {
        match media.handle_mut()?.current_frame() {
            Ok(frame) => return Ok(frame),
            Err(CameraError::NoFrameAvailable) => {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Err(e) => return Err(e),
        }
    }
    Err(CameraError::NoFrameAvailable)
}

/// Default output location: ~/Pictures/photomaton/<stem>_TIMESTAMP.<ext>
fn resolve_output(
    output: Option<PathBuf>,
    stem: &str,
    extension: &str,
) -> Result<PathBuf, std::io::Error> {
    if let Some(path) = output {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        return Ok(path);
    }

    let directory = dirs::picture_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photomaton");
    std::fs::create_dir_all(&directory)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    Ok(directory.join(format!("{}_{}.{}", stem, timestamp, extension)))
}
