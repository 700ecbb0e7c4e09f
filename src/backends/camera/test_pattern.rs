// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic frame source for tests and hardware-free operation
//!
//! Generates deterministic RGBA frames without touching any device. Used by
//! the test suite and by the CLI `--pattern` mode.

use super::types::{CameraConstraints, CameraFrame, PixelFormat, SourceDescriptor};
use super::{FrameSource, SourceOpener};
use crate::errors::CameraError;
use std::sync::Arc;
use std::time::Instant;

/// Test pattern variants
#[derive(Debug, Clone, Copy)]
pub enum TestPattern {
    /// Eight vertical color bars
    ColorBars,
    /// Horizontal gradient from dark to light
    Gradient,
    /// Solid color
    Solid(u8, u8, u8),
}

/// Opens [`TestPatternSource`] streams
pub struct TestPatternOpener {
    pattern: TestPattern,
}

impl TestPatternOpener {
    /// Create an opener producing the given pattern
    pub fn new(pattern: TestPattern) -> Self {
        Self { pattern }
    }
}

impl SourceOpener for TestPatternOpener {
    fn open(&self, constraints: &CameraConstraints) -> Result<Box<dyn FrameSource>, CameraError> {
        Ok(Box::new(TestPatternSource::new(
            constraints.width,
            constraints.height,
            self.pattern,
        )))
    }
}

/// A frame source that synthesizes frames on demand
pub struct TestPatternSource {
    descriptor: SourceDescriptor,
    width: u32,
    height: u32,
    pattern: TestPattern,
    frame_count: u32,
    stopped: bool,
}

impl TestPatternSource {
    /// Create a source at the given resolution
    pub fn new(width: u32, height: u32, pattern: TestPattern) -> Self {
        Self {
            descriptor: SourceDescriptor {
                name: "Test pattern".to_string(),
                driver: "synthetic".to_string(),
            },
            width,
            height,
            pattern,
            frame_count: 0,
            stopped: false,
        }
    }

    /// Number of frames read so far
    pub fn frames_read(&self) -> u32 {
        self.frame_count
    }
}

impl FrameSource for TestPatternSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn negotiated_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_frame(&mut self) -> Result<CameraFrame, CameraError> {
        if self.stopped {
            return Err(CameraError::Stream("source stopped".to_string()));
        }

        let data = generate_pattern(self.width, self.height, self.pattern);
        self.frame_count += 1;

        Ok(CameraFrame {
            width: self.width,
            height: self.height,
            data: Arc::from(data.as_slice()),
            format: PixelFormat::Rgba,
            stride: self.width * 4,
            captured_at: Instant::now(),
        })
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

/// Generate RGBA pattern data
fn generate_pattern(width: u32, height: u32, pattern: TestPattern) -> Vec<u8> {
    let mut data = Vec::with_capacity((width * height * 4) as usize);

    match pattern {
        TestPattern::ColorBars => {
            // White, yellow, cyan, green, magenta, red, blue, black
            let bars: [(u8, u8, u8); 8] = [
                (255, 255, 255),
                (255, 255, 0),
                (0, 255, 255),
                (0, 255, 0),
                (255, 0, 255),
                (255, 0, 0),
                (0, 0, 255),
                (0, 0, 0),
            ];
            let bar_width = (width / 8).max(1);
            for _y in 0..height {
                for x in 0..width {
                    let (r, g, b) = bars[((x / bar_width) as usize).min(7)];
                    data.extend_from_slice(&[r, g, b, 255]);
                }
            }
        }
        TestPattern::Gradient => {
            for _y in 0..height {
                for x in 0..width {
                    let v = ((x as u64 * 255) / width.max(1) as u64) as u8;
                    data.extend_from_slice(&[v, v, v, 255]);
                }
            }
        }
        TestPattern::Solid(r, g, b) => {
            for _ in 0..(width * height) {
                data.extend_from_slice(&[r, g, b, 255]);
            }
        }
    }

    data
}
