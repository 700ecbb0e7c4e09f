// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera backend
//!
//! Opens a `/dev/videoN` device via the `v4l` crate, negotiates packed YUYV
//! at the requested size, and runs a capture loop on a dedicated thread that
//! keeps the most recent frame available for synchronous reads.

use super::types::{CameraConstraints, CameraFrame, PixelFormat, SourceDescriptor};
use super::{FrameSource, SourceOpener};
use crate::errors::CameraError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

/// How many mmap buffers to queue on the device
const BUFFER_COUNT: u32 = 4;

/// A camera device visible to the system
#[derive(Debug, Clone)]
pub struct CameraDeviceInfo {
    /// Device index (as in /dev/videoN)
    pub index: usize,
    /// Human-readable device name
    pub name: String,
}

/// List camera devices known to the system
pub fn enumerate_devices() -> Vec<CameraDeviceInfo> {
    v4l::context::enum_devices()
        .into_iter()
        .map(|node| CameraDeviceInfo {
            index: node.index(),
            name: node
                .name()
                .unwrap_or_else(|| format!("/dev/video{}", node.index())),
        })
        .collect()
}

/// Opens [`V4l2Source`] streams on a fixed device index
pub struct V4l2Opener {
    device_index: usize,
}

impl V4l2Opener {
    /// Create an opener for /dev/video`device_index`
    pub fn new(device_index: usize) -> Self {
        Self { device_index }
    }
}

impl SourceOpener for V4l2Opener {
    fn open(&self, constraints: &CameraConstraints) -> Result<Box<dyn FrameSource>, CameraError> {
        let source = V4l2Source::open(self.device_index, constraints)?;
        Ok(Box::new(source))
    }
}

/// Shared state between the capture thread and the handle
#[derive(Default)]
struct SharedFrame {
    latest: Mutex<Option<CameraFrame>>,
    failure: Mutex<Option<String>>,
}

/// A live V4L2 capture stream
pub struct V4l2Source {
    descriptor: SourceDescriptor,
    negotiated: (u32, u32),
    shared: Arc<SharedFrame>,
    stop_signal: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl V4l2Source {
    /// Open the device, negotiate a format, and start the capture loop
    fn open(index: usize, constraints: &CameraConstraints) -> Result<Self, CameraError> {
        let device = Device::new(index)
            .map_err(|e| CameraError::DeviceUnavailable(format!("/dev/video{}: {}", index, e)))?;

        let caps = device
            .query_caps()
            .map_err(|e| CameraError::DeviceUnavailable(e.to_string()))?;
        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            return Err(CameraError::DeviceUnavailable(format!(
                "{} cannot capture video",
                caps.card
            )));
        }

        let mut format = device.format().map_err(|e| CameraError::Stream(e.to_string()))?;
        format.width = constraints.width;
        format.height = constraints.height;
        format.fourcc = FourCC::new(b"YUYV");
        let actual = device
            .set_format(&format)
            .map_err(|e| CameraError::Stream(e.to_string()))?;

        if actual.fourcc != FourCC::new(b"YUYV") {
            return Err(CameraError::InvalidFormat(format!(
                "device negotiated {} instead of YUYV",
                actual.fourcc
            )));
        }

        info!(
            device = %caps.card,
            width = actual.width,
            height = actual.height,
            stride = actual.stride,
            "V4L2 format negotiated"
        );

        let descriptor = SourceDescriptor {
            name: caps.card.clone(),
            driver: caps.driver.clone(),
        };
        let negotiated = (actual.width, actual.height);
        let stride = actual.stride;

        let shared = Arc::new(SharedFrame::default());
        let stop_signal = Arc::new(AtomicBool::new(false));

        let loop_shared = Arc::clone(&shared);
        let loop_stop = Arc::clone(&stop_signal);
        let thread_handle = std::thread::Builder::new()
            .name("v4l2-capture".to_string())
            .spawn(move || {
                capture_loop(device, negotiated, stride, loop_shared, loop_stop);
            })
            .map_err(|e| CameraError::Stream(format!("capture thread: {}", e)))?;

        Ok(Self {
            descriptor,
            negotiated,
            shared,
            stop_signal,
            thread_handle: Some(thread_handle),
        })
    }
}

/// Capture loop body: stream frames until told to stop
fn capture_loop(
    device: Device,
    (width, height): (u32, u32),
    stride: u32,
    shared: Arc<SharedFrame>,
    stop_signal: Arc<AtomicBool>,
) {
    debug!("V4L2 capture loop started");

    let mut stream = match Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "Failed to start V4L2 stream");
            *shared.failure.lock().unwrap() = Some(e.to_string());
            return;
        }
    };

    loop {
        if stop_signal.load(Ordering::SeqCst) {
            break;
        }

        match stream.next() {
            Ok((buffer, _meta)) => {
                let frame = CameraFrame {
                    width,
                    height,
                    data: Arc::from(buffer),
                    format: PixelFormat::Yuyv,
                    stride,
                    captured_at: Instant::now(),
                };
                *shared.latest.lock().unwrap() = Some(frame);
            }
            Err(e) => {
                warn!(error = %e, "V4L2 frame read failed");
                *shared.failure.lock().unwrap() = Some(e.to_string());
                break;
            }
        }
    }

    debug!("V4L2 capture loop exiting");
}

impl FrameSource for V4l2Source {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn negotiated_size(&self) -> (u32, u32) {
        self.negotiated
    }

    fn read_frame(&mut self) -> Result<CameraFrame, CameraError> {
        if let Some(reason) = self.shared.failure.lock().unwrap().clone() {
            return Err(CameraError::Stream(reason));
        }
        self.shared
            .latest
            .lock()
            .unwrap()
            .clone()
            .ok_or(CameraError::NoFrameAvailable)
    }

    fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!("V4L2 capture thread panicked during shutdown");
            }
        }
    }
}

impl Drop for V4l2Source {
    fn drop(&mut self) {
        self.stop();
    }
}
