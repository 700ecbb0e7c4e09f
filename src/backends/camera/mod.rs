// SPDX-License-Identifier: GPL-3.0-only

//! Camera frame source abstraction
//!
//! The session controller never touches a device directly: it goes through
//! [`MediaSource`], which owns at most one live [`MediaHandle`] at a time
//! and guarantees the previous handle is released before a new one is
//! acquired.

pub mod test_pattern;
pub mod types;
pub mod v4l2;

use crate::constants::PROBE_SIZE;
use crate::errors::CameraError;
use tracing::{debug, info};
use types::{CameraConstraints, CameraFrame, SourceDescriptor};

/// A live stream of camera frames
///
/// Implementations deliver the most recent frame synchronously and must
/// make `stop` idempotent.
pub trait FrameSource: Send {
    /// Identity of the underlying device, for logging
    fn descriptor(&self) -> &SourceDescriptor;

    /// The resolution the device actually negotiated
    fn negotiated_size(&self) -> (u32, u32);

    /// Latest available frame.
    ///
    /// Returns [`CameraError::NoFrameAvailable`] until the source has
    /// produced its first frame.
    fn read_frame(&mut self) -> Result<CameraFrame, CameraError>;

    /// Stop the source and release the device. Idempotent.
    fn stop(&mut self);
}

/// Opens frame sources for given constraints
///
/// The seam between the session controller and concrete camera backends;
/// tests plug in the synthetic pattern source here.
pub trait SourceOpener: Send {
    /// Acquire a stream matching the constraints as closely as the device
    /// allows. Fails with [`CameraError::DeviceUnavailable`] when no device
    /// matches or access is denied; the caller must not retry automatically.
    fn open(&self, constraints: &CameraConstraints) -> Result<Box<dyn FrameSource>, CameraError>;
}

/// A live handle to an open camera stream
///
/// Every code path that opens a handle pairs with a close; `Drop` is the
/// backstop for abnormal teardown.
pub struct MediaHandle {
    source: Box<dyn FrameSource>,
    closed: bool,
}

impl MediaHandle {
    fn new(source: Box<dyn FrameSource>) -> Self {
        Self {
            source,
            closed: false,
        }
    }

    /// Latest frame from the stream
    pub fn current_frame(&mut self) -> Result<CameraFrame, CameraError> {
        if self.closed {
            return Err(CameraError::Stream("handle is closed".to_string()));
        }
        self.source.read_frame()
    }

    /// The resolution the device actually negotiated
    pub fn negotiated_size(&self) -> (u32, u32) {
        self.source.negotiated_size()
    }

    /// Stop all underlying capture resources. Idempotent: closing an
    /// already-closed handle is a no-op and never fails.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.source.stop();
        debug!(device = %self.source.descriptor().name, "Media handle closed");
    }

    /// True once `close` has run
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for MediaHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Owner of the camera device on behalf of the active session
pub struct MediaSource {
    opener: Box<dyn SourceOpener>,
    active: Option<MediaHandle>,
}

impl MediaSource {
    /// Create a media source over a backend opener
    pub fn new(opener: Box<dyn SourceOpener>) -> Self {
        Self {
            opener,
            active: None,
        }
    }

    /// Open a stream at the requested constraints.
    ///
    /// Any previously open handle is released first, so at most one handle
    /// is ever live.
    pub fn open(&mut self, constraints: &CameraConstraints) -> Result<(), CameraError> {
        self.close();

        let source = self.opener.open(constraints)?;
        let (width, height) = source.negotiated_size();
        info!(
            device = %source.descriptor().name,
            requested_width = constraints.width,
            requested_height = constraints.height,
            width,
            height,
            "Camera stream opened"
        );
        self.active = Some(MediaHandle::new(source));
        Ok(())
    }

    /// Two-phase open: acquire a small probe stream first so access errors
    /// (and, on desktop backends, the permission prompt) surface quickly,
    /// then reopen at the full target resolution.
    pub fn open_probed(&mut self, constraints: &CameraConstraints) -> Result<(), CameraError> {
        let probe = CameraConstraints {
            width: PROBE_SIZE.0,
            height: PROBE_SIZE.1,
            facing: constraints.facing,
        };
        self.open(&probe)?;
        self.open(constraints)
    }

    /// Release the active handle, if any. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut handle) = self.active.take() {
            handle.close();
        }
    }

    /// True while a stream is open
    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// The active handle, for frame reads
    pub fn handle_mut(&mut self) -> Result<&mut MediaHandle, CameraError> {
        self.active
            .as_mut()
            .ok_or_else(|| CameraError::Stream("no open media handle".to_string()))
    }
}

impl Drop for MediaSource {
    fn drop(&mut self) {
        self.close();
    }
}
