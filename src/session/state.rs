// SPDX-License-Identifier: GPL-3.0-only

//! Session state
//!
//! One customer interaction is a [`Session`] value driven through the
//! [`Phase`] state machine. Everything a display layer needs to know
//! (menu visible, review controls visible, ...) is derived from `Phase`
//! rather than stored as independent flags, so impossible combinations
//! cannot be represented.

use crate::constants::{clamp_print_copies, CaptureMode, MediaKind, OutputFormat};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// The session state machine's discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Camera open, selection menu visible, nothing captured
    #[default]
    Idle,
    /// Countdown cues running; menu hidden
    CountingDown,
    /// Compositing or burst encoding in progress
    Capturing,
    /// Capture on screen with accept/reject controls
    Reviewing,
    /// Upload to the backend in flight
    Saving,
    /// Capture persisted; print/email/handoff controls available
    Saved,
    /// Email side effect in flight
    EmailSending,
    /// Print side effect in flight
    Printing,
}

impl Phase {
    /// Name for logs and invalid-transition errors
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::CountingDown => "CountingDown",
            Phase::Capturing => "Capturing",
            Phase::Reviewing => "Reviewing",
            Phase::Saving => "Saving",
            Phase::Saved => "Saved",
            Phase::EmailSending => "EmailSending",
            Phase::Printing => "Printing",
        }
    }

    /// The format/filter/mode menu is shown only while idle
    pub fn menu_visible(&self) -> bool {
        matches!(self, Phase::Idle)
    }

    /// Countdown cues are rendered in these phases
    pub fn countdown_visible(&self) -> bool {
        matches!(self, Phase::CountingDown | Phase::Capturing)
    }

    /// Accept/reject controls are shown while reviewing
    pub fn review_visible(&self) -> bool {
        matches!(self, Phase::Reviewing)
    }

    /// Print/email/handoff controls are shown once saved
    pub fn saving_options_visible(&self) -> bool {
        matches!(self, Phase::Saved | Phase::EmailSending | Phase::Printing)
    }

    /// Phases in which a captured blob must be present
    pub fn holds_capture(&self) -> bool {
        matches!(
            self,
            Phase::Reviewing | Phase::Saving | Phase::Saved | Phase::EmailSending | Phase::Printing
        )
    }
}

/// Preview buffer for an encoded capture, the object-URL analog.
///
/// Owned by the session controller and revoked exactly once, when the
/// capture is superseded or on teardown. Reads after revocation yield
/// nothing rather than stale pixels.
#[derive(Debug, Clone)]
pub struct PreviewImage {
    id: Uuid,
    bytes: Option<Arc<[u8]>>,
}

impl PreviewImage {
    /// Derive a preview from encoded bytes
    pub fn new(bytes: Arc<[u8]>) -> Self {
        Self {
            id: Uuid::new_v4(),
            bytes: Some(bytes),
        }
    }

    /// Stable identifier, usable as a display-layer cache key
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The preview bytes, until revoked
    pub fn bytes(&self) -> Option<&Arc<[u8]>> {
        self.bytes.as_ref()
    }

    /// Release the preview buffer. Returns true on the first call.
    pub fn revoke(&mut self) -> bool {
        let released = self.bytes.take().is_some();
        if released {
            debug!(preview = %self.id, "Preview revoked");
        }
        released
    }

    /// True once the buffer has been released
    pub fn is_revoked(&self) -> bool {
        self.bytes.is_none()
    }
}

/// An encoded capture held by the session between review and teardown
#[derive(Debug, Clone)]
pub struct CapturedMedia {
    /// Encoded blob (JPEG or GIF bytes)
    pub data: Arc<[u8]>,
    /// Blob encoding
    pub kind: MediaKind,
    /// Raster width
    pub width: u32,
    /// Raster height
    pub height: u32,
    /// Preview handle derived from the blob
    pub preview: PreviewImage,
}

impl CapturedMedia {
    /// Wrap an encoded blob, deriving its preview
    pub fn new(data: Arc<[u8]>, kind: MediaKind, width: u32, height: u32) -> Self {
        let preview = PreviewImage::new(Arc::clone(&data));
        Self {
            data,
            kind,
            width,
            height,
            preview,
        }
    }
}

/// The live, mutable state of one customer interaction
#[derive(Debug)]
pub struct Session {
    /// Unique id of this interaction
    pub id: Uuid,
    /// Still or burst capture
    pub mode: CaptureMode,
    /// Active output format
    pub format: OutputFormat,
    /// Selected filter index into the current format's filter catalog
    pub filter_index: usize,
    /// Selected frame index into the current format's frame catalog
    pub frame_index: usize,
    /// Encoded capture, present only in the reviewing/saving phases
    pub captured: Option<CapturedMedia>,
    /// Server-side reference path returned by the upload
    pub photo_path: Option<String>,
    /// Print copy count, always within [1, 6]
    pub print_copies: u32,
    /// State machine discriminant
    pub phase: Phase,
    /// Stale-result guard: bumped on every cancel/reset
    pub generation: u64,
}

impl Session {
    /// Fresh session in the given mode and format
    pub fn new(mode: CaptureMode, format: OutputFormat, filter_index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode,
            format,
            filter_index,
            frame_index: 0,
            captured: None,
            photo_path: None,
            print_copies: 1,
            phase: Phase::Idle,
            generation: 0,
        }
    }

    /// Set the print copy count, clamping into the allowed range
    pub fn set_print_copies(&mut self, requested: i64) {
        self.print_copies = clamp_print_copies(requested);
    }

    /// Release the capture and its preview, if any. The preview is revoked
    /// exactly once, here.
    pub fn release_capture(&mut self) {
        if let Some(mut captured) = self.captured.take() {
            captured.preview.revoke();
        }
    }

    /// Reset all per-capture fields and bump the generation guard.
    /// The camera handle is managed by the controller, not here.
    pub fn reset(&mut self) {
        self.release_capture();
        self.photo_path = None;
        self.print_copies = 1;
        self.phase = Phase::Idle;
        self.generation += 1;
    }
}
