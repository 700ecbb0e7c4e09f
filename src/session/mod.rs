// SPDX-License-Identifier: GPL-3.0-only

//! Capture session controller
//!
//! The top-level state machine for one customer interaction:
//!
//! ```text
//! Idle -> CountingDown -> Capturing -> Reviewing
//!   -> (reject) Idle
//!   -> (accept) Saving -> Saved -> {EmailSending | Printing}
//! ```
//!
//! Every asynchronous step is chained strictly sequentially behind
//! `&mut self`; the controller never issues two mutating operations
//! concurrently against the same session. Cancellation flips a shared flag
//! that the pipeline observes at each suspension point, and results are
//! committed only when the generation recorded at trigger time still
//! matches.

pub mod state;

use crate::backends::camera::types::CameraConstraints;
use crate::backends::camera::{MediaSource, SourceOpener};
use crate::config::DeploymentConfig;
use crate::constants::{CaptureMode, MediaKind, OutputFormat};
use crate::errors::{BoothError, BoothResult, CaptureError, SessionError};
use crate::persistence::{self, Persistence, CODE_PRINT_MESSAGE};
use crate::pipelines::animation;
use crate::pipelines::burst;
use crate::pipelines::compositor::FrameCompositor;
use crate::pipelines::countdown::{CountdownCue, CountdownTimer};
use crate::pipelines::overlay::Overlay;
use crate::pipelines::qr::QrScanner;
use state::{CapturedMedia, Phase, Session};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Handle for cancelling in-flight pipeline work from outside the
/// controller (the kiosk's RETOUR button). Fetch a fresh handle per capture:
/// the controller replaces the underlying flag on every reset, so handles
/// from earlier rounds cannot cancel newer work.
#[derive(Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Request cancellation of the associated capture round
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// The capture session controller
pub struct CaptureSession<P: Persistence> {
    config: DeploymentConfig,
    media: MediaSource,
    countdown: CountdownTimer,
    cue_rx: watch::Receiver<CountdownCue>,
    compositor: FrameCompositor,
    scanner: QrScanner,
    persistence: P,
    session: Session,
    cancel_flag: Arc<AtomicBool>,
    banner: Option<String>,
    print_error: Option<String>,
}

impl<P: Persistence> CaptureSession<P> {
    /// Create a session and open the camera (the Idle entry action).
    ///
    /// A `DeviceUnavailable` failure here is fatal to session start; the
    /// caller presents a retry path and calls `start` again.
    pub fn start(
        config: DeploymentConfig,
        opener: Box<dyn SourceOpener>,
        persistence: P,
    ) -> BoothResult<Self> {
        config.validate()?;

        let catalog = config.catalogs.for_format(config.default_format);
        let session = Session::new(
            config.default_mode,
            config.default_format,
            catalog.default_filter,
        );

        let (countdown, cue_rx) = CountdownTimer::new();

        let mut controller = Self {
            media: MediaSource::new(opener),
            countdown,
            cue_rx,
            compositor: FrameCompositor::new(),
            scanner: QrScanner::new(),
            persistence,
            session,
            cancel_flag: Arc::new(AtomicBool::new(false)),
            banner: None,
            print_error: None,
            config,
        };
        controller.open_media()?;

        info!(session = %controller.session.id, "Capture session started");
        Ok(controller)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current state machine phase
    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    /// The live session state
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Dismissible error banner, if one is showing
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Dismiss the error banner
    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    /// Unacknowledged print error; reprinting is blocked while this is set
    pub fn print_error(&self) -> Option<&str> {
        self.print_error.as_deref()
    }

    /// Acknowledge the print error, unblocking the print controls
    pub fn acknowledge_print_error(&mut self) {
        self.print_error = None;
    }

    /// Countdown cues for the display layer
    pub fn countdown_cues(&self) -> watch::Receiver<CountdownCue> {
        self.cue_rx.clone()
    }

    /// Cancellation handle for the current capture round
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancel_flag),
        }
    }

    /// True while the camera stream is open
    pub fn camera_open(&self) -> bool {
        self.media.is_open()
    }

    /// The filter overlay currently selected for the active format
    pub fn current_filter(&self) -> Overlay {
        self.config
            .catalogs
            .for_format(self.session.format)
            .filters
            .get(self.session.filter_index)
    }

    /// The frame overlay currently selected for the active format
    pub fn current_frame_overlay(&self) -> Overlay {
        self.config
            .catalogs
            .for_format(self.session.format)
            .frames
            .get(self.session.frame_index)
    }

    // =========================================================================
    // Menu operations (Idle only)
    // =========================================================================

    /// Switch capture mode
    pub fn set_mode(&mut self, mode: CaptureMode) -> BoothResult<()> {
        self.require_phase(Phase::Idle, "set_mode")?;
        self.session.mode = mode;
        Ok(())
    }

    /// Switch output format.
    ///
    /// Resets the filter selection to the new format's default and the frame
    /// selection to zero, and forces a camera reopen: downstream canvas
    /// geometry depends on the format.
    pub fn set_format(&mut self, format: OutputFormat) -> BoothResult<()> {
        self.require_phase(Phase::Idle, "set_format")?;
        if self.session.format == format {
            return Ok(());
        }

        info!(format = format.display_name(), "Switching output format");
        self.session.format = format;
        self.session.filter_index = self.config.catalogs.for_format(format).default_filter;
        self.session.frame_index = 0;
        self.open_media()?;
        Ok(())
    }

    /// Select a filter by index, with wraparound. Selecting the already
    /// selected entry toggles the selection off (back to index 0, none).
    pub fn select_filter(&mut self, index: i64) -> BoothResult<()> {
        self.require_phase(Phase::Idle, "select_filter")?;
        let catalog = &self.config.catalogs.for_format(self.session.format).filters;
        let wrapped = catalog.wrap(index);
        self.session.filter_index = if wrapped == self.session.filter_index {
            0
        } else {
            wrapped
        };
        Ok(())
    }

    /// Select a decorative frame by index, with wraparound and toggle-off
    pub fn select_frame(&mut self, index: i64) -> BoothResult<()> {
        self.require_phase(Phase::Idle, "select_frame")?;
        let catalog = &self.config.catalogs.for_format(self.session.format).frames;
        let wrapped = catalog.wrap(index);
        self.session.frame_index = if wrapped == self.session.frame_index {
            0
        } else {
            wrapped
        };
        Ok(())
    }

    /// Set the print copy count. Out-of-range values are clamped.
    pub fn set_print_copies(&mut self, copies: i64) {
        self.session.set_print_copies(copies);
    }

    // =========================================================================
    // Capture
    // =========================================================================

    /// Run one full capture round: countdown(s), grab, composite/encode.
    ///
    /// On success the session moves to Reviewing with the capture attached.
    /// On failure (or cancellation) everything is torn down, the camera is
    /// reopened, and the session is back in Idle; the error is logged and
    /// returned for the embedding shell to decide what to show.
    pub async fn trigger_capture(&mut self) -> BoothResult<()> {
        self.require_phase(Phase::Idle, "trigger_capture")?;

        let generation = self.session.generation;
        let cancel = Arc::clone(&self.cancel_flag);
        self.session.phase = Phase::CountingDown;

        let result = match self.session.mode {
            CaptureMode::Still => self.run_still(&cancel).await,
            CaptureMode::Burst => self.run_burst(&cancel).await,
        };

        match result {
            Ok(captured) => {
                if cancel.load(Ordering::SeqCst) {
                    // Cancelled after the last pipeline checkpoint: the
                    // resolution is ignored, not committed.
                    debug!("Discarding capture result of a cancelled round");
                    self.reset_to_idle()?;
                    return Ok(());
                }
                if self.session.generation != generation {
                    debug!("Discarding stale capture result");
                    return Ok(());
                }
                info!(
                    kind = ?captured.kind,
                    width = captured.width,
                    height = captured.height,
                    "Capture ready for review"
                );
                self.session.captured = Some(captured);
                self.session.phase = Phase::Reviewing;
                Ok(())
            }
            Err(CaptureError::Cancelled) => {
                info!("Capture cancelled");
                self.reset_to_idle()?;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Capture failed");
                self.reset_to_idle()?;
                Err(e.into())
            }
        }
    }

    /// One countdown, one frame, one composite
    async fn run_still(&mut self, cancel: &Arc<AtomicBool>) -> Result<CapturedMedia, CaptureError> {
        let filter = self.current_filter();
        let seconds = self.config.countdown_seconds;

        self.countdown.run(seconds, cancel).await?;
        self.session.phase = Phase::Capturing;

        let frame = self
            .media
            .handle_mut()
            .and_then(|handle| handle.current_frame())?;

        let still = self
            .compositor
            .compose_still(&frame, self.session.format, &filter)
            .await?;

        Ok(CapturedMedia::new(
            still.data,
            MediaKind::Jpeg,
            still.width,
            still.height,
        ))
    }

    /// N countdown+grab rounds, then one animation encode
    async fn run_burst(&mut self, cancel: &Arc<AtomicBool>) -> Result<CapturedMedia, CaptureError> {
        let filter = self.current_filter();
        let format = self.session.format;
        let frame_count = self.config.burst_frames;
        let per_frame_seconds = self.config.burst_countdown_seconds;
        let frame_interval = Duration::from_millis(self.config.frame_interval_ms);

        let handle = self
            .media
            .handle_mut()
            .map_err(CaptureError::Camera)?;
        let frames = burst::capture_burst(
            handle,
            &mut self.countdown,
            frame_count,
            per_frame_seconds,
            format,
            &filter,
            cancel,
        )
        .await?;

        self.session.phase = Phase::Capturing;

        let (width, height) = format.animation_size();
        let encoded = animation::encode(frames, width, height, frame_interval).await?;

        Ok(CapturedMedia::new(
            encoded.data,
            MediaKind::Gif,
            encoded.width,
            encoded.height,
        ))
    }

    // =========================================================================
    // Review
    // =========================================================================

    /// Keep the capture: upload it and move to Saved.
    ///
    /// Upload failure leaves the session in Reviewing with a dismissible
    /// banner; a later accept retries the upload.
    pub async fn accept(&mut self) -> BoothResult<()> {
        self.require_phase(Phase::Reviewing, "accept")?;

        let (data, kind) = match self.session.captured.as_ref() {
            Some(captured) => (Arc::clone(&captured.data), captured.kind),
            None => {
                return Err(SessionError::InvalidTransition {
                    phase: "Reviewing",
                    operation: "accept without capture",
                }
                .into());
            }
        };

        self.session.phase = Phase::Saving;
        match self.persistence.upload(&data, kind).await {
            Ok(path) => {
                info!(path = %path, "Capture saved");
                self.session.photo_path = Some(path);
                self.session.phase = Phase::Saved;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Upload failed; staying in review");
                self.banner = Some(e.to_string());
                self.session.phase = Phase::Reviewing;
                Err(e.into())
            }
        }
    }

    /// Discard the capture and return to Idle with a fresh camera stream
    pub async fn reject(&mut self) -> BoothResult<()> {
        self.require_phase(Phase::Reviewing, "reject")?;
        info!("Capture rejected");
        self.reset_to_idle()
    }

    /// Cancel from any non-Idle state: full resource teardown, then Idle.
    /// In Idle this is a no-op.
    pub fn cancel(&mut self) -> BoothResult<()> {
        if self.session.phase == Phase::Idle {
            return Ok(());
        }
        info!(phase = self.session.phase.name(), "Session cancelled");
        self.reset_to_idle()
    }

    // =========================================================================
    // Saved-state side effects
    // =========================================================================

    /// Email the saved photo. On success the interaction is complete and the
    /// session returns to Idle; on failure a banner is raised and the
    /// session stays in Saved (the photo is already stored).
    pub async fn send_email(&mut self, email: &str) -> BoothResult<()> {
        self.require_phase(Phase::Saved, "send_email")?;
        if !self.config.enable_email {
            return Err(BoothError::Config("email is disabled for this kiosk".into()));
        }

        let Some(path) = self.session.photo_path.clone() else {
            return Err(SessionError::InvalidTransition {
                phase: "Saved",
                operation: "send_email without saved path",
            }
            .into());
        };

        self.session.phase = Phase::EmailSending;
        match self.persistence.send_email(&path, email).await {
            Ok(()) => {
                info!("Email sent; session complete");
                self.reset_to_idle()
            }
            Err(e) => {
                warn!(error = %e, "Email failed");
                self.banner = Some(e.to_string());
                self.session.phase = Phase::Saved;
                Err(e.into())
            }
        }
    }

    /// Print the saved photo. Fire-and-forget relative to the state machine:
    /// the session returns to Saved either way, but a failure blocks further
    /// prints until acknowledged.
    pub async fn print(&mut self) -> BoothResult<()> {
        self.require_phase(Phase::Saved, "print")?;
        if !self.config.enable_print {
            return Err(BoothError::Config("printing is disabled for this kiosk".into()));
        }
        if self.print_error.is_some() {
            return Err(SessionError::InvalidTransition {
                phase: "Saved",
                operation: "print before error acknowledged",
            }
            .into());
        }

        let Some(path) = self.session.photo_path.clone() else {
            return Err(SessionError::InvalidTransition {
                phase: "Saved",
                operation: "print without saved path",
            }
            .into());
        };
        let frame_overlay = self.current_frame_overlay();
        let frame_name = if frame_overlay.is_none() {
            String::new()
        } else {
            frame_overlay.name
        };
        let job = persistence::print_job(
            &path,
            self.session.print_copies,
            self.session.format,
            &frame_name,
        );

        self.session.phase = Phase::Printing;
        let result = self.persistence.print(&job).await;
        self.session.phase = Phase::Saved;

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Print failed");
                self.banner = Some(e.to_string());
                self.print_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Validate a retrieval code with the backend; the `IMPRESSION` answer
    /// triggers a print of the saved photo.
    pub async fn submit_code(&mut self, code: &str) -> BoothResult<String> {
        self.require_phase(Phase::Saved, "submit_code")?;
        if !self.config.enable_qr_handoff {
            return Err(BoothError::Config(
                "QR handoff is disabled for this kiosk".into(),
            ));
        }

        let message = self.persistence.check_code(code).await?;
        if message == CODE_PRINT_MESSAGE {
            self.print().await?;
        }
        Ok(message)
    }

    /// Scan the current camera frame for a retrieval code
    pub async fn scan_retrieval_code(&mut self) -> BoothResult<Option<String>> {
        let frame = self
            .media
            .handle_mut()
            .and_then(|handle| handle.current_frame())?;
        Ok(self.scanner.scan(frame).await)
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Destroy the session: release the camera and every capture buffer.
    /// Called when the capture screen unmounts; the camera is not reopened.
    pub fn shutdown(&mut self) {
        info!(session = %self.session.id, "Capture session shutting down");
        self.cancel_flag.store(true, Ordering::SeqCst);
        self.session.reset();
        self.banner = None;
        self.print_error = None;
        self.media.close();
    }

    /// Full reset back to Idle: invalidate in-flight work, release the
    /// capture, and restart the camera stream (the Idle entry action).
    fn reset_to_idle(&mut self) -> BoothResult<()> {
        // Flip the old flag so in-flight work bails, then install a fresh
        // one for the next round.
        self.cancel_flag.store(true, Ordering::SeqCst);
        self.cancel_flag = Arc::new(AtomicBool::new(false));

        self.session.reset();
        self.banner = None;
        self.print_error = None;
        self.open_media()?;
        Ok(())
    }

    /// Open (or reopen) the camera at the configured constraints
    fn open_media(&mut self) -> BoothResult<()> {
        let (width, height) = self.config.capture_size;
        let constraints = CameraConstraints::new(width, height);
        if self.config.probe_open {
            self.media.open_probed(&constraints)?;
        } else {
            self.media.open(&constraints)?;
        }
        Ok(())
    }

    fn require_phase(&self, expected: Phase, operation: &'static str) -> BoothResult<()> {
        if self.session.phase != expected {
            return Err(SessionError::InvalidTransition {
                phase: self.session.phase.name(),
                operation,
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::test_pattern::{TestPattern, TestPatternOpener};
    use crate::errors::PersistenceError;
    use crate::persistence::PrintJob;
    use image::codecs::gif::GifDecoder;
    use image::AnimationDecoder;
    use std::io::Cursor;
    use std::sync::Mutex;

    /// In-memory persistence with scriptable failures
    #[derive(Clone, Default)]
    struct ScriptedPersistence {
        fail_upload: Arc<AtomicBool>,
        fail_print: Arc<AtomicBool>,
        uploads: Arc<Mutex<Vec<(usize, MediaKind)>>>,
        emails: Arc<Mutex<Vec<(String, String)>>>,
        prints: Arc<Mutex<Vec<PrintJob>>>,
        code_message: Arc<Mutex<String>>,
    }

    impl Persistence for ScriptedPersistence {
        async fn upload(&self, data: &[u8], kind: MediaKind) -> Result<String, PersistenceError> {
            if self.fail_upload.load(Ordering::SeqCst) {
                return Err(PersistenceError::Network("connection refused".into()));
            }
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push((data.len(), kind));
            Ok(format!("saved/photo_{}.jpg", uploads.len()))
        }

        async fn send_email(&self, file_path: &str, email: &str) -> Result<(), PersistenceError> {
            self.emails
                .lock()
                .unwrap()
                .push((file_path.to_string(), email.to_string()));
            Ok(())
        }

        async fn print(&self, job: &PrintJob) -> Result<(), PersistenceError> {
            if self.fail_print.load(Ordering::SeqCst) {
                return Err(PersistenceError::Rejected {
                    status: 500,
                    message: "out of paper".into(),
                });
            }
            self.prints.lock().unwrap().push(job.clone());
            Ok(())
        }

        async fn check_code(&self, _code: &str) -> Result<String, PersistenceError> {
            Ok(self.code_message.lock().unwrap().clone())
        }
    }

    fn test_config() -> DeploymentConfig {
        DeploymentConfig {
            capture_size: (640, 480),
            countdown_seconds: 1,
            burst_frames: 4,
            burst_countdown_seconds: 1,
            enable_qr_handoff: true,
            ..DeploymentConfig::default()
        }
    }

    fn booth(config: DeploymentConfig) -> (CaptureSession<ScriptedPersistence>, ScriptedPersistence)
    {
        let scripted = ScriptedPersistence::default();
        let controller = CaptureSession::start(
            config,
            Box::new(TestPatternOpener::new(TestPattern::Gradient)),
            scripted.clone(),
        )
        .unwrap();
        (controller, scripted)
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_still_capture_reaches_review() {
        // Format=Landscape, filter=none, mode=Still: one blob of the
        // landscape canvas size, phase Reviewing.
        let (mut booth, _) = booth(test_config());
        assert_eq!(booth.phase(), Phase::Idle);
        assert!(booth.phase().menu_visible());

        booth.trigger_capture().await.unwrap();

        assert_eq!(booth.phase(), Phase::Reviewing);
        let captured = booth.session().captured.as_ref().unwrap();
        assert_eq!(captured.kind, MediaKind::Jpeg);
        assert_eq!(
            (captured.width, captured.height),
            OutputFormat::Landscape.canvas_size()
        );
        assert!(!captured.preview.is_revoked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_burst_encodes_exactly_n_frames() {
        let mut config = test_config();
        config.default_mode = CaptureMode::Burst;
        let (mut booth, _) = booth(config);

        booth.trigger_capture().await.unwrap();

        assert_eq!(booth.phase(), Phase::Reviewing);
        let captured = booth.session().captured.as_ref().unwrap();
        assert_eq!(captured.kind, MediaKind::Gif);
        assert_eq!(
            (captured.width, captured.height),
            OutputFormat::Landscape.animation_size()
        );

        let decoder = GifDecoder::new(Cursor::new(captured.data.to_vec())).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_reject_returns_to_idle_with_fresh_camera() {
        let (mut booth, _) = booth(test_config());
        booth.trigger_capture().await.unwrap();
        assert_eq!(booth.phase(), Phase::Reviewing);

        booth.reject().await.unwrap();

        assert_eq!(booth.phase(), Phase::Idle);
        assert!(booth.session().captured.is_none());
        assert!(booth.camera_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_upload_failure_keeps_reviewing_and_retry_succeeds() {
        let (mut booth, scripted) = booth(test_config());
        booth.trigger_capture().await.unwrap();

        scripted.fail_upload.store(true, Ordering::SeqCst);
        let result = booth.accept().await;
        assert!(result.is_err());
        assert_eq!(booth.phase(), Phase::Reviewing);
        assert!(booth.session().photo_path.is_none());
        assert!(booth.banner().is_some());

        // Connectivity restored: accepting again succeeds
        scripted.fail_upload.store(false, Ordering::SeqCst);
        booth.accept().await.unwrap();
        assert_eq!(booth.phase(), Phase::Saved);
        assert!(booth.session().photo_path.is_some());
        assert_eq!(scripted.uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_format_switch_resets_filter_and_reopens_camera() {
        let mut config = test_config();
        config.catalogs.square_frame.default_filter = 1;
        let (mut booth, _) = booth(config);

        booth.select_filter(2).unwrap();
        assert_eq!(booth.session().filter_index, 2);

        booth.set_format(OutputFormat::SquareFrame).unwrap();

        assert_eq!(booth.session().format, OutputFormat::SquareFrame);
        assert_eq!(booth.session().filter_index, 1);
        assert_eq!(booth.session().frame_index, 0);
        assert!(booth.camera_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_reselection_toggles_off() {
        let (mut booth, _) = booth(test_config());

        booth.select_filter(2).unwrap();
        assert_eq!(booth.session().filter_index, 2);

        booth.select_filter(2).unwrap();
        assert_eq!(booth.session().filter_index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_wraparound_selection() {
        let (mut booth, _) = booth(test_config());
        let len = booth
            .config
            .catalogs
            .for_format(OutputFormat::Landscape)
            .filters
            .len();

        booth.select_filter(-1).unwrap();
        assert_eq!(booth.session().filter_index, len - 1);

        booth.select_filter(len as i64).unwrap();
        assert_eq!(booth.session().filter_index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pre_cancelled_capture_lands_back_in_idle() {
        let (mut booth, _) = booth(test_config());

        booth.cancel_handle().cancel();
        booth.trigger_capture().await.unwrap();

        assert_eq!(booth.phase(), Phase::Idle);
        assert!(booth.session().captured.is_none());
        assert!(booth.camera_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlay_failure_aborts_capture_back_to_idle() {
        let mut config = test_config();
        config.catalogs.landscape.filters = crate::pipelines::overlay::OverlayCatalog::new(vec![
            Overlay::none(),
            Overlay::new("absent", "/does/not/exist.png"),
        ]);
        let (mut booth, _) = booth(config);

        booth.select_filter(1).unwrap();
        let result = booth.trigger_capture().await;

        assert!(matches!(
            result,
            Err(BoothError::Capture(CaptureError::OverlayLoad { .. }))
        ));
        assert_eq!(booth.phase(), Phase::Idle);
        assert!(booth.session().captured.is_none());
        assert!(booth.camera_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_print_uses_clamped_copies_and_wire_format() {
        let (mut booth, scripted) = booth(test_config());
        booth.trigger_capture().await.unwrap();
        booth.accept().await.unwrap();

        booth.set_print_copies(99);
        booth.print().await.unwrap();

        assert_eq!(booth.phase(), Phase::Saved);
        let prints = scripted.prints.lock().unwrap();
        assert_eq!(prints.len(), 1);
        assert_eq!(prints[0].copies, 6);
        assert_eq!(prints[0].format, "PAYSAGE");
    }

    #[tokio::test(start_paused = true)]
    async fn test_print_error_blocks_reprint_until_acknowledged() {
        let (mut booth, scripted) = booth(test_config());
        booth.trigger_capture().await.unwrap();
        booth.accept().await.unwrap();

        scripted.fail_print.store(true, Ordering::SeqCst);
        assert!(booth.print().await.is_err());
        // Saved state survives the failure; only reprinting is blocked
        assert_eq!(booth.phase(), Phase::Saved);
        assert!(booth.print_error().is_some());
        assert!(booth.print().await.is_err());

        scripted.fail_print.store(false, Ordering::SeqCst);
        booth.acknowledge_print_error();
        booth.print().await.unwrap();
        assert_eq!(scripted.prints.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_email_success_completes_the_session() {
        let (mut booth, scripted) = booth(test_config());
        booth.trigger_capture().await.unwrap();
        booth.accept().await.unwrap();

        booth.send_email("client@example.com").await.unwrap();

        assert_eq!(booth.phase(), Phase::Idle);
        assert!(booth.session().captured.is_none());
        let emails = scripted.emails.lock().unwrap();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].1, "client@example.com");
    }

    #[tokio::test(start_paused = true)]
    async fn test_impression_code_triggers_print() {
        let (mut booth, scripted) = booth(test_config());
        booth.trigger_capture().await.unwrap();
        booth.accept().await.unwrap();

        *scripted.code_message.lock().unwrap() = CODE_PRINT_MESSAGE.to_string();
        let message = booth.submit_code("ABC123").await.unwrap();

        assert_eq!(message, CODE_PRINT_MESSAGE);
        assert_eq!(scripted.prints.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operations_guarded_by_phase() {
        let (mut booth, _) = booth(test_config());

        // Nothing captured yet: review operations are invalid
        assert!(booth.accept().await.is_err());
        assert!(booth.reject().await.is_err());
        assert!(booth.print().await.is_err());

        booth.trigger_capture().await.unwrap();
        // Mid-review: menu operations are invalid
        assert!(booth.set_format(OutputFormat::TallFrame).is_err());
        assert!(booth.select_filter(1).is_err());
        assert!(booth.trigger_capture().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_from_review_tears_down() {
        let (mut booth, _) = booth(test_config());
        booth.trigger_capture().await.unwrap();

        booth.cancel().unwrap();
        assert_eq!(booth.phase(), Phase::Idle);
        assert!(booth.session().captured.is_none());
        assert!(booth.camera_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_releases_camera_without_reopening() {
        let (mut booth, _) = booth(test_config());
        booth.trigger_capture().await.unwrap();

        booth.shutdown();
        assert!(!booth.camera_open());
        assert!(booth.session().captured.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blob_present_only_in_capture_holding_phases() {
        let (mut booth, _) = booth(test_config());
        assert!(!booth.phase().holds_capture());
        assert!(booth.session().captured.is_none());

        booth.trigger_capture().await.unwrap();
        assert!(booth.phase().holds_capture());
        assert!(booth.session().captured.is_some());

        booth.accept().await.unwrap();
        assert!(booth.phase().holds_capture());
        assert!(booth.session().captured.is_some());

        booth.cancel().unwrap();
        assert!(!booth.phase().holds_capture());
        assert!(booth.session().captured.is_none());
    }
}
