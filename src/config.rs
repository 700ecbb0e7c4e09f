// SPDX-License-Identifier: GPL-3.0-only

//! Deployment configuration
//!
//! One explicit value describing everything that varies between kiosk
//! deployments: backend address, camera constraints, countdown and burst
//! parameters, enabled capabilities, and the per-format overlay catalogs.
//! Injected once at session creation and never mutated mid-session except
//! through the explicit format/mode switch operations.

use crate::constants::{
    self, CaptureMode, OutputFormat, DEFAULT_BURST_COUNTDOWN_SECS, DEFAULT_BURST_FRAMES,
    DEFAULT_CAPTURE_SIZE, DEFAULT_COUNTDOWN_SECS,
};
use crate::errors::{BoothError, BoothResult};
use crate::pipelines::overlay::{Overlay, OverlayCatalog};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Overlay catalogs for one output format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormatCatalog {
    /// Filters composited over the photo at capture time
    pub filters: OverlayCatalog,
    /// Decorative borders applied at print time
    pub frames: OverlayCatalog,
    /// Index selected in `filters` when this format becomes active
    pub default_filter: usize,
}

/// Per-format overlay catalogs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalogs {
    pub landscape: FormatCatalog,
    pub square_frame: FormatCatalog,
    pub tall_frame: FormatCatalog,
}

impl Catalogs {
    /// Catalog for the given format
    pub fn for_format(&self, format: OutputFormat) -> &FormatCatalog {
        match format {
            OutputFormat::Landscape => &self.landscape,
            OutputFormat::SquareFrame => &self.square_frame,
            OutputFormat::TallFrame => &self.tall_frame,
        }
    }
}

/// Deployment configuration for one kiosk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Base address of the persistence backend
    pub backend_url: String,
    /// Camera device index (as in /dev/videoN)
    pub device_index: usize,
    /// Requested capture resolution (width, height)
    pub capture_size: (u32, u32),
    /// Use the two-phase probe open to surface the permission prompt early
    pub probe_open: bool,
    /// Countdown length for still captures, in seconds
    pub countdown_seconds: u32,
    /// Number of frames per animated burst
    pub burst_frames: usize,
    /// Countdown length before each burst frame, in seconds
    pub burst_countdown_seconds: u32,
    /// Frame interval of the encoded animation, in milliseconds
    pub frame_interval_ms: u64,
    /// Printing controls are offered after saving
    pub enable_print: bool,
    /// Email delivery is offered after saving
    pub enable_email: bool,
    /// QR retrieval-code handoff is offered after saving
    pub enable_qr_handoff: bool,
    /// Capture mode selected when a session starts
    pub default_mode: CaptureMode,
    /// Output format selected when a session starts
    pub default_format: OutputFormat,
    /// Overlay catalogs per format
    pub catalogs: Catalogs,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:3001".to_string(),
            device_index: 0,
            capture_size: DEFAULT_CAPTURE_SIZE,
            probe_open: false,
            countdown_seconds: DEFAULT_COUNTDOWN_SECS,
            burst_frames: DEFAULT_BURST_FRAMES,
            burst_countdown_seconds: DEFAULT_BURST_COUNTDOWN_SECS,
            frame_interval_ms: constants::DEFAULT_FRAME_INTERVAL.as_millis() as u64,
            enable_print: true,
            enable_email: true,
            enable_qr_handoff: false,
            default_mode: CaptureMode::Still,
            default_format: OutputFormat::Landscape,
            catalogs: default_catalogs(),
        }
    }
}

impl DeploymentConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> BoothResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BoothError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: DeploymentConfig = serde_json::from_str(&raw)
            .map_err(|e| BoothError::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> BoothResult<()> {
        if self.backend_url.is_empty() {
            return Err(BoothError::Config("backend_url must not be empty".into()));
        }
        if self.burst_frames == 0 {
            return Err(BoothError::Config("burst_frames must be at least 1".into()));
        }
        if self.frame_interval_ms == 0 {
            return Err(BoothError::Config("frame_interval_ms must be non-zero".into()));
        }
        for format in OutputFormat::ALL {
            let catalog = self.catalogs.for_format(format);
            if !catalog.filters.is_empty() && catalog.default_filter >= catalog.filters.len() {
                return Err(BoothError::Config(format!(
                    "default_filter {} out of range for {}",
                    catalog.default_filter,
                    format.display_name()
                )));
            }
        }
        Ok(())
    }
}

/// Built-in overlay catalogs used when a deployment ships no config file.
///
/// Index 0 of every filter catalog is the none-overlay so that toggling a
/// selection off always has somewhere to land.
fn default_catalogs() -> Catalogs {
    let filters = |prefix: &str| {
        OverlayCatalog::new(vec![
            Overlay::none(),
            Overlay::new("Classique", format!("assets/filters/{}/classique.png", prefix)),
            Overlay::new("Soiree", format!("assets/filters/{}/soiree.png", prefix)),
        ])
    };

    Catalogs {
        landscape: FormatCatalog {
            filters: filters("paysage"),
            frames: OverlayCatalog::default(),
            default_filter: 0,
        },
        square_frame: FormatCatalog {
            filters: filters("polaroid"),
            frames: OverlayCatalog::new(vec![
                Overlay::none(),
                Overlay::new("Bois", "assets/frames/bois.png"),
                Overlay::new("Fleurs", "assets/frames/fleurs.png"),
            ]),
            default_filter: 0,
        },
        tall_frame: FormatCatalog {
            filters: filters("minipolaroid"),
            frames: OverlayCatalog::default(),
            default_filter: 0,
        },
    }
}
