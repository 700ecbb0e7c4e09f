// SPDX-License-Identifier: GPL-3.0-only

//! Photomaton - a kiosk photobooth capture pipeline
//!
//! This library drives a camera device, composites captured photos or short
//! animated bursts against selectable decorative overlays, and submits the
//! result to an external backend for storage, emailing, and printing.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Camera frame source abstraction (V4L2 and synthetic)
//! - [`pipelines`]: Countdown, compositing, burst, animation, and QR stages
//! - [`session`]: The capture session state machine
//! - [`persistence`]: HTTP client for the kiosk backend
//! - [`config`]: Deployment configuration handling
//!
//! # Example
//!
//! ```no_run
//! use photomaton::backends::camera::v4l2::V4l2Opener;
//! use photomaton::config::DeploymentConfig;
//! use photomaton::persistence::HttpPersistence;
//! use photomaton::session::CaptureSession;
//!
//! # async fn run() -> photomaton::errors::BoothResult<()> {
//! let config = DeploymentConfig::default();
//! let persistence = HttpPersistence::new(&config.backend_url)?;
//! let opener = Box::new(V4l2Opener::new(config.device_index));
//!
//! let mut booth = CaptureSession::start(config, opener, persistence)?;
//! booth.trigger_capture().await?;
//! booth.accept().await?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod persistence;
pub mod pipelines;
pub mod session;

// Re-export commonly used types
pub use config::DeploymentConfig;
pub use constants::{CaptureMode, MediaKind, OutputFormat};
pub use errors::{BoothError, BoothResult};
pub use session::state::Phase;
pub use session::CaptureSession;
