// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the photobooth capture pipeline

use std::fmt;

/// Result type alias using BoothError
pub type BoothResult<T> = Result<T, BoothError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum BoothError {
    /// Camera-related errors
    Camera(CameraError),
    /// Capture pipeline errors (compositing, encoding)
    Capture(CaptureError),
    /// Backend persistence errors (upload, print, email)
    Persistence(PersistenceError),
    /// Session state machine misuse
    Session(SessionError),
    /// Configuration errors
    Config(String),
}

/// Camera-specific errors
#[derive(Debug, Clone)]
pub enum CameraError {
    /// Camera could not be acquired (missing device, permission denied).
    /// Fatal to session start; never retried automatically.
    DeviceUnavailable(String),
    /// The source is open but has not produced a frame yet
    NoFrameAvailable,
    /// Error while streaming frames from an open device
    Stream(String),
    /// The device negotiated a pixel format the pipeline cannot consume
    InvalidFormat(String),
}

/// Capture pipeline errors
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// A selected overlay image failed to load. Fails the whole capture;
    /// there is no fallback to unfiltered output.
    OverlayLoad { name: String, reason: String },
    /// Still or animation encoding failed
    Encode(String),
    /// Camera failure during a capture round
    Camera(CameraError),
    /// The session was cancelled while the capture was in flight
    Cancelled,
}

/// Backend persistence errors
#[derive(Debug, Clone)]
pub enum PersistenceError {
    /// The request never completed (connection refused, timeout, ...)
    Network(String),
    /// The backend answered with a non-success status
    Rejected { status: u16, message: String },
    /// The backend answered 2xx but the body did not match the contract
    InvalidResponse(String),
}

/// Session state machine misuse
#[derive(Debug, Clone)]
pub enum SessionError {
    /// An operation was invoked in a phase that does not permit it
    InvalidTransition {
        phase: &'static str,
        operation: &'static str,
    },
}

impl fmt::Display for BoothError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoothError::Camera(e) => write!(f, "Camera error: {}", e),
            BoothError::Capture(e) => write!(f, "Capture error: {}", e),
            BoothError::Persistence(e) => write!(f, "Persistence error: {}", e),
            BoothError::Session(e) => write!(f, "Session error: {}", e),
            BoothError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::DeviceUnavailable(msg) => write!(f, "Device unavailable: {}", msg),
            CameraError::NoFrameAvailable => write!(f, "No frame available yet"),
            CameraError::Stream(msg) => write!(f, "Stream error: {}", msg),
            CameraError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::OverlayLoad { name, reason } => {
                write!(f, "Overlay '{}' failed to load: {}", name, reason)
            }
            CaptureError::Encode(msg) => write!(f, "Encoding failed: {}", msg),
            CaptureError::Camera(e) => write!(f, "Camera failed during capture: {}", e),
            CaptureError::Cancelled => write!(f, "Capture cancelled"),
        }
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Network(msg) => write!(f, "Network failure: {}", msg),
            PersistenceError::Rejected { status, message } => {
                write!(f, "Backend rejected request ({}): {}", status, message)
            }
            PersistenceError::InvalidResponse(msg) => {
                write!(f, "Malformed backend response: {}", msg)
            }
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidTransition { phase, operation } => {
                write!(f, "Operation '{}' is not valid in phase {}", operation, phase)
            }
        }
    }
}

impl std::error::Error for BoothError {}
impl std::error::Error for CameraError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for PersistenceError {}
impl std::error::Error for SessionError {}

// Conversions from sub-errors to BoothError
impl From<CameraError> for BoothError {
    fn from(err: CameraError) -> Self {
        BoothError::Camera(err)
    }
}

impl From<CaptureError> for BoothError {
    fn from(err: CaptureError) -> Self {
        BoothError::Capture(err)
    }
}

impl From<PersistenceError> for BoothError {
    fn from(err: PersistenceError) -> Self {
        BoothError::Persistence(err)
    }
}

impl From<SessionError> for BoothError {
    fn from(err: SessionError) -> Self {
        BoothError::Session(err)
    }
}

impl From<CameraError> for CaptureError {
    fn from(err: CameraError) -> Self {
        CaptureError::Camera(err)
    }
}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        CameraError::Stream(err.to_string())
    }
}
