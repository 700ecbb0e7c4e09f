// SPDX-License-Identifier: GPL-3.0-only

//! Decorative overlays and their catalogs
//!
//! Overlays come in two flavours: filters, alpha-composited over the photo
//! at capture time, and frames, decorative borders applied at print time.
//! Both are selected by index from an ordered per-format catalog.

use crate::errors::CaptureError;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// A decorative overlay image reference.
///
/// An empty `url` means "no overlay" and short-circuits all loading and
/// drawing logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlay {
    /// Display name shown in the selection menu
    pub name: String,
    /// Image location: a local file path or an http(s) URL. Empty for none.
    pub url: String,
}

impl Overlay {
    /// Create an overlay entry
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// The "no overlay" entry
    pub fn none() -> Self {
        Self {
            name: "Aucun".to_string(),
            url: String::new(),
        }
    }

    /// True when this entry selects no overlay image
    pub fn is_none(&self) -> bool {
        self.url.is_empty()
    }
}

/// An ordered catalog of overlays selected by index with wraparound
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlayCatalog {
    entries: Vec<Overlay>,
}

impl OverlayCatalog {
    /// Build a catalog from its ordered entries
    pub fn new(entries: Vec<Overlay>) -> Self {
        Self { entries }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the catalog has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at a (valid) index; the none-overlay when out of range or empty
    pub fn get(&self, index: usize) -> Overlay {
        self.entries.get(index).cloned().unwrap_or_else(Overlay::none)
    }

    /// Resolve a possibly out-of-range selection.
    ///
    /// Selection wraps: an index below zero lands on the last entry, an
    /// index at or past the end lands on the first.
    pub fn wrap(&self, index: i64) -> usize {
        if self.entries.is_empty() {
            return 0;
        }
        if index < 0 {
            self.entries.len() - 1
        } else if index as usize >= self.entries.len() {
            0
        } else {
            index as usize
        }
    }
}

/// Load an overlay image, ready for compositing.
///
/// Returns `Ok(None)` for the empty-url "no overlay" entry. Any failure to
/// fetch or decode a named overlay fails the whole capture: a customer who
/// picked a filter must never silently receive an unfiltered photo.
pub async fn load_overlay(overlay: &Overlay) -> Result<Option<Arc<RgbaImage>>, CaptureError> {
    if overlay.is_none() {
        return Ok(None);
    }

    let bytes = fetch_overlay_bytes(overlay).await?;

    let name = overlay.name.clone();
    let image = tokio::task::spawn_blocking(move || {
        image::load_from_memory(&bytes).map(|img| img.to_rgba8())
    })
    .await
    .map_err(|e| CaptureError::OverlayLoad {
        name: overlay.name.clone(),
        reason: format!("decode task failed: {}", e),
    })?
    .map_err(|e| {
        warn!(overlay = %name, error = %e, "Overlay image failed to decode");
        CaptureError::OverlayLoad {
            name,
            reason: e.to_string(),
        }
    })?;

    debug!(
        overlay = %overlay.name,
        width = image.width(),
        height = image.height(),
        "Overlay loaded"
    );

    Ok(Some(Arc::new(image)))
}

/// Fetch raw overlay bytes from a file path or an http(s) URL
async fn fetch_overlay_bytes(overlay: &Overlay) -> Result<Vec<u8>, CaptureError> {
    let load_err = |reason: String| CaptureError::OverlayLoad {
        name: overlay.name.clone(),
        reason,
    };

    if overlay.url.starts_with("http://") || overlay.url.starts_with("https://") {
        let response = reqwest::get(&overlay.url)
            .await
            .map_err(|e| load_err(e.to_string()))?
            .error_for_status()
            .map_err(|e| load_err(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| load_err(e.to_string()))?;
        Ok(bytes.to_vec())
    } else {
        tokio::fs::read(&overlay.url)
            .await
            .map_err(|e| load_err(e.to_string()))
    }
}
