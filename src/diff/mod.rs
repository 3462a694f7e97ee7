//! Image Diff Engine
//!
//! Quantifies visual difference between two canonical pixel grids and turns
//! it into a pass/fail signal:
//! - Per-pixel change mask (any channel differing beyond tolerance)
//! - Aggregate changed-pixel count and percentage
//! - Threshold verdict for automation
//!
//! A pixel counts as changed when **any** channel's absolute difference
//! exceeds the per-channel tolerance. UI redraws shift large contiguous
//! regions coarsely in at least one channel, so the per-channel max test is
//! cheap and deterministic and needs no combined-distance tuning.
//!
//! Grids of different dimensions are a contract violation
//! ([`DiffError::DimensionMismatch`]) - silently resizing or cropping would
//! corrupt the change signal.

use image::GrayImage;
use serde::Serialize;
use tracing::debug;

use crate::pixel::{Geometry, PixelGrid};

// =============================================================================
// Types
// =============================================================================

/// Default per-channel tolerance: absorbs transport noise and the rounding
/// introduced by RGB565 bit-widening while still catching real UI changes
pub const DEFAULT_PIXEL_TOLERANCE: u8 = 10;

/// Default changed-area threshold, in percent of total pixels
pub const DEFAULT_CHANGE_THRESHOLD_PERCENT: f64 = 1.0;

/// Diff errors
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// Grids being compared have different dimensions
    #[error("Dimension mismatch: cannot compare {a} grid against {b}")]
    DimensionMismatch {
        /// Dimensions of the first grid
        a: Geometry,
        /// Dimensions of the second grid
        b: Geometry,
    },
}

/// Per-pixel boolean change mask, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeMask {
    geometry: Geometry,
    changed: Vec<bool>,
}

impl ChangeMask {
    fn from_parts(geometry: Geometry, changed: Vec<bool>) -> Self {
        debug_assert_eq!(changed.len(), geometry.pixel_count());
        Self { geometry, changed }
    }

    /// Mask dimensions
    #[inline]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Whether the pixel at (x, y) changed beyond tolerance
    #[inline]
    pub fn is_changed(&self, x: u32, y: u32) -> bool {
        self.changed[(y * self.geometry.width + x) as usize]
    }

    /// All flags in row-major order
    #[inline]
    pub fn flags(&self) -> &[bool] {
        &self.changed
    }

    /// Render as a single-channel image for human inspection
    /// (changed = 255/white, unchanged = 0/black)
    pub fn to_luma_image(&self) -> GrayImage {
        GrayImage::from_fn(self.geometry.width, self.geometry.height, |x, y| {
            image::Luma([if self.is_changed(x, y) { 255 } else { 0 }])
        })
    }
}

/// Result of comparing two pixel grids
#[derive(Debug, Clone)]
pub struct DiffReport {
    /// Per-pixel change mask
    pub mask: ChangeMask,
    /// Pixels compared
    pub total_pixels: usize,
    /// Pixels that changed beyond tolerance
    pub changed_pixels: usize,
    /// Changed share of the frame, 0-100
    pub percent_changed: f64,
    /// Verdict: `percent_changed` strictly above the configured threshold
    pub is_different: bool,
    /// Tolerance the comparison ran with
    pub pixel_tolerance: u8,
    /// Threshold the verdict was taken against
    pub change_threshold_percent: f64,
}

impl DiffReport {
    /// Flat, serializable summary for the reporting layer
    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            width: self.mask.geometry().width,
            height: self.mask.geometry().height,
            total_pixels: self.total_pixels,
            changed_pixels: self.changed_pixels,
            percent_changed: self.percent_changed,
            pixel_tolerance: self.pixel_tolerance,
            change_threshold_percent: self.change_threshold_percent,
            is_different: self.is_different,
        }
    }
}

/// CI-consumable comparison summary
#[derive(Debug, Clone, Serialize)]
pub struct DiffSummary {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixels compared
    pub total_pixels: usize,
    /// Pixels changed beyond tolerance
    pub changed_pixels: usize,
    /// Changed share of the frame, 0-100
    pub percent_changed: f64,
    /// Per-channel tolerance used
    pub pixel_tolerance: u8,
    /// Verdict threshold used, in percent
    pub change_threshold_percent: f64,
    /// Whether the frames differ beyond the threshold
    pub is_different: bool,
}

// =============================================================================
// ImageDiffEngine
// =============================================================================

/// Comparison engine for canonical pixel grids.
///
/// Pure computation: no state is carried between [`compare`](Self::compare)
/// calls, so one engine may serve any number of grid pairs.
#[derive(Debug, Clone, Copy)]
pub struct ImageDiffEngine {
    pixel_tolerance: u8,
    change_threshold_percent: f64,
}

impl Default for ImageDiffEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PIXEL_TOLERANCE, DEFAULT_CHANGE_THRESHOLD_PERCENT)
    }
}

impl ImageDiffEngine {
    /// Engine with explicit tolerance and threshold.
    ///
    /// Neither value is clamped: tolerance is non-negative by construction,
    /// and a threshold at or below zero legitimately turns the verdict into
    /// any-change detection.
    pub fn new(pixel_tolerance: u8, change_threshold_percent: f64) -> Self {
        Self {
            pixel_tolerance,
            change_threshold_percent,
        }
    }

    /// Per-channel tolerance this engine compares with
    #[inline]
    pub fn pixel_tolerance(&self) -> u8 {
        self.pixel_tolerance
    }

    /// Verdict threshold in percent
    #[inline]
    pub fn change_threshold_percent(&self) -> f64 {
        self.change_threshold_percent
    }

    /// Compare two grids pixel by pixel.
    ///
    /// # Errors
    ///
    /// [`DiffError::DimensionMismatch`] if the grids' dimensions differ in
    /// either axis. No partial diff is computed.
    pub fn compare(&self, a: &PixelGrid, b: &PixelGrid) -> Result<DiffReport, DiffError> {
        if a.geometry() != b.geometry() {
            return Err(DiffError::DimensionMismatch {
                a: a.geometry(),
                b: b.geometry(),
            });
        }

        let changed: Vec<bool> = a
            .pixels()
            .iter()
            .zip(b.pixels())
            .map(|(pa, pb)| pa.max_channel_delta(pb) > self.pixel_tolerance)
            .collect();

        let total_pixels = a.pixel_count();
        let changed_pixels = changed.iter().filter(|c| **c).count();
        let percent_changed = if total_pixels == 0 {
            0.0
        } else {
            100.0 * changed_pixels as f64 / total_pixels as f64
        };
        let is_different = percent_changed > self.change_threshold_percent;

        debug!(
            changed_pixels,
            total_pixels,
            percent_changed,
            is_different,
            "Compared pixel grids"
        );

        Ok(DiffReport {
            mask: ChangeMask::from_parts(a.geometry(), changed),
            total_pixels,
            changed_pixels,
            percent_changed,
            is_different,
            pixel_tolerance: self.pixel_tolerance,
            change_threshold_percent: self.change_threshold_percent,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
