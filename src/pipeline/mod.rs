//! Before/After Validation Pipeline
//!
//! Composes the decoder and the diff engine over a pair of captures taken
//! around a device interaction: decode both raw buffers, compare the grids,
//! hand back one outcome carrying the decoded frames and the diff report.
//!
//! Capture acquisition and whatever happens between the two captures (touch
//! injection, remote process control) stay outside this crate; the pipeline
//! only needs two [`RawFramebuffer`]s of the same claimed geometry.

use tracing::info;

use crate::capture::{CaptureError, FrameSource};
use crate::config::Config;
use crate::decoder::{DecodeError, DecodedFrame, FramebufferDecoder, RawFramebuffer};
use crate::diff::{DiffError, DiffReport, ImageDiffEngine};
use crate::pixel::FormatHint;

/// Pipeline errors: whichever stage failed, with its own diagnostics
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Acquiring a capture failed
    #[error("Capture failed")]
    Capture(#[from] CaptureError),

    /// Decoding a capture failed
    #[error("Decode failed")]
    Decode(#[from] DecodeError),

    /// Comparing the decoded grids failed
    #[error("Comparison failed")]
    Diff(#[from] DiffError),
}

/// Everything one validation run produced
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    /// Decoded "before" frame
    pub before: DecodedFrame,
    /// Decoded "after" frame
    pub after: DecodedFrame,
    /// Comparison result
    pub report: DiffReport,
}

impl ValidationOutcome {
    /// Whether the interaction produced a visible change
    #[inline]
    pub fn changed(&self) -> bool {
        self.report.is_different
    }

    /// Whether either frame decoded under an assumed (not detected) format
    #[inline]
    pub fn format_assumed(&self) -> bool {
        !self.before.exact_format || !self.after.exact_format
    }
}

/// Decode-and-compare orchestrator.
///
/// Stateless; one validator may serve any number of before/after pairs,
/// sequentially or across threads.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    decoder: FramebufferDecoder,
    engine: ImageDiffEngine,
    hint: FormatHint,
}

impl Validator {
    /// Validator from explicit components
    pub fn new(decoder: FramebufferDecoder, engine: ImageDiffEngine, hint: FormatHint) -> Self {
        Self {
            decoder,
            engine,
            hint,
        }
    }

    /// Validator wired from configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            decoder: FramebufferDecoder::new(),
            engine: ImageDiffEngine::new(
                config.diff.pixel_tolerance,
                config.diff.change_threshold_percent,
            ),
            hint: config.format_hint(),
        }
    }

    /// Decode both captures and compare the resulting grids
    pub fn run(
        &self,
        before: &RawFramebuffer,
        after: &RawFramebuffer,
    ) -> Result<ValidationOutcome, PipelineError> {
        let before = self.decoder.decode(before, self.hint)?;
        let after = self.decoder.decode(after, self.hint)?;

        let report = self.engine.compare(&before.grid, &after.grid)?;

        info!(
            changed_pixels = report.changed_pixels,
            total_pixels = report.total_pixels,
            percent_changed = report.percent_changed,
            is_different = report.is_different,
            "Validation comparison complete"
        );

        Ok(ValidationOutcome {
            before,
            after,
            report,
        })
    }

    /// Acquire one capture from each source, then decode and compare
    pub fn run_sources(
        &self,
        before: &mut dyn FrameSource,
        after: &mut dyn FrameSource,
    ) -> Result<ValidationOutcome, PipelineError> {
        let before = before.capture()?;
        let after = after.capture()?;
        self.run(&before, &after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::Geometry;

    fn rgb32_frame(geometry: Geometry, rgb: [u8; 3]) -> RawFramebuffer {
        let px = [rgb[2], rgb[1], rgb[0], 0x00]; // little-endian word: B,G,R,X
        let bytes: Vec<u8> = px
            .iter()
            .copied()
            .cycle()
            .take(geometry.pixel_count() * 4)
            .collect();
        RawFramebuffer::new(bytes, geometry)
    }

    #[test]
    fn test_identical_captures_pass_through_unchanged() {
        let geometry = Geometry::new(32, 16);
        let frame = rgb32_frame(geometry, [40, 50, 60]);

        let validator = Validator::from_config(&Config::default_config());
        let outcome = validator.run(&frame, &frame.clone()).unwrap();

        assert_eq!(outcome.report.changed_pixels, 0);
        assert!(!outcome.changed());
        assert!(!outcome.format_assumed());
    }

    #[test]
    fn test_differing_captures_flag_change() {
        let geometry = Geometry::new(32, 16);
        let before = rgb32_frame(geometry, [0, 0, 0]);
        let after = rgb32_frame(geometry, [255, 255, 255]);

        let validator = Validator::from_config(&Config::default_config());
        let outcome = validator.run(&before, &after).unwrap();

        assert_eq!(outcome.report.changed_pixels, geometry.pixel_count());
        assert!(outcome.changed());
    }

    #[test]
    fn test_truncated_capture_propagates() {
        let geometry = Geometry::new(32, 16);
        let before = rgb32_frame(geometry, [0, 0, 0]);
        let after = RawFramebuffer::new(vec![0u8; 10], geometry);

        let validator = Validator::from_config(&Config::default_config());
        let err = validator.run(&before, &after).unwrap_err();

        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[test]
    fn test_mismatched_geometry_propagates() {
        let before = rgb32_frame(Geometry::new(8, 8), [1, 2, 3]);
        let after = rgb32_frame(Geometry::new(8, 9), [1, 2, 3]);

        let validator = Validator::from_config(&Config::default_config());
        let err = validator.run(&before, &after).unwrap_err();

        assert!(matches!(err, PipelineError::Diff(_)));
    }
}
