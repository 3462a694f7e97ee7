//! Persistence and Reporting
//!
//! Turns pipeline results into artifacts a human or CI system consumes:
//! - Decoded frames and the change mask as PNG files
//! - The comparison summary as JSON
//! - A readable verdict block in the log
//!
//! The core stays pure in-memory data; everything durable lives here.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::OutputConfig;
use crate::diff::DiffReport;
use crate::pipeline::ValidationOutcome;
use crate::pixel::PixelGrid;

/// Artifact paths produced by one comparison run
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    /// Decoded "before" frame PNG, if written
    pub before_png: Option<PathBuf>,
    /// Decoded "after" frame PNG, if written
    pub after_png: Option<PathBuf>,
    /// Change mask PNG, if written
    pub diff_png: Option<PathBuf>,
    /// JSON summary
    pub summary_json: Option<PathBuf>,
}

/// Writes validation artifacts according to output configuration
#[derive(Debug, Clone)]
pub struct Reporter {
    output: OutputConfig,
}

impl Reporter {
    /// Reporter writing into the configured artifact directory
    pub fn new(output: OutputConfig) -> Self {
        Self { output }
    }

    /// Write one decoded grid as PNG
    pub fn save_frame(&self, grid: &PixelGrid, name: &str) -> Result<PathBuf> {
        let path = self.artifact_path(name);
        grid.to_rgb_image()
            .save(&path)
            .context(format!("Failed to write frame image: {}", path.display()))?;
        info!(path = %path.display(), "Frame image written");
        Ok(path)
    }

    /// Write the change mask as a white-on-black PNG
    pub fn save_diff_map(&self, report: &DiffReport, name: &str) -> Result<PathBuf> {
        let path = self.artifact_path(name);
        report
            .mask
            .to_luma_image()
            .save(&path)
            .context(format!("Failed to write diff map: {}", path.display()))?;
        info!(path = %path.display(), "Diff map written");
        Ok(path)
    }

    /// Write the comparison summary as JSON
    pub fn save_summary(&self, report: &DiffReport, name: &str) -> Result<PathBuf> {
        let path = self.artifact_path(name);
        let json = serde_json::to_string_pretty(&report.summary())
            .context("Failed to serialize diff summary")?;
        fs::write(&path, json)
            .context(format!("Failed to write summary: {}", path.display()))?;
        info!(path = %path.display(), "Summary written");
        Ok(path)
    }

    /// Write the full artifact set for one validation run
    pub fn save_outcome(&self, outcome: &ValidationOutcome) -> Result<Artifacts> {
        fs::create_dir_all(&self.output.directory).context(format!(
            "Failed to create artifact directory: {}",
            self.output.directory.display()
        ))?;

        let mut artifacts = Artifacts::default();

        if self.output.save_frames {
            artifacts.before_png = Some(self.save_frame(&outcome.before.grid, "before.png")?);
            artifacts.after_png = Some(self.save_frame(&outcome.after.grid, "after.png")?);
        }
        if self.output.save_diff_map {
            artifacts.diff_png = Some(self.save_diff_map(&outcome.report, "diff.png")?);
        }
        artifacts.summary_json = Some(self.save_summary(&outcome.report, "summary.json")?);

        Ok(artifacts)
    }

    /// Log the verdict block for a completed run
    pub fn log_verdict(&self, outcome: &ValidationOutcome) {
        let report = &outcome.report;

        info!(
            "Changed pixels: {} / {} ({:.4}%)",
            report.changed_pixels, report.total_pixels, report.percent_changed
        );
        info!(
            "Verdict: {} (threshold {:.2}%, tolerance {})",
            if report.is_different {
                "CHANGED"
            } else {
                "UNCHANGED"
            },
            report.change_threshold_percent,
            report.pixel_tolerance
        );

        if outcome.format_assumed() {
            warn!(
                before = %outcome.before.format,
                after = %outcome.after.format,
                "One or both captures decoded under an assumed format; verdict may be unreliable"
            );
        }
    }

    fn artifact_path(&self, name: &str) -> PathBuf {
        self.output.directory.join(name)
    }

    /// Configured artifact directory
    pub fn directory(&self) -> &Path {
        &self.output.directory
    }
}
