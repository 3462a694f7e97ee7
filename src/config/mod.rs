//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - CLI arguments
//!
//! Geometry, tolerance, and threshold are configuration handed to the core
//! through constructors, never ambient state the core reads for itself.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::pixel::{FormatHint, Geometry, PixelFormat};

pub mod types;

pub use types::{DecodeConfig, DiffConfig, DisplayConfig, LoggingConfig, OutputConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Display geometry
    #[serde(default)]
    pub display: DisplayConfig,
    /// Decode settings
    #[serde(default)]
    pub decode: DecodeConfig,
    /// Comparison settings
    #[serde(default)]
    pub diff: DiffConfig,
    /// Artifact output settings
    #[serde(default)]
    pub output: OutputConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.display.width == 0 || self.display.height == 0 {
            anyhow::bail!(
                "Invalid display geometry: {}x{}",
                self.display.width,
                self.display.height
            );
        }

        match self.decode.format.as_str() {
            "auto" | "rgb565" | "rgb32" | "rgba32" => {}
            _ => anyhow::bail!("Invalid pixel format: {}", self.decode.format),
        }

        if !self.diff.change_threshold_percent.is_finite() {
            anyhow::bail!(
                "Invalid change threshold: {}",
                self.diff.change_threshold_percent
            );
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Invalid log level: {}", self.logging.level),
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(
        mut self,
        width: Option<u32>,
        height: Option<u32>,
        format: Option<String>,
        tolerance: Option<u8>,
        threshold: Option<f64>,
    ) -> Self {
        if let Some(width) = width {
            self.display.width = width;
        }
        if let Some(height) = height {
            self.display.height = height;
        }
        if let Some(format) = format {
            self.decode.format = format;
        }
        if let Some(tolerance) = tolerance {
            self.diff.pixel_tolerance = tolerance;
        }
        if let Some(threshold) = threshold {
            self.diff.change_threshold_percent = threshold;
        }

        self
    }

    /// Display geometry as the core's type
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.display.width, self.display.height)
    }

    /// Decode format as the core's type.
    ///
    /// Unknown names behave as auto-detection; [`validate`](Self::validate)
    /// rejects them before they reach this point.
    pub fn format_hint(&self) -> FormatHint {
        match self.decode.format.as_str() {
            "rgb565" => FormatHint::Exact(PixelFormat::Rgb565Le),
            "rgb32" => FormatHint::Exact(PixelFormat::Rgb32Le),
            "rgba32" => FormatHint::Exact(PixelFormat::Rgba32),
            _ => FormatHint::Auto,
        }
    }
}
