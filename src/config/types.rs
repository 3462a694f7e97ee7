//! Configuration type definitions

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Display geometry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Panel width in pixels
    pub width: u32,

    /// Panel height in pixels
    pub height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 480,
        }
    }
}

/// Decode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Source pixel format ("auto", "rgb565", "rgb32", "rgba32")
    pub format: String,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            format: "auto".to_string(),
        }
    }
}

/// Comparison configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Per-channel difference a pixel must exceed to count as changed.
    /// Default 10: absorbs capture noise and RGB565 widening artifacts.
    pub pixel_tolerance: u8,

    /// Changed-area percentage above which two frames count as different.
    /// At or below zero, any changed pixel makes the frames different.
    pub change_threshold_percent: f64,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            pixel_tolerance: crate::diff::DEFAULT_PIXEL_TOLERANCE,
            change_threshold_percent: crate::diff::DEFAULT_CHANGE_THRESHOLD_PERCENT,
        }
    }
}

/// Artifact output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory PNG and JSON artifacts are written to
    pub directory: PathBuf,

    /// Write decoded before/after frames as PNG
    pub save_frames: bool,

    /// Write the change mask as PNG
    pub save_diff_map: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            save_frames: true,
            save_diff_map: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
