//! Capture Collaborator Seam
//!
//! The decode/diff core consumes raw captures; how the bytes were obtained
//! (memory-mapped display reads, remote shells, replayed dumps) is the
//! calling environment's concern. [`FrameSource`] is the boundary contract,
//! and [`FileFrameSource`] is the one transport-free implementation the CLI
//! needs: replaying a previously captured raw dump from disk.

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::debug;

use crate::decoder::RawFramebuffer;
use crate::pixel::Geometry;

/// Capture errors
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Reading the capture payload failed
    #[error("Failed to read capture from {path}")]
    Io {
        /// Location the capture was read from
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Source of raw framebuffer captures.
///
/// One call, one capture. The core assumes each capture is a single atomic
/// snapshot of the display; tearing is not detected or corrected.
pub trait FrameSource {
    /// Display geometry this source claims to capture
    fn geometry(&self) -> Geometry;

    /// Acquire one raw capture
    fn capture(&mut self) -> Result<RawFramebuffer, CaptureError>;
}

/// Replays a raw framebuffer dump from disk
#[derive(Debug, Clone)]
pub struct FileFrameSource {
    path: PathBuf,
    geometry: Geometry,
}

impl FileFrameSource {
    /// Source backed by a raw dump file
    pub fn new(path: impl Into<PathBuf>, geometry: Geometry) -> Self {
        Self {
            path: path.into(),
            geometry,
        }
    }

    /// Dump location
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for FileFrameSource {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn capture(&mut self) -> Result<RawFramebuffer, CaptureError> {
        let data = fs::read(&self.path).map_err(|source| CaptureError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!(
            path = %self.path.display(),
            len = data.len(),
            geometry = %self.geometry,
            "Read framebuffer dump"
        );

        Ok(RawFramebuffer::new(Bytes::from(data), self.geometry))
    }
}
