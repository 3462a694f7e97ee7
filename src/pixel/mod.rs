//! Pixel Format and Geometry Model
//!
//! Shared vocabulary for the decode and diff engines:
//! - [`PixelFormat`] - the closed set of source framebuffer encodings
//! - [`Geometry`] - display dimensions as claimed by the capture side
//! - [`PixelGrid`] - the canonical decoded output, one RGB triple per pixel
//!
//! Format auto-detection is expressed as an ordered candidate list
//! ([`PixelFormat::DETECTION_ORDER`]) evaluated by [`detect_format`], so new
//! encodings can be added without touching the comparison logic.

use std::fmt;

use image::RgbImage;

// =============================================================================
// Types
// =============================================================================

/// One 8-bit-per-channel RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    /// Red channel (0-255)
    pub r: u8,
    /// Green channel (0-255)
    pub g: u8,
    /// Blue channel (0-255)
    pub b: u8,
}

impl Rgb {
    /// Create a pixel from channel values
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Largest per-channel absolute difference to another pixel
    #[inline]
    pub fn max_channel_delta(&self, other: &Rgb) -> u8 {
        let dr = (self.r as i16 - other.r as i16).unsigned_abs() as u8;
        let dg = (self.g as i16 - other.g as i16).unsigned_abs() as u8;
        let db = (self.b as i16 - other.b as i16).unsigned_abs() as u8;
        dr.max(dg).max(db)
    }
}

/// Display dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Geometry {
    /// Create a geometry from width and height
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels covered by this geometry
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Source framebuffer pixel encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 16-bit RGB565 in little-endian words (5 bits red, 6 green, 5 blue)
    Rgb565Le,
    /// 32-bit little-endian words with blue in the low byte; the 4th byte
    /// (alpha or padding) is never decoded
    Rgb32Le,
    /// Explicit R,G,B,A byte order; alpha is never decoded
    Rgba32,
}

impl PixelFormat {
    /// Candidate evaluation order for auto-detection.
    ///
    /// RGB565 first: its exact-length match is the stronger signal. The
    /// 32-bit slot is a placeholder - [`detect_format`] substitutes the
    /// caller's preferred 32-bit variant.
    pub const DETECTION_ORDER: [PixelFormat; 2] = [PixelFormat::Rgb565Le, PixelFormat::Rgb32Le];

    /// Bytes occupied by one pixel in this encoding
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb565Le => 2,
            Self::Rgb32Le | Self::Rgba32 => 4,
        }
    }

    /// Buffer length an exact capture of `geometry` has in this encoding
    #[inline]
    pub fn expected_len(self, geometry: Geometry) -> usize {
        geometry.pixel_count() * self.bytes_per_pixel()
    }

    /// Whether a buffer of `len` bytes plausibly holds a full frame.
    ///
    /// RGB565 captures match on exact length only; 32-bit captures may carry
    /// trailing bytes from the capture transport, so any length at or above
    /// the expected size matches.
    fn matches(self, len: usize, geometry: Geometry) -> bool {
        match self {
            Self::Rgb565Le => len == self.expected_len(geometry),
            Self::Rgb32Le | Self::Rgba32 => len >= self.expected_len(geometry),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rgb565Le => "rgb565",
            Self::Rgb32Le => "rgb32",
            Self::Rgba32 => "rgba32",
        };
        f.write_str(name)
    }
}

/// Decoder format selection: trust the caller or infer from buffer length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatHint {
    /// Infer the encoding from buffer length relative to the geometry
    #[default]
    Auto,
    /// Decode as the given encoding without inspecting the length
    Exact(PixelFormat),
}

/// Outcome of format auto-detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDetection {
    /// Selected encoding
    pub format: PixelFormat,
    /// False when no candidate matched and the 32-bit fallback was assumed
    pub exact: bool,
}

// =============================================================================
// Format detection
// =============================================================================

/// Infer the pixel encoding of a raw capture from its byte length.
///
/// Candidates are tried in [`PixelFormat::DETECTION_ORDER`]; `fallback32`
/// stands in for the 32-bit slot, letting callers that know their source
/// emits explicit-byte-order RGBA prefer [`PixelFormat::Rgba32`].
///
/// A buffer matching no candidate falls back to `fallback32` with
/// `exact = false`. Capture over a lossy transport may truncate or pad the
/// stream, so the mismatch is deliberately not fatal here - the decoder
/// decides whether enough bytes remain to build a full grid.
pub fn detect_format(len: usize, geometry: Geometry, fallback32: PixelFormat) -> FormatDetection {
    for candidate in PixelFormat::DETECTION_ORDER {
        let format = if candidate.bytes_per_pixel() == 4 {
            fallback32
        } else {
            candidate
        };

        if format.matches(len, geometry) {
            return FormatDetection {
                format,
                exact: true,
            };
        }
    }

    FormatDetection {
        format: fallback32,
        exact: false,
    }
}

// =============================================================================
// PixelGrid
// =============================================================================

/// Canonical decoded frame: W*H RGB triples in row-major order.
///
/// Dimensions are fixed at construction and the pixel data is immutable
/// thereafter. Two grids are comparable only when their dimensions match
/// exactly; the diff engine enforces this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    geometry: Geometry,
    pixels: Vec<Rgb>,
}

impl PixelGrid {
    /// Build a grid from decoded pixels.
    ///
    /// # Panics
    ///
    /// Panics if `pixels.len()` differs from the geometry's pixel count.
    /// The decoder guarantees the exact count before constructing a grid;
    /// anything else is a programming error, not a capture artifact.
    pub fn from_pixels(geometry: Geometry, pixels: Vec<Rgb>) -> Self {
        assert_eq!(
            pixels.len(),
            geometry.pixel_count(),
            "Pixel count mismatch: got {} pixels for {} geometry",
            pixels.len(),
            geometry
        );
        Self { geometry, pixels }
    }

    /// Uniform single-color grid
    pub fn solid(geometry: Geometry, color: Rgb) -> Self {
        Self {
            geometry,
            pixels: vec![color; geometry.pixel_count()],
        }
    }

    /// Grid dimensions
    #[inline]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Width in pixels
    #[inline]
    pub fn width(&self) -> u32 {
        self.geometry.width
    }

    /// Height in pixels
    #[inline]
    pub fn height(&self) -> u32 {
        self.geometry.height
    }

    /// Total pixel count
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Pixel at (x, y)
    ///
    /// # Panics
    ///
    /// Panics if the coordinate lies outside the grid.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Rgb {
        assert!(
            x < self.geometry.width && y < self.geometry.height,
            "Pixel ({}, {}) out of bounds for {} grid",
            x,
            y,
            self.geometry
        );
        self.pixels[(y * self.geometry.width + x) as usize]
    }

    /// All pixels in row-major order
    #[inline]
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Render as an 8-bit RGB image for the reporting layer
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.geometry.width, self.geometry.height, |x, y| {
            let p = self.get(x, y);
            image::Rgb([p.r, p.g, p.b])
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
