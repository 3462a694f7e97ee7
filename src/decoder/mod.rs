//! Framebuffer Decoder
//!
//! Converts a raw framebuffer capture of known or auto-detected encoding into
//! the canonical [`PixelGrid`]. This module handles:
//! - Format resolution from buffer length (with a documented 32-bit fallback)
//! - Bit-exact RGB565 / RGB32 / RGBA32 unpacking
//! - Tolerance of trailing capture bytes beyond the final pixel
//!
//! The one fatal condition is a buffer too short to reconstruct the claimed
//! geometry under the selected encoding ([`DecodeError::TruncatedBuffer`]);
//! a partially built grid is never returned. Each decode call is a pure
//! function of its inputs.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::pixel::{
    detect_format, FormatDetection, FormatHint, Geometry, PixelFormat, PixelGrid, Rgb,
};

// =============================================================================
// Types
// =============================================================================

/// Raw framebuffer capture: an immutable byte sequence plus the display
/// geometry it is claimed to represent.
///
/// The bytes have no inherent structure; interpretation depends entirely on
/// the encoding resolved at decode time. Produced by a capture collaborator
/// and consumed once by [`FramebufferDecoder::decode`].
#[derive(Debug, Clone)]
pub struct RawFramebuffer {
    data: Bytes,
    geometry: Geometry,
}

impl RawFramebuffer {
    /// Wrap captured bytes with their claimed geometry
    pub fn new(data: impl Into<Bytes>, geometry: Geometry) -> Self {
        Self {
            data: data.into(),
            geometry,
        }
    }

    /// Capture length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the capture is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Claimed display geometry
    #[inline]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Raw capture bytes
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Decoded frame: the canonical grid plus decode provenance
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Canonical pixel grid
    pub grid: PixelGrid,
    /// Encoding the bytes were decoded under
    pub format: PixelFormat,
    /// False when auto-detection matched no candidate and the 32-bit
    /// fallback was assumed; the grid decoded, but may not be trustworthy
    pub exact_format: bool,
}

/// Decode errors
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Buffer too short to reconstruct the claimed geometry
    #[error(
        "Truncated {format} buffer: {actual} bytes cannot fill {geometry} \
         ({expected} required, only {recoverable} of {total} pixels recoverable)"
    )]
    TruncatedBuffer {
        /// Encoding selected for the decode attempt
        format: PixelFormat,
        /// Claimed display geometry
        geometry: Geometry,
        /// Bytes required for a full frame in `format`
        expected: usize,
        /// Bytes actually captured
        actual: usize,
        /// Whole pixels the capture could have produced
        recoverable: usize,
        /// Pixels the geometry requires
        total: usize,
    },
}

// =============================================================================
// FramebufferDecoder
// =============================================================================

/// Decoder for raw framebuffer captures.
///
/// Stateless apart from its 32-bit fallback preference; safe to reuse across
/// any number of captures.
#[derive(Debug, Clone, Copy)]
pub struct FramebufferDecoder {
    fallback32: PixelFormat,
}

impl Default for FramebufferDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FramebufferDecoder {
    /// Decoder assuming word-order RGB32 for 32-bit data
    pub fn new() -> Self {
        Self {
            fallback32: PixelFormat::Rgb32Le,
        }
    }

    /// Decoder preferring explicit-byte-order RGBA when auto-detection
    /// reaches for a 32-bit encoding
    pub fn with_rgba_fallback() -> Self {
        Self {
            fallback32: PixelFormat::Rgba32,
        }
    }

    /// Decode a raw capture into the canonical pixel grid.
    ///
    /// With [`FormatHint::Auto`], the encoding is inferred from buffer
    /// length; a length matching no candidate is a soft failure that is
    /// logged and flagged on the result, not an error. Trailing bytes beyond
    /// the final pixel are ignored regardless of encoding.
    ///
    /// # Errors
    ///
    /// [`DecodeError::TruncatedBuffer`] if the capture is too short to
    /// produce every pixel of the claimed geometry under the selected
    /// encoding.
    pub fn decode(
        &self,
        raw: &RawFramebuffer,
        hint: FormatHint,
    ) -> Result<DecodedFrame, DecodeError> {
        let geometry = raw.geometry();

        let (format, exact) = match hint {
            FormatHint::Exact(format) => (format, true),
            FormatHint::Auto => {
                let FormatDetection { format, exact } =
                    detect_format(raw.len(), geometry, self.fallback32);

                if exact {
                    debug!(%format, len = raw.len(), "Detected framebuffer format");
                } else {
                    warn!(
                        len = raw.len(),
                        expected_rgb565 = PixelFormat::Rgb565Le.expected_len(geometry),
                        expected_32bit = format.expected_len(geometry),
                        assumed = %format,
                        "Capture length matches no known format, decoding under 32-bit assumption"
                    );
                }

                (format, exact)
            }
        };

        let grid = unpack(raw.data(), geometry, format)?;

        Ok(DecodedFrame {
            grid,
            format,
            exact_format: exact,
        })
    }
}

/// Unpack exactly `W*H` pixels from `data` under `format`.
///
/// Stops after the final pixel; excess input is ignored without error.
fn unpack(data: &[u8], geometry: Geometry, format: PixelFormat) -> Result<PixelGrid, DecodeError> {
    let total = geometry.pixel_count();
    let bpp = format.bytes_per_pixel();
    let recoverable = data.len() / bpp;

    if recoverable < total {
        return Err(DecodeError::TruncatedBuffer {
            format,
            geometry,
            expected: format.expected_len(geometry),
            actual: data.len(),
            recoverable,
            total,
        });
    }

    let mut pixels = Vec::with_capacity(total);

    match format {
        PixelFormat::Rgb565Le => {
            for word in data.chunks_exact(2).take(total) {
                let p = u16::from_le_bytes([word[0], word[1]]);
                // 5/6/5 -> 8 bits by left shift only; the low bits stay zero
                // to remain bit-exact with the panel's color depth
                pixels.push(Rgb::new(
                    (((p >> 11) & 0x1F) << 3) as u8,
                    (((p >> 5) & 0x3F) << 2) as u8,
                    ((p & 0x1F) << 3) as u8,
                ));
            }
        }
        PixelFormat::Rgb32Le => {
            for word in data.chunks_exact(4).take(total) {
                let p = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
                // Blue lives in the low byte; the top byte is padding
                pixels.push(Rgb::new(
                    ((p >> 16) & 0xFF) as u8,
                    ((p >> 8) & 0xFF) as u8,
                    (p & 0xFF) as u8,
                ));
            }
        }
        PixelFormat::Rgba32 => {
            for px in data.chunks_exact(4).take(total) {
                // px[3] is alpha, discarded
                pixels.push(Rgb::new(px[0], px[1], px[2]));
            }
        }
    }

    Ok(PixelGrid::from_pixels(geometry, pixels))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw(bytes: Vec<u8>, width: u32, height: u32) -> RawFramebuffer {
        RawFramebuffer::new(bytes, Geometry::new(width, height))
    }

    /// RGB565 words for the four primaries, little-endian on the wire
    fn rgb565_primaries() -> Vec<u8> {
        let words: [u16; 4] = [0xF800, 0x07E0, 0x001F, 0xFFFF];
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn test_rgb565_bit_expansion() {
        let decoder = FramebufferDecoder::new();
        let frame = decoder
            .decode(&raw(rgb565_primaries(), 4, 1), FormatHint::Auto)
            .unwrap();

        assert_eq!(frame.format, PixelFormat::Rgb565Le);
        assert!(frame.exact_format);
        assert_eq!(frame.grid.get(0, 0), Rgb::new(248, 0, 0));
        assert_eq!(frame.grid.get(1, 0), Rgb::new(0, 252, 0));
        assert_eq!(frame.grid.get(2, 0), Rgb::new(0, 0, 248));
        assert_eq!(frame.grid.get(3, 0), Rgb::new(248, 252, 248));
    }

    #[test]
    fn test_rgb565_channel_quantisation() {
        // Left-shift widening leaves every channel a multiple of 8 (r, b)
        // or 4 (g); intentional, not a rounding bug
        let bytes: Vec<u8> = (0u16..64).flat_map(|w| (w * 997).to_le_bytes()).collect();
        let decoder = FramebufferDecoder::new();
        let frame = decoder
            .decode(&raw(bytes, 8, 8), FormatHint::Auto)
            .unwrap();

        for p in frame.grid.pixels() {
            assert_eq!(p.r % 8, 0);
            assert_eq!(p.g % 4, 0);
            assert_eq!(p.b % 8, 0);
        }
    }

    #[test]
    fn test_rgb32_word_order() {
        // Little-endian word 0x44332211: blue in the low byte, top byte padding
        let decoder = FramebufferDecoder::new();
        let frame = decoder
            .decode(&raw(vec![0x11, 0x22, 0x33, 0x44], 1, 1), FormatHint::Auto)
            .unwrap();

        assert_eq!(frame.format, PixelFormat::Rgb32Le);
        assert_eq!(frame.grid.get(0, 0), Rgb::new(0x33, 0x22, 0x11));
    }

    #[test]
    fn test_rgba32_byte_order() {
        let decoder = FramebufferDecoder::new();
        let frame = decoder
            .decode(
                &raw(vec![0x11, 0x22, 0x33, 0x44], 1, 1),
                FormatHint::Exact(PixelFormat::Rgba32),
            )
            .unwrap();

        assert_eq!(frame.grid.get(0, 0), Rgb::new(0x11, 0x22, 0x33));
    }

    #[test]
    fn test_alpha_byte_never_decoded() {
        let opaque = vec![0x10, 0x20, 0x30, 0xFF, 0x40, 0x50, 0x60, 0xFF];
        let transparent = vec![0x10, 0x20, 0x30, 0x00, 0x40, 0x50, 0x60, 0x7B];

        let decoder = FramebufferDecoder::new();
        for hint in [
            FormatHint::Exact(PixelFormat::Rgb32Le),
            FormatHint::Exact(PixelFormat::Rgba32),
        ] {
            let a = decoder.decode(&raw(opaque.clone(), 2, 1), hint).unwrap();
            let b = decoder.decode(&raw(transparent.clone(), 2, 1), hint).unwrap();
            assert_eq!(a.grid, b.grid);
        }
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let exact = vec![0xAB; 4 * 6];
        let mut padded = exact.clone();
        padded.extend_from_slice(&[0xEE; 13]);

        let decoder = FramebufferDecoder::new();
        let a = decoder
            .decode(&raw(exact, 3, 2), FormatHint::Exact(PixelFormat::Rgb32Le))
            .unwrap();
        let b = decoder
            .decode(&raw(padded, 3, 2), FormatHint::Exact(PixelFormat::Rgb32Le))
            .unwrap();

        assert_eq!(a.grid, b.grid);
    }

    #[test]
    fn test_truncated_buffer_is_fatal() {
        // One byte short of the RGB565 size: detection falls back to 32-bit,
        // under which far too few pixels remain
        let geometry = Geometry::new(800, 480);
        let bytes = vec![0u8; PixelFormat::Rgb565Le.expected_len(geometry) - 1];

        let decoder = FramebufferDecoder::new();
        let err = decoder
            .decode(&RawFramebuffer::new(bytes, geometry), FormatHint::Auto)
            .unwrap_err();

        match err {
            DecodeError::TruncatedBuffer {
                format,
                recoverable,
                total,
                ..
            } => {
                assert_eq!(format, PixelFormat::Rgb32Le);
                assert_eq!(recoverable, (800 * 480 * 2 - 1) / 4);
                assert_eq!(total, 800 * 480);
            }
        }
    }

    #[test]
    fn test_explicit_hint_bypasses_detection() {
        // A buffer of exactly RGB565 length still decodes as RGB32 when the
        // caller says so, consuming half the pixels' worth of words
        let geometry = Geometry::new(2, 1);
        let bytes = vec![0x7F; 4];
        assert_eq!(bytes.len(), PixelFormat::Rgb565Le.expected_len(geometry));

        let decoder = FramebufferDecoder::new();
        let err = decoder
            .decode(
                &RawFramebuffer::new(bytes, geometry),
                FormatHint::Exact(PixelFormat::Rgb32Le),
            )
            .unwrap_err();

        assert!(matches!(err, DecodeError::TruncatedBuffer { .. }));
    }

    #[test]
    fn test_rgba_fallback_decoder() {
        let decoder = FramebufferDecoder::with_rgba_fallback();
        let frame = decoder
            .decode(&raw(vec![0x11, 0x22, 0x33, 0x44], 1, 1), FormatHint::Auto)
            .unwrap();

        assert_eq!(frame.format, PixelFormat::Rgba32);
        assert_eq!(frame.grid.get(0, 0), Rgb::new(0x11, 0x22, 0x33));
    }

    #[test]
    fn test_decode_is_deterministic() {
        let bytes: Vec<u8> = (0..128u32)
            .flat_map(|i| i.wrapping_mul(2654435761).to_le_bytes())
            .collect();
        let decoder = FramebufferDecoder::new();

        let a = decoder.decode(&raw(bytes.clone(), 16, 8), FormatHint::Auto).unwrap();
        let b = decoder.decode(&raw(bytes, 16, 8), FormatHint::Auto).unwrap();

        assert_eq!(a.grid, b.grid);
        assert_eq!(a.format, b.format);
    }

    proptest! {
        #[test]
        fn prop_alpha_invariance(
            rgb in proptest::collection::vec(any::<[u8; 3]>(), 12),
            alpha_a in proptest::collection::vec(any::<u8>(), 12),
            alpha_b in proptest::collection::vec(any::<u8>(), 12),
        ) {
            let assemble = |alphas: &[u8]| -> Vec<u8> {
                rgb.iter()
                    .zip(alphas)
                    .flat_map(|(px, a)| [px[0], px[1], px[2], *a])
                    .collect()
            };

            let decoder = FramebufferDecoder::new();
            let a = decoder
                .decode(&raw(assemble(&alpha_a), 4, 3), FormatHint::Auto)
                .unwrap();
            let b = decoder
                .decode(&raw(assemble(&alpha_b), 4, 3), FormatHint::Auto)
                .unwrap();

            prop_assert_eq!(a.grid, b.grid);
        }

        #[test]
        fn prop_rgb565_channels_quantised(words in proptest::collection::vec(any::<u16>(), 16)) {
            let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
            let decoder = FramebufferDecoder::new();
            let frame = decoder.decode(&raw(bytes, 4, 4), FormatHint::Auto).unwrap();

            for p in frame.grid.pixels() {
                prop_assert_eq!(p.r % 8, 0);
                prop_assert_eq!(p.g % 4, 0);
                prop_assert_eq!(p.b % 8, 0);
            }
        }
    }
}
