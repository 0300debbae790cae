//! Pixel format identifiers and classification.
//!
//! Every [`PixelFormat`] falls into exactly one of three classes: natively
//! supported by the FLIF frame layout (RGBA-32, RGB-24, Gray-8), convertible
//! through an external [`FormatConverter`](crate::FormatConverter), or
//! unsupported.

use crate::error::EncodeError;
use crate::palette::PaletteQuery;

/// An in-memory pixel encoding: channel count, bit depth, channel order,
/// and indexed-vs-direct color.
///
/// Multi-byte packings (`Bgr555`, `Bgr565`, `Bgra5551`) are little-endian
/// 16-bit words with blue in the low bits. Sub-byte formats pack pixels
/// MSB-first within each byte.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// No format negotiated. Never accepted by the pipeline.
    Undefined,
    /// 8-bit red, green, blue, alpha. Canonical.
    Rgba32,
    /// 8-bit red, green, blue. Canonical.
    Rgb24,
    /// 8-bit grayscale. Canonical.
    Gray8,
    /// 1-bit black/white, 1 = white.
    BlackWhite,
    /// 2-bit grayscale.
    Gray2,
    /// 4-bit grayscale.
    Gray4,
    /// 8-bit blue, green, red, alpha.
    Bgra32,
    /// 16-bit word: 5 bits each blue/green/red, 1 alpha bit in the MSB.
    Bgra5551,
    /// 16-bit word: 5 bits each blue/green/red, MSB unused.
    Bgr555,
    /// 16-bit word: 5 bits blue, 6 green, 5 red.
    Bgr565,
    /// 8-bit blue, green, red.
    Bgr24,
    /// 8-bit red, green, blue plus a padding byte.
    Rgb32,
    /// 8-bit blue, green, red plus a padding byte.
    Bgr32,
    /// 1-bit palette index.
    Indexed1,
    /// 2-bit palette index.
    Indexed2,
    /// 4-bit palette index.
    Indexed4,
    /// 8-bit palette index.
    Indexed8,
    /// 16-bit red, green, blue, alpha. Not supported.
    Rgba64,
    /// 8-bit cyan, magenta, yellow, black. Not supported.
    Cmyk32,
    /// 32-bit float grayscale. Not supported.
    GrayF32,
}

/// Outcome of classifying a [`PixelFormat`] against the pipeline's
/// capabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatClass {
    /// One of the three canonical layouts; no conversion needed.
    Native,
    /// Convertible to a canonical layout through a format converter.
    Convertible,
    /// Rejected by the pipeline.
    Unsupported,
}

impl PixelFormat {
    /// Whether this is one of the three canonical frame layouts.
    pub fn is_canonical(self) -> bool {
        matches!(
            self,
            PixelFormat::Rgba32 | PixelFormat::Rgb24 | PixelFormat::Gray8
        )
    }

    /// Whether pixels are palette indices rather than direct color.
    pub fn is_indexed(self) -> bool {
        matches!(
            self,
            PixelFormat::Indexed1
                | PixelFormat::Indexed2
                | PixelFormat::Indexed4
                | PixelFormat::Indexed8
        )
    }

    /// Whether the format carries an alpha channel.
    pub fn has_alpha(self) -> bool {
        matches!(
            self,
            PixelFormat::Rgba32 | PixelFormat::Bgra32 | PixelFormat::Bgra5551 | PixelFormat::Rgba64
        )
    }

    /// Classify this format against the pipeline's capabilities.
    pub fn classify(self) -> FormatClass {
        if self.is_canonical() {
            return FormatClass::Native;
        }
        match self {
            PixelFormat::BlackWhite
            | PixelFormat::Gray2
            | PixelFormat::Gray4
            | PixelFormat::Bgra32
            | PixelFormat::Bgra5551
            | PixelFormat::Bgr555
            | PixelFormat::Bgr565
            | PixelFormat::Bgr24
            | PixelFormat::Rgb32
            | PixelFormat::Bgr32
            | PixelFormat::Indexed1
            | PixelFormat::Indexed2
            | PixelFormat::Indexed4
            | PixelFormat::Indexed8 => FormatClass::Convertible,
            _ => FormatClass::Unsupported,
        }
    }

    /// Storage bits per pixel.
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Undefined => 0,
            PixelFormat::BlackWhite | PixelFormat::Indexed1 => 1,
            PixelFormat::Gray2 | PixelFormat::Indexed2 => 2,
            PixelFormat::Gray4 | PixelFormat::Indexed4 => 4,
            PixelFormat::Gray8 | PixelFormat::Indexed8 => 8,
            PixelFormat::Bgra5551 | PixelFormat::Bgr555 | PixelFormat::Bgr565 => 16,
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => 24,
            PixelFormat::Rgba32
            | PixelFormat::Bgra32
            | PixelFormat::Rgb32
            | PixelFormat::Bgr32
            | PixelFormat::Cmyk32
            | PixelFormat::GrayF32 => 32,
            PixelFormat::Rgba64 => 64,
        }
    }

    /// Bytes per pixel for canonical formats; `None` otherwise.
    pub fn bytes_per_pixel(self) -> Option<u8> {
        match self {
            PixelFormat::Rgba32 => Some(4),
            PixelFormat::Rgb24 => Some(3),
            PixelFormat::Gray8 => Some(1),
            _ => None,
        }
    }
}

/// Compute the canonical destination format for a convertible source.
///
/// Indexed sources require a palette; the palette decides between RGBA-32
/// (palette carries alpha), Gray-8 (palette is grayscale or black/white)
/// and RGB-24. Palette query failures propagate unchanged.
///
/// Canonical sources map to themselves. Anything outside the convertible
/// set is rejected with [`EncodeError::UnsupportedPixelFormat`].
pub fn destination_for(
    source: PixelFormat,
    palette: Option<&dyn PaletteQuery>,
) -> Result<PixelFormat, EncodeError> {
    if source.is_canonical() {
        return Ok(source);
    }
    match source {
        PixelFormat::BlackWhite | PixelFormat::Gray2 | PixelFormat::Gray4 => Ok(PixelFormat::Gray8),
        PixelFormat::Bgra32 | PixelFormat::Bgra5551 => Ok(PixelFormat::Rgba32),
        PixelFormat::Bgr555
        | PixelFormat::Bgr565
        | PixelFormat::Bgr24
        | PixelFormat::Rgb32
        | PixelFormat::Bgr32 => Ok(PixelFormat::Rgb24),
        PixelFormat::Indexed1
        | PixelFormat::Indexed2
        | PixelFormat::Indexed4
        | PixelFormat::Indexed8 => {
            let palette = palette.ok_or_else(|| {
                EncodeError::InvalidInput("indexed source exposes no palette".into())
            })?;
            if palette.has_alpha()? {
                return Ok(PixelFormat::Rgba32);
            }
            if palette.is_grayscale()? || palette.is_black_white()? {
                return Ok(PixelFormat::Gray8);
            }
            Ok(PixelFormat::Rgb24)
        }
        other => Err(EncodeError::UnsupportedPixelFormat(other)),
    }
}

/// Pixel-format negotiation entry point.
///
/// A native or convertible request is left unchanged. Anything else is
/// rewritten to [`PixelFormat::Undefined`] and rejected. This is a pure
/// probe: no palette inspection, no I/O.
pub fn negotiate(format: &mut PixelFormat) -> Result<(), EncodeError> {
    match format.classify() {
        FormatClass::Native | FormatClass::Convertible => Ok(()),
        FormatClass::Unsupported => {
            let rejected = *format;
            *format = PixelFormat::Undefined;
            Err(EncodeError::UnsupportedPixelFormat(rejected))
        }
    }
}
