//! Format conversion: capability traits, the conversion driver, and a
//! reference in-memory converter.
//!
//! Conversion uses nearest-content semantics: no dithering and no palette
//! re-quantization. The palette hint passed at initialization only matters
//! when a converter must synthesize a palette, which never applies to the
//! direct-color destinations used here.

use alloc::boxed::Box;
use alloc::vec::Vec;
use rgb::Rgba;

use crate::error::EncodeError;
use crate::format::{FormatClass, PixelFormat};
use crate::palette::PaletteQuery;
use crate::rect::Rect;
use crate::source::BitmapSource;

/// Dithering applied when reducing color resolution.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DitherMode {
    /// No dithering; nearest color wins.
    #[default]
    None,
    /// 8x8 ordered dither.
    Ordered8x8,
    /// Error-diffusion dither.
    ErrorDiffusion,
}

/// How a converter should synthesize a palette, when one is needed.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaletteKind {
    /// Median-cut over the source colors.
    #[default]
    MedianCut,
    /// Fixed 256-entry gray ramp.
    FixedGray,
    /// Fixed halftone web palette.
    FixedHalftone,
}

/// External format-conversion capability.
///
/// A converter is created unconfigured, checked with
/// [`can_convert`](Self::can_convert), then bound to a source with
/// [`initialize`](Self::initialize). After initialization it acts as a
/// [`BitmapSource`] exposing the same content in the destination format.
///
/// `initialize` only borrows the source for the duration of the call, so
/// implementations convert eagerly into an internal buffer.
pub trait FormatConverter: BitmapSource {
    /// Whether this converter can turn `source` pixels into `destination`.
    fn can_convert(
        &self,
        source: PixelFormat,
        destination: PixelFormat,
    ) -> Result<bool, EncodeError>;

    /// Bind to `source` and convert its content to `destination`.
    ///
    /// `palette`, `palette_fraction` and `palette_kind` are hints for
    /// converters that must synthesize a destination palette; they are
    /// ignored for direct-color destinations.
    fn initialize(
        &mut self,
        source: &dyn BitmapSource,
        destination: PixelFormat,
        dither: DitherMode,
        palette: Option<&dyn PaletteQuery>,
        palette_fraction: f64,
        palette_kind: PaletteKind,
    ) -> Result<(), EncodeError>;
}

/// Creates one [`FormatConverter`] per ingest call.
pub trait ConverterFactory: Send + Sync {
    /// A fresh, unconfigured converter.
    fn create_converter(&self) -> Result<Box<dyn FormatConverter>, EncodeError>;
}

/// Normalize `source` into `destination` using a converter from `factory`.
///
/// The capability check runs before initialization; a failing query or a
/// `false` answer both reject the source format. On success the returned
/// converter serves the converted image for the rest of the pipeline.
pub(crate) fn convert_source(
    factory: &dyn ConverterFactory,
    source: &dyn BitmapSource,
    source_format: PixelFormat,
    destination: PixelFormat,
) -> Result<Box<dyn FormatConverter>, EncodeError> {
    let mut converter = factory.create_converter()?;
    match converter.can_convert(source_format, destination) {
        Ok(true) => {}
        Ok(false) | Err(_) => {
            return Err(EncodeError::UnsupportedPixelFormat(source_format));
        }
    }
    converter.initialize(
        source,
        destination,
        DitherMode::None,
        None,
        0.0,
        PaletteKind::MedianCut,
    )?;
    Ok(converter)
}

/// Reference converter covering the whole convertible allow-list.
///
/// Decodes the source into RGBA, then re-packs to the requested canonical
/// destination. Grayscale output uses integer BT.601 luma, which is exact
/// for achromatic input. Indexed sources are resolved through the source's
/// own palette.
#[derive(Default)]
pub struct MemoryConverter {
    output: Option<Converted>,
}

struct Converted {
    width: u32,
    height: u32,
    format: PixelFormat,
    /// Packed rows, `width * bytes_per_pixel` bytes each.
    bytes: Vec<u8>,
}

impl MemoryConverter {
    /// A fresh, unconfigured converter.
    pub fn new() -> Self {
        Self::default()
    }

    fn decode_rgba(
        source: &dyn BitmapSource,
        format: PixelFormat,
        width: u32,
        height: u32,
    ) -> Result<Vec<Rgba<u8>>, EncodeError> {
        let bits = format.bits_per_pixel();
        // Dimensions come from an arbitrary source; size the buffer in
        // wide checked arithmetic so a hostile report cannot wrap it.
        let row_bytes = (u64::from(width) * u64::from(bits)).div_ceil(8);
        let total = row_bytes
            .checked_mul(u64::from(height))
            .and_then(|n| usize::try_from(n).ok())
            .ok_or(EncodeError::Oom)?;
        let stride = u32::try_from(row_bytes).map_err(|_| EncodeError::Oom)?;
        let mut packed = Vec::new();
        packed.try_reserve_exact(total).map_err(|_| EncodeError::Oom)?;
        packed.resize(total, 0);
        source.copy_pixels(Rect::full(width, height), stride, &mut packed)?;

        let palette = source.palette()?;
        let lookup = |index: usize| -> Result<Rgba<u8>, EncodeError> {
            palette
                .ok_or_else(|| {
                    EncodeError::InvalidInput("indexed source exposes no palette".into())
                })?
                .color(index)
                .ok_or_else(|| EncodeError::InvalidInput("palette index out of range".into()))
        };

        let pixel_count = usize::try_from(u64::from(width) * u64::from(height))
            .map_err(|_| EncodeError::Oom)?;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(pixel_count)
            .map_err(|_| EncodeError::Oom)?;
        let row_bytes = row_bytes as usize;
        for y in 0..height as usize {
            let row = &packed[y * row_bytes..(y + 1) * row_bytes];
            for x in 0..width as usize {
                pixels.push(decode_pixel(format, row, x, &lookup)?);
            }
        }
        Ok(pixels)
    }

    fn encode(
        pixels: &[Rgba<u8>],
        destination: PixelFormat,
    ) -> Result<Vec<u8>, EncodeError> {
        let bpp = destination
            .bytes_per_pixel()
            .ok_or(EncodeError::UnsupportedPixelFormat(destination))?;
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(pixels.len() * bpp as usize)
            .map_err(|_| EncodeError::Oom)?;
        match destination {
            PixelFormat::Rgba32 => {
                for p in pixels {
                    bytes.extend_from_slice(&[p.r, p.g, p.b, p.a]);
                }
            }
            PixelFormat::Rgb24 => {
                for p in pixels {
                    bytes.extend_from_slice(&[p.r, p.g, p.b]);
                }
            }
            PixelFormat::Gray8 => {
                for p in pixels {
                    bytes.push(luma(*p));
                }
            }
            other => return Err(EncodeError::UnsupportedPixelFormat(other)),
        }
        Ok(bytes)
    }
}

impl FormatConverter for MemoryConverter {
    fn can_convert(
        &self,
        source: PixelFormat,
        destination: PixelFormat,
    ) -> Result<bool, EncodeError> {
        Ok(source.classify() != FormatClass::Unsupported && destination.is_canonical())
    }

    fn initialize(
        &mut self,
        source: &dyn BitmapSource,
        destination: PixelFormat,
        _dither: DitherMode,
        _palette: Option<&dyn PaletteQuery>,
        _palette_fraction: f64,
        _palette_kind: PaletteKind,
    ) -> Result<(), EncodeError> {
        let (width, height) = source.size()?;
        let source_format = source.pixel_format()?;
        let pixels = Self::decode_rgba(source, source_format, width, height)?;
        let bytes = Self::encode(&pixels, destination)?;
        self.output = Some(Converted {
            width,
            height,
            format: destination,
            bytes,
        });
        Ok(())
    }
}

impl BitmapSource for MemoryConverter {
    fn size(&self) -> Result<(u32, u32), EncodeError> {
        let out = self.output.as_ref().ok_or(EncodeError::NotInitialized)?;
        Ok((out.width, out.height))
    }

    fn pixel_format(&self) -> Result<PixelFormat, EncodeError> {
        let out = self.output.as_ref().ok_or(EncodeError::NotInitialized)?;
        Ok(out.format)
    }

    fn copy_pixels(&self, rect: Rect, stride: u32, buffer: &mut [u8]) -> Result<(), EncodeError> {
        let out = self.output.as_ref().ok_or(EncodeError::NotInitialized)?;
        rect.validate(out.width, out.height)?;
        let bpp = out.format.bytes_per_pixel().unwrap_or(0) as usize;
        crate::memory::copy_rows(
            &out.bytes,
            out.width as usize * bpp,
            rect,
            bpp * 8,
            stride,
            buffer,
        )
    }
}

/// Factory handing out [`MemoryConverter`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryConverterFactory;

impl ConverterFactory for MemoryConverterFactory {
    fn create_converter(&self) -> Result<Box<dyn FormatConverter>, EncodeError> {
        Ok(Box::new(MemoryConverter::new()))
    }
}

/// Integer BT.601 luma. Exact for r == g == b.
fn luma(p: Rgba<u8>) -> u8 {
    ((77 * u32::from(p.r) + 150 * u32::from(p.g) + 29 * u32::from(p.b)) >> 8) as u8
}

/// Expand a 5-bit channel to 8 bits by bit replication.
fn expand5(v: u16) -> u8 {
    (((v & 0x1F) << 3) | ((v & 0x1F) >> 2)) as u8
}

/// Expand a 6-bit channel to 8 bits by bit replication.
fn expand6(v: u16) -> u8 {
    (((v & 0x3F) << 2) | ((v & 0x3F) >> 4)) as u8
}

/// Read bits for pixel `x` from a sub-byte packed row, MSB-first.
fn sub_byte(row: &[u8], x: usize, bits: usize) -> u8 {
    let bit_offset = x * bits;
    let byte = row[bit_offset / 8];
    let shift = 8 - bits - (bit_offset % 8);
    (byte >> shift) & ((1 << bits) - 1)
}

fn decode_pixel(
    format: PixelFormat,
    row: &[u8],
    x: usize,
    lookup: &dyn Fn(usize) -> Result<Rgba<u8>, EncodeError>,
) -> Result<Rgba<u8>, EncodeError> {
    let opaque = |r, g, b| Rgba { r, g, b, a: 255 };
    let word = |x: usize| u16::from_le_bytes([row[x * 2], row[x * 2 + 1]]);
    let pixel = match format {
        PixelFormat::Rgba32 => Rgba {
            r: row[x * 4],
            g: row[x * 4 + 1],
            b: row[x * 4 + 2],
            a: row[x * 4 + 3],
        },
        PixelFormat::Rgb24 => opaque(row[x * 3], row[x * 3 + 1], row[x * 3 + 2]),
        PixelFormat::Gray8 => {
            let v = row[x];
            opaque(v, v, v)
        }
        PixelFormat::BlackWhite => {
            let v = if sub_byte(row, x, 1) != 0 { 255 } else { 0 };
            opaque(v, v, v)
        }
        PixelFormat::Gray2 => {
            let v = sub_byte(row, x, 2) * 85;
            opaque(v, v, v)
        }
        PixelFormat::Gray4 => {
            let v = sub_byte(row, x, 4) * 17;
            opaque(v, v, v)
        }
        PixelFormat::Bgra32 => Rgba {
            r: row[x * 4 + 2],
            g: row[x * 4 + 1],
            b: row[x * 4],
            a: row[x * 4 + 3],
        },
        PixelFormat::Bgr24 => opaque(row[x * 3 + 2], row[x * 3 + 1], row[x * 3]),
        PixelFormat::Rgb32 => opaque(row[x * 4], row[x * 4 + 1], row[x * 4 + 2]),
        PixelFormat::Bgr32 => opaque(row[x * 4 + 2], row[x * 4 + 1], row[x * 4]),
        PixelFormat::Bgr555 => {
            let w = word(x);
            opaque(expand5(w >> 10), expand5(w >> 5), expand5(w))
        }
        PixelFormat::Bgr565 => {
            let w = word(x);
            opaque(expand5(w >> 11), expand6(w >> 5), expand5(w))
        }
        PixelFormat::Bgra5551 => {
            let w = word(x);
            Rgba {
                r: expand5(w >> 10),
                g: expand5(w >> 5),
                b: expand5(w),
                a: if w & 0x8000 != 0 { 255 } else { 0 },
            }
        }
        PixelFormat::Indexed1 => lookup(sub_byte(row, x, 1) as usize)?,
        PixelFormat::Indexed2 => lookup(sub_byte(row, x, 2) as usize)?,
        PixelFormat::Indexed4 => lookup(sub_byte(row, x, 4) as usize)?,
        PixelFormat::Indexed8 => lookup(row[x] as usize)?,
        other => return Err(EncodeError::UnsupportedPixelFormat(other)),
    };
    Ok(pixel)
}
