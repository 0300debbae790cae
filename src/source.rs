//! Source image capability consumed by the ingest pipeline.

use crate::animation::FrameMetadataReader;
use crate::error::EncodeError;
use crate::format::PixelFormat;
use crate::palette::PaletteQuery;
use crate::rect::Rect;

/// A borrowed pixel source: anything that can report its geometry and
/// format and copy a rectangle of pixels into a caller-provided buffer.
///
/// The pipeline borrows a source for the duration of a single ingest call
/// and never retains it. Implementations include decoded frames, the
/// output side of a [`FormatConverter`](crate::FormatConverter), and the
/// in-memory [`MemorySource`](crate::MemorySource).
pub trait BitmapSource {
    /// Image dimensions in pixels.
    fn size(&self) -> Result<(u32, u32), EncodeError>;

    /// Pixel format of the data served by [`copy_pixels`](Self::copy_pixels).
    fn pixel_format(&self) -> Result<PixelFormat, EncodeError>;

    /// Copy the pixels of `rect` into `buffer`, writing `stride` bytes per
    /// row. `buffer` must hold at least `stride * (rect.height - 1)` plus
    /// one packed row; trailing stride padding is left untouched.
    fn copy_pixels(&self, rect: Rect, stride: u32, buffer: &mut [u8]) -> Result<(), EncodeError>;

    /// The source palette, for indexed formats. Direct-color sources
    /// return `Ok(None)`.
    fn palette(&self) -> Result<Option<&dyn PaletteQuery>, EncodeError> {
        Ok(None)
    }

    /// Frame-level animation metadata, when the source is a decoded
    /// animation frame. Static sources return `None` and the extractor
    /// is skipped entirely.
    fn frame_metadata(&self) -> Option<&dyn FrameMetadataReader> {
        None
    }
}
