//! Canonical raw frame buffers.

use alloc::vec::Vec;

use crate::error::EncodeError;
use crate::format::PixelFormat;
use crate::rect::Rect;
use crate::source::BitmapSource;

/// A raw pixel buffer in one of the three canonical layouts, owned by an
/// [`EncodeFrame`](crate::EncodeFrame) until commit hands it to the
/// container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    width: u32,
    height: u32,
    bytes_per_pixel: u8,
    stride: u32,
    buffer: Vec<u8>,
}

impl RawFrame {
    /// Bytes per row for `format` at the given width.
    ///
    /// RGB-24 rows are padded to 4-byte boundaries (DIB alignment). This
    /// rule is load-bearing: the compression engine reads rows at this
    /// stride, and a tightly-packed 24-bit row corrupts every image whose
    /// width is not a multiple of 4.
    pub fn stride_for(format: PixelFormat, width: u32) -> Result<u32, EncodeError> {
        let wide = u64::from(width);
        let stride = match format {
            PixelFormat::Rgba32 => wide * 4,
            PixelFormat::Rgb24 => 4 * ((24 * wide + 31) / 32),
            PixelFormat::Gray8 => wide,
            other => return Err(EncodeError::UnsupportedPixelFormat(other)),
        };
        u32::try_from(stride).map_err(|_| EncodeError::Oom)
    }

    /// Allocate a zeroed frame for `format` with the given pixel size.
    ///
    /// Allocation failure surfaces as [`EncodeError::Oom`] and leaves
    /// nothing allocated.
    pub fn for_format(format: PixelFormat, width: u32, height: u32) -> Result<Self, EncodeError> {
        let stride = Self::stride_for(format, width)?;
        let bytes_per_pixel = format
            .bytes_per_pixel()
            .ok_or(EncodeError::UnsupportedPixelFormat(format))?;
        let size = usize::try_from(u64::from(stride) * u64::from(height))
            .map_err(|_| EncodeError::Oom)?;
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(size).map_err(|_| EncodeError::Oom)?;
        buffer.resize(size, 0);
        Ok(Self {
            width,
            height,
            bytes_per_pixel,
            stride,
            buffer,
        })
    }

    /// Copy the pixels of `rect` from `source` into this frame at the
    /// frame's stride. Copy failures propagate; the caller discards the
    /// partially written frame.
    pub fn fill_from(
        &mut self,
        source: &dyn BitmapSource,
        rect: Rect,
    ) -> Result<(), EncodeError> {
        source.copy_pixels(rect, self.stride, &mut self.buffer)
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per pixel: 4, 3 or 1.
    pub fn bytes_per_pixel(&self) -> u8 {
        self.bytes_per_pixel
    }

    /// Bytes per row, including alignment padding.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Total buffer size: stride times height.
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// The pixel bytes, row-major at [`stride`](Self::stride).
    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the frame, returning the pixel bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}
