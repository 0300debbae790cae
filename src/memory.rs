//! In-memory pixel sources.
//!
//! [`MemorySource`] adapts typed `rgb`/`imgref` buffers, packed byte rows,
//! and indexed data to the [`BitmapSource`] capability, and can carry
//! frame-metadata tags and metadata blocks. It backs the crate's tests and
//! gives tooling (like the PAM reader) a way to feed files through the
//! ingest pipeline.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use imgref::ImgVec;
use rgb::alt::BGRA;
use rgb::{ComponentBytes, Gray, Rgb, Rgba};

use crate::animation::{FrameMetadataReader, MetadataValue};
use crate::error::EncodeError;
use crate::format::PixelFormat;
use crate::metadata::{MetadataBlockReader, MetadataBlockSource, MetadataFormat};
use crate::palette::{ColorTable, PaletteQuery};
use crate::rect::Rect;
use crate::source::BitmapSource;

/// Copy `rect` out of packed rows into a strided destination.
///
/// `src` holds `src_row_bytes` bytes per row with pixels packed at
/// `bits_per_pixel`. For sub-byte formats the rectangle's left edge must
/// fall on a byte boundary; the copy moves whole bytes, so trailing bits
/// of a partial last byte come along.
pub(crate) fn copy_rows(
    src: &[u8],
    src_row_bytes: usize,
    rect: Rect,
    bits_per_pixel: usize,
    stride: u32,
    dst: &mut [u8],
) -> Result<(), EncodeError> {
    let x_bits = rect.x as usize * bits_per_pixel;
    if x_bits % 8 != 0 {
        return Err(EncodeError::InvalidInput(
            "rectangle is not byte-aligned for this format".into(),
        ));
    }
    let x_bytes = x_bits / 8;
    let copy_bytes = (rect.width as usize * bits_per_pixel).div_ceil(8);
    let stride = stride as usize;
    let height = rect.height as usize;
    if stride < copy_bytes {
        return Err(EncodeError::InvalidInput(
            "stride smaller than a packed row".into(),
        ));
    }
    if height > 0 && dst.len() < (height - 1) * stride + copy_bytes {
        return Err(EncodeError::InvalidInput(
            "destination buffer too small".into(),
        ));
    }
    for row in 0..height {
        let src_off = (rect.y as usize + row) * src_row_bytes + x_bytes;
        let src_end = src_off + copy_bytes;
        if src_end > src.len() {
            return Err(EncodeError::InvalidInput("source buffer too small".into()));
        }
        let dst_off = row * stride;
        dst[dst_off..dst_off + copy_bytes].copy_from_slice(&src[src_off..src_end]);
    }
    Ok(())
}

/// An owned, in-memory [`BitmapSource`].
pub struct MemorySource {
    format: PixelFormat,
    width: u32,
    height: u32,
    /// Packed rows, `ceil(width * bits_per_pixel / 8)` bytes each.
    bytes: Vec<u8>,
    table: Option<ColorTable>,
    tags: BTreeMap<String, MetadataValue>,
    fail_copy: bool,
}

impl MemorySource {
    fn new(format: PixelFormat, width: u32, height: u32, bytes: Vec<u8>) -> Self {
        debug_assert_eq!(
            bytes.len() as u64,
            (u64::from(width) * u64::from(format.bits_per_pixel())).div_ceil(8) * u64::from(height)
        );
        Self {
            format,
            width,
            height,
            bytes,
            table: None,
            tags: BTreeMap::new(),
            fail_copy: false,
        }
    }

    /// Wrap a typed RGBA-32 buffer.
    pub fn from_rgba8(img: ImgVec<Rgba<u8>>) -> Self {
        let (buf, w, h) = img.as_ref().to_contiguous_buf();
        Self::new(PixelFormat::Rgba32, w as u32, h as u32, buf.as_bytes().to_vec())
    }

    /// Wrap a typed RGB-24 buffer.
    pub fn from_rgb8(img: ImgVec<Rgb<u8>>) -> Self {
        let (buf, w, h) = img.as_ref().to_contiguous_buf();
        Self::new(PixelFormat::Rgb24, w as u32, h as u32, buf.as_bytes().to_vec())
    }

    /// Wrap a typed Gray-8 buffer.
    pub fn from_gray8(img: ImgVec<Gray<u8>>) -> Self {
        let (buf, w, h) = img.as_ref().to_contiguous_buf();
        Self::new(PixelFormat::Gray8, w as u32, h as u32, buf.as_bytes().to_vec())
    }

    /// Wrap a typed BGRA-32 buffer.
    pub fn from_bgra8(img: ImgVec<BGRA<u8>>) -> Self {
        let (buf, w, h) = img.as_ref().to_contiguous_buf();
        Self::new(PixelFormat::Bgra32, w as u32, h as u32, buf.as_bytes().to_vec())
    }

    /// Wrap packed rows in any direct-color format. Rows are
    /// `ceil(width * bits_per_pixel / 8)` bytes, MSB-first for sub-byte
    /// formats.
    pub fn from_packed(format: PixelFormat, width: u32, height: u32, bytes: Vec<u8>) -> Self {
        Self::new(format, width, height, bytes)
    }

    /// Wrap packed palette indices plus their color table.
    pub fn from_indexed(
        format: PixelFormat,
        width: u32,
        height: u32,
        indices: Vec<u8>,
        table: ColorTable,
    ) -> Self {
        let mut source = Self::new(format, width, height, indices);
        source.table = Some(table);
        source
    }

    /// Attach a frame-metadata tag, making the source look like a decoded
    /// animation frame.
    pub fn with_tag(mut self, tag: &str, value: MetadataValue) -> Self {
        self.tags.insert(tag.into(), value);
        self
    }

    /// Make [`copy_pixels`](BitmapSource::copy_pixels) fail. Test hook for
    /// mid-pipeline failure handling.
    pub fn failing_pixel_copy(mut self) -> Self {
        self.fail_copy = true;
        self
    }
}

impl BitmapSource for MemorySource {
    fn size(&self) -> Result<(u32, u32), EncodeError> {
        Ok((self.width, self.height))
    }

    fn pixel_format(&self) -> Result<PixelFormat, EncodeError> {
        Ok(self.format)
    }

    fn copy_pixels(&self, rect: Rect, stride: u32, buffer: &mut [u8]) -> Result<(), EncodeError> {
        if self.fail_copy {
            return Err(EncodeError::InvalidInput("pixel copy failed".into()));
        }
        rect.validate(self.width, self.height)?;
        let bits = self.format.bits_per_pixel() as usize;
        let row_bytes = (self.width as usize * bits).div_ceil(8);
        copy_rows(&self.bytes, row_bytes, rect, bits, stride, buffer)
    }

    fn palette(&self) -> Result<Option<&dyn PaletteQuery>, EncodeError> {
        Ok(self.table.as_ref().map(|t| t as &dyn PaletteQuery))
    }

    fn frame_metadata(&self) -> Option<&dyn FrameMetadataReader> {
        if self.tags.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl FrameMetadataReader for MemorySource {
    fn value(&self, tag: &str) -> Option<MetadataValue> {
        self.tags.get(tag).copied()
    }
}

/// An owned metadata block serving the [`MetadataBlockSource`] capability.
pub struct MemoryBlock {
    format: MetadataFormat,
    data: Vec<u8>,
    fail_serialize: bool,
}

impl MemoryBlock {
    /// A block with the given format tag and payload.
    pub fn new(format: MetadataFormat, data: Vec<u8>) -> Self {
        Self {
            format,
            data,
            fail_serialize: false,
        }
    }

    /// Make serialization fail. Test hook for per-block skip semantics.
    pub fn failing_serialization(mut self) -> Self {
        self.fail_serialize = true;
        self
    }
}

impl MetadataBlockSource for MemoryBlock {
    fn format(&self) -> Result<MetadataFormat, EncodeError> {
        Ok(self.format)
    }

    fn serialized_size(&self) -> Result<usize, EncodeError> {
        Ok(self.data.len())
    }

    fn read_into(&self, buffer: &mut [u8]) -> Result<(), EncodeError> {
        if self.fail_serialize {
            return Err(EncodeError::InvalidInput("serialization failed".into()));
        }
        buffer.copy_from_slice(&self.data);
        Ok(())
    }
}

/// An enumerable list of [`MemoryBlock`]s.
pub struct MemoryBlocks {
    blocks: Vec<MemoryBlock>,
}

impl MemoryBlocks {
    /// Wrap a list of blocks.
    pub fn new(blocks: Vec<MemoryBlock>) -> Self {
        Self { blocks }
    }
}

impl MetadataBlockReader for MemoryBlocks {
    fn count(&self) -> Result<usize, EncodeError> {
        Ok(self.blocks.len())
    }

    fn block(&self, index: usize) -> Result<&dyn MetadataBlockSource, EncodeError> {
        self.blocks
            .get(index)
            .map(|b| b as &dyn MetadataBlockSource)
            .ok_or_else(|| EncodeError::InvalidInput("block index out of range".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn strided_sub_rect_copy() {
        let pixels = (0u8..16).map(Gray::new).collect::<Vec<_>>();
        let source = MemorySource::from_gray8(ImgVec::new(pixels, 4, 4));

        // Copy a 2x2 window at stride 5; padding bytes stay untouched.
        let mut buffer = vec![0xAA; 7];
        source
            .copy_pixels(Rect::new(1, 1, 2, 2), 5, &mut buffer)
            .unwrap();
        assert_eq!(buffer, vec![5, 6, 0xAA, 0xAA, 0xAA, 9, 10]);
    }

    #[test]
    fn undersized_buffer_rejected() {
        let pixels = (0u8..4).map(Gray::new).collect::<Vec<_>>();
        let source = MemorySource::from_gray8(ImgVec::new(pixels, 2, 2));
        let mut buffer = vec![0; 3];
        assert!(source
            .copy_pixels(Rect::full(2, 2), 2, &mut buffer)
            .is_err());
    }

    #[test]
    fn unaligned_sub_byte_rect_rejected() {
        let source = MemorySource::from_packed(PixelFormat::Gray4, 4, 1, vec![0x12, 0x34]);
        let mut buffer = vec![0; 2];
        // x = 1 starts mid-byte at 4 bits per pixel.
        assert!(source
            .copy_pixels(Rect::new(1, 0, 2, 1), 2, &mut buffer)
            .is_err());
        // x = 2 is byte-aligned.
        source
            .copy_pixels(Rect::new(2, 0, 2, 1), 1, &mut buffer[..1])
            .unwrap();
        assert_eq!(buffer[0], 0x34);
    }

    #[test]
    fn bgra_buffer_packs_in_memory_order() {
        let img = ImgVec::new(
            vec![BGRA {
                b: 1u8,
                g: 2,
                r: 3,
                a: 4,
            }],
            1,
            1,
        );
        let source = MemorySource::from_bgra8(img);
        assert_eq!(source.pixel_format().unwrap(), PixelFormat::Bgra32);
        let mut buffer = vec![0; 4];
        source.copy_pixels(Rect::full(1, 1), 4, &mut buffer).unwrap();
        assert_eq!(buffer, vec![1, 2, 3, 4]);
    }

    #[test]
    fn static_source_exposes_no_frame_metadata() {
        let source = MemorySource::from_gray8(ImgVec::new(vec![Gray::new(0u8)], 1, 1));
        assert!(source.frame_metadata().is_none());

        let animated = source.with_tag(crate::animation::TAG_DELAY, MetadataValue::U16(3));
        let reader = animated.frame_metadata().unwrap();
        assert_eq!(
            reader.value(crate::animation::TAG_DELAY),
            Some(MetadataValue::U16(3))
        );
    }

    #[test]
    fn copy_rows_moves_partial_trailing_byte() {
        // 3 pixels at 4bpp pack to 2 bytes: the second byte's low nibble
        // belongs to a neighbor and is copied along.
        let src = [0xAB, 0xCD];
        let mut dst = [0u8; 2];
        copy_rows(&src, 2, Rect::new(0, 0, 3, 1), 4, 2, &mut dst).unwrap();
        assert_eq!(dst, [0xAB, 0xCD]);
    }
}
