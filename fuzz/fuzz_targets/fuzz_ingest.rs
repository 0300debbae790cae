#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use wicflif::{
    AnimationInfo, ContainerSink, EncodeError, EncodeFrame, MemoryConverterFactory,
    MemorySource, MetadataBlock, PixelFormat, RawFrame, Rect,
};

struct Discard;

impl ContainerSink for Discard {
    fn add_image(
        &self,
        frame: RawFrame,
        _animation: AnimationInfo,
        _metadata: Vec<MetadataBlock>,
    ) -> Result<(), EncodeError> {
        // Committed frames always satisfy the stride contract.
        assert_eq!(
            frame.buffer_size(),
            frame.stride() as usize * frame.height() as usize
        );
        Ok(())
    }
}

const FORMATS: &[PixelFormat] = &[
    PixelFormat::Rgba32,
    PixelFormat::Rgb24,
    PixelFormat::Gray8,
    PixelFormat::BlackWhite,
    PixelFormat::Gray2,
    PixelFormat::Gray4,
    PixelFormat::Bgra32,
    PixelFormat::Bgra5551,
    PixelFormat::Bgr555,
    PixelFormat::Bgr565,
    PixelFormat::Bgr24,
    PixelFormat::Rgb32,
    PixelFormat::Bgr32,
];

// Ingest-and-commit must never panic, whatever the source looks like.
fuzz_target!(|data: &[u8]| {
    let [fmt, w, h, rx, ry, rw, rh, pixels @ ..] = data else {
        return;
    };
    let format = FORMATS[*fmt as usize % FORMATS.len()];
    let width = u32::from(*w % 32) + 1;
    let height = u32::from(*h % 32) + 1;

    let row_bytes = (width as usize * format.bits_per_pixel() as usize).div_ceil(8);
    let needed = row_bytes * height as usize;
    if pixels.len() < needed {
        return;
    }

    let source = MemorySource::from_packed(format, width, height, pixels[..needed].to_vec());
    let mut frame = EncodeFrame::new(Arc::new(Discard), Arc::new(MemoryConverterFactory));

    let rect = Rect::new(
        i32::from(*rx as i8),
        i32::from(*ry as i8),
        i32::from(*rw as i8),
        i32::from(*rh as i8),
    );
    let _ = frame.write_source(&source, Some(rect));
    let _ = frame.write_source(&source, None);
    let _ = frame.commit();
});
