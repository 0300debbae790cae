//! The encode frame: ingest and commit.
//!
//! An [`EncodeFrame`] is the unit of work handed to the compression
//! engine. It moves through two states: empty, then ingested once
//! [`write_source`](EncodeFrame::write_source) has normalized and copied a
//! source image, and back to empty when
//! [`commit`](EncodeFrame::commit) hands everything to the container sink.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::mem;

use crate::animation::AnimationInfo;
use crate::convert::{ConverterFactory, convert_source};
use crate::error::EncodeError;
use crate::format::{FormatClass, PixelFormat, destination_for, negotiate};
use crate::metadata::{MetadataBlock, MetadataBlockReader, import_blocks};
use crate::raw::RawFrame;
use crate::rect::Rect;
use crate::source::BitmapSource;

/// The compression-engine boundary: receives one finished frame per
/// commit, taking ownership of the raw pixels, the animation data and the
/// metadata blocks.
pub trait ContainerSink: Send + Sync {
    /// Ingest one frame. Called exactly once per commit.
    fn add_image(
        &self,
        frame: RawFrame,
        animation: AnimationInfo,
        metadata: Vec<MetadataBlock>,
    ) -> Result<(), EncodeError>;
}

/// One frame's ingest-to-commit cycle.
///
/// The frame keeps its container alive through a shared handle for its
/// own lifetime. Conversion helpers are acquired from the factory per
/// ingest call and released when the call returns.
pub struct EncodeFrame {
    container: Arc<dyn ContainerSink>,
    converters: Arc<dyn ConverterFactory>,
    frame: Option<RawFrame>,
    animation: AnimationInfo,
    metadata: Vec<MetadataBlock>,
}

impl EncodeFrame {
    /// Create an empty frame bound to its container.
    pub fn new(container: Arc<dyn ContainerSink>, converters: Arc<dyn ConverterFactory>) -> Self {
        Self {
            container,
            converters,
            frame: None,
            animation: AnimationInfo::default(),
            metadata: Vec::new(),
        }
    }

    /// Whether a raw frame is currently populated.
    pub fn is_ingested(&self) -> bool {
        self.frame.is_some()
    }

    /// Animation data extracted by the last ingest.
    pub fn animation(&self) -> &AnimationInfo {
        &self.animation
    }

    /// Metadata blocks imported so far.
    pub fn metadata(&self) -> &[MetadataBlock] {
        &self.metadata
    }

    /// Format-negotiation probe: validates and possibly rewrites the
    /// requested format without touching any pixels.
    ///
    /// Supported (native or convertible) formats are left unchanged;
    /// anything else is rewritten to [`PixelFormat::Undefined`] and
    /// rejected.
    pub fn set_pixel_format(&self, format: &mut PixelFormat) -> Result<(), EncodeError> {
        negotiate(format)
    }

    /// Ingest a source image: extract animation data, validate the
    /// rectangle, normalize the pixel format, and copy the pixels into a
    /// fresh raw frame.
    ///
    /// `rect` defaults to the full image. Any failure leaves the frame
    /// empty — no partially built frame survives. Calling this again
    /// before [`commit`](Self::commit) replaces the previously ingested
    /// frame; the old buffer is dropped.
    pub fn write_source(
        &mut self,
        source: &dyn BitmapSource,
        rect: Option<Rect>,
    ) -> Result<(), EncodeError> {
        self.frame = None;
        // Stale animation data from a previous frame must never leak
        // forward; sources without frame metadata get the defaults.
        self.animation = match source.frame_metadata() {
            Some(reader) => AnimationInfo::from_reader(reader),
            None => AnimationInfo::default(),
        };

        let (image_width, image_height) = source.size()?;
        let rect = rect.unwrap_or_else(|| Rect::full(image_width, image_height));
        rect.validate(image_width, image_height)?;

        self.frame = Some(self.ingest(source, rect)?);
        Ok(())
    }

    fn ingest(&self, source: &dyn BitmapSource, rect: Rect) -> Result<RawFrame, EncodeError> {
        let source_format = source.pixel_format()?;

        let converted;
        let (image, frame_format): (&dyn BitmapSource, PixelFormat) = match source_format
            .classify()
        {
            FormatClass::Native => (source, source_format),
            FormatClass::Convertible => {
                let destination = destination_for(source_format, source.palette()?)?;
                converted = convert_source(&*self.converters, source, source_format, destination)?;
                // The converter reports the format it actually produced.
                let produced = converted.pixel_format()?;
                (&*converted, produced)
            }
            FormatClass::Unsupported => {
                return Err(EncodeError::UnsupportedPixelFormat(source_format));
            }
        };

        if !frame_format.is_canonical() {
            return Err(EncodeError::UnsupportedPixelFormat(frame_format));
        }

        // Rect was validated non-negative, so the casts hold.
        let mut frame = RawFrame::for_format(frame_format, rect.width as u32, rect.height as u32)?;
        frame.fill_from(image, rect)?;
        Ok(frame)
    }

    /// Import embedded metadata blocks (EXIF, XMP, ICC) from a source's
    /// block reader, appending to the frame's metadata list.
    ///
    /// Unrecognized or individually failing blocks are skipped; only an
    /// enumeration failure or an allocation failure aborts the call.
    pub fn import_metadata_blocks(
        &mut self,
        reader: &dyn MetadataBlockReader,
    ) -> Result<(), EncodeError> {
        import_blocks(reader, &mut self.metadata)
    }

    /// Hand the ingested frame, its animation data and its metadata to the
    /// container sink, returning the frame to the empty state.
    ///
    /// Fails with [`EncodeError::NotInitialized`] when nothing was
    /// ingested. Local state is cleared before the sink's result is
    /// returned: a failed sink call surfaces its error, but the payload is
    /// not retained for retry.
    pub fn commit(&mut self) -> Result<(), EncodeError> {
        let Some(frame) = self.frame.take() else {
            return Err(EncodeError::NotInitialized);
        };
        let animation = mem::take(&mut self.animation);
        let metadata = mem::take(&mut self.metadata);
        self.container.add_image(frame, animation, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{FormatConverter, MemoryConverterFactory};
    use crate::memory::{MemoryBlock, MemoryBlocks, MemorySource};
    use crate::metadata::MetadataFormat;
    use crate::palette::ColorTable;
    use alloc::boxed::Box;
    use alloc::vec;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use imgref::ImgVec;
    use rgb::{Gray, Rgb, Rgba};

    /// Sink recording every committed frame.
    #[derive(Default)]
    struct RecordingSink {
        frames: std::sync::Mutex<Vec<(RawFrame, AnimationInfo, Vec<MetadataBlock>)>>,
        fail: bool,
    }

    impl ContainerSink for RecordingSink {
        fn add_image(
            &self,
            frame: RawFrame,
            animation: AnimationInfo,
            metadata: Vec<MetadataBlock>,
        ) -> Result<(), EncodeError> {
            if self.fail {
                return Err(EncodeError::InvalidInput("sink refused the frame".into()));
            }
            self.frames.lock().unwrap().push((frame, animation, metadata));
            Ok(())
        }
    }

    /// Factory counting how many converters it was asked for.
    struct CountingFactory {
        inner: MemoryConverterFactory,
        created: AtomicUsize,
    }

    impl CountingFactory {
        fn new() -> Self {
            Self {
                inner: MemoryConverterFactory,
                created: AtomicUsize::new(0),
            }
        }
    }

    impl ConverterFactory for CountingFactory {
        fn create_converter(&self) -> Result<Box<dyn FormatConverter>, EncodeError> {
            self.created.fetch_add(1, Ordering::Relaxed);
            self.inner.create_converter()
        }
    }

    fn frame_with(sink: Arc<RecordingSink>, factory: Arc<CountingFactory>) -> EncodeFrame {
        EncodeFrame::new(sink, factory)
    }

    fn rgba_source(width: usize, height: usize) -> MemorySource {
        let pixels = (0..width * height)
            .map(|i| Rgba {
                r: i as u8,
                g: (i * 2) as u8,
                b: (i * 3) as u8,
                a: 255,
            })
            .collect();
        MemorySource::from_rgba8(ImgVec::new(pixels, width, height))
    }

    #[test]
    fn native_source_skips_conversion() {
        let sink = Arc::new(RecordingSink::default());
        let factory = Arc::new(CountingFactory::new());
        let mut frame = frame_with(sink.clone(), factory.clone());

        frame.write_source(&rgba_source(4, 4), None).unwrap();
        assert_eq!(factory.created.load(Ordering::Relaxed), 0);
        assert!(frame.is_ingested());

        frame.commit().unwrap();
        let committed = sink.frames.lock().unwrap();
        let (raw, animation, metadata) = &committed[0];
        assert_eq!(raw.bytes_per_pixel(), 4);
        assert_eq!(raw.stride(), 16);
        assert_eq!(*animation, AnimationInfo::default());
        assert!(metadata.is_empty());
    }

    #[test]
    fn convertible_source_is_normalized() {
        let sink = Arc::new(RecordingSink::default());
        let factory = Arc::new(CountingFactory::new());
        let mut frame = frame_with(sink.clone(), factory.clone());

        let source =
            MemorySource::from_packed(PixelFormat::Bgra32, 2, 1, vec![3, 2, 1, 9, 30, 20, 10, 90]);
        frame.write_source(&source, None).unwrap();
        assert_eq!(factory.created.load(Ordering::Relaxed), 1);

        frame.commit().unwrap();
        let committed = sink.frames.lock().unwrap();
        let (raw, _, _) = &committed[0];
        assert_eq!(raw.bytes_per_pixel(), 4);
        assert_eq!(raw.bytes(), &[1, 2, 3, 9, 10, 20, 30, 90]);
    }

    #[test]
    fn indexed_gray_palette_produces_gray_frame() {
        let sink = Arc::new(RecordingSink::default());
        let factory = Arc::new(CountingFactory::new());
        let mut frame = frame_with(sink.clone(), factory);

        let table = ColorTable::new(vec![
            Rgba { r: 0, g: 0, b: 0, a: 255 },
            Rgba { r: 128, g: 128, b: 128, a: 255 },
            Rgba { r: 255, g: 255, b: 255, a: 255 },
        ]);
        let source = MemorySource::from_indexed(PixelFormat::Indexed8, 3, 1, vec![0, 1, 2], table);
        frame.write_source(&source, None).unwrap();
        frame.commit().unwrap();

        let committed = sink.frames.lock().unwrap();
        let (raw, _, _) = &committed[0];
        assert_eq!(raw.bytes_per_pixel(), 1);
        assert_eq!(raw.bytes(), &[0, 128, 255]);
    }

    #[test]
    fn unsupported_source_rejected_before_allocation() {
        let sink = Arc::new(RecordingSink::default());
        let factory = Arc::new(CountingFactory::new());
        let mut frame = frame_with(sink, factory.clone());

        let source = MemorySource::from_packed(PixelFormat::Cmyk32, 1, 1, vec![0; 4]);
        let err = frame.write_source(&source, None).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::UnsupportedPixelFormat(PixelFormat::Cmyk32)
        ));
        assert_eq!(factory.created.load(Ordering::Relaxed), 0);
        assert!(!frame.is_ingested());
    }

    #[test]
    fn bad_rect_rejected() {
        let sink = Arc::new(RecordingSink::default());
        let mut frame = frame_with(sink, Arc::new(CountingFactory::new()));

        let source = rgba_source(4, 4);
        for rect in [Rect::new(-1, 0, 2, 2), Rect::new(2, 2, 4, 4)] {
            let err = frame.write_source(&source, Some(rect)).unwrap_err();
            assert!(matches!(err, EncodeError::InvalidRect { .. }));
            assert!(!frame.is_ingested());
        }
    }

    #[test]
    fn sub_rect_ingests_requested_window() {
        let sink = Arc::new(RecordingSink::default());
        let mut frame = frame_with(sink.clone(), Arc::new(CountingFactory::new()));

        let pixels = (0..16).map(Gray::new).collect::<Vec<_>>();
        let source = MemorySource::from_gray8(ImgVec::new(pixels, 4, 4));
        frame
            .write_source(&source, Some(Rect::new(1, 1, 2, 2)))
            .unwrap();
        frame.commit().unwrap();

        let committed = sink.frames.lock().unwrap();
        let (raw, _, _) = &committed[0];
        assert_eq!((raw.width(), raw.height()), (2, 2));
        assert_eq!(raw.bytes(), &[5, 6, 9, 10]);
    }

    #[test]
    fn rgb24_frame_rows_are_dib_aligned() {
        let sink = Arc::new(RecordingSink::default());
        let mut frame = frame_with(sink.clone(), Arc::new(CountingFactory::new()));

        let pixels = (0..5 * 2)
            .map(|i| Rgb {
                r: i as u8,
                g: i as u8,
                b: i as u8,
            })
            .collect::<Vec<_>>();
        let source = MemorySource::from_rgb8(ImgVec::new(pixels, 5, 2));
        frame.write_source(&source, None).unwrap();
        frame.commit().unwrap();

        let committed = sink.frames.lock().unwrap();
        let (raw, _, _) = &committed[0];
        assert_eq!(raw.stride(), 20);
        assert_eq!(raw.buffer_size(), 40);
        // Second row starts at the padded stride, not at byte 15.
        assert_eq!(raw.bytes()[20], 5);
    }

    #[test]
    fn failed_copy_leaves_frame_empty() {
        let sink = Arc::new(RecordingSink::default());
        let mut frame = frame_with(sink, Arc::new(CountingFactory::new()));

        let source = rgba_source(2, 2).failing_pixel_copy();
        assert!(frame.write_source(&source, None).is_err());
        assert!(!frame.is_ingested());
        assert!(matches!(frame.commit(), Err(EncodeError::NotInitialized)));
    }

    #[test]
    fn commit_without_ingest_fails() {
        let sink = Arc::new(RecordingSink::default());
        let mut frame = frame_with(sink, Arc::new(CountingFactory::new()));
        assert!(matches!(frame.commit(), Err(EncodeError::NotInitialized)));
    }

    #[test]
    fn commit_clears_state() {
        let sink = Arc::new(RecordingSink::default());
        let mut frame = frame_with(sink, Arc::new(CountingFactory::new()));

        let animated = rgba_source(2, 2)
            .with_tag(crate::animation::TAG_DELAY, crate::MetadataValue::U16(5));
        frame.write_source(&animated, None).unwrap();
        frame.commit().unwrap();

        // All three pieces of state are gone, animation included.
        assert!(matches!(frame.commit(), Err(EncodeError::NotInitialized)));
        assert_eq!(*frame.animation(), AnimationInfo::default());
        assert!(frame.metadata().is_empty());
    }

    #[test]
    fn sink_failure_still_clears_state() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..RecordingSink::default()
        });
        let mut frame = frame_with(sink, Arc::new(CountingFactory::new()));

        frame.write_source(&rgba_source(2, 2), None).unwrap();
        frame
            .import_metadata_blocks(&MemoryBlocks::new(vec![MemoryBlock::new(
                MetadataFormat::Exif,
                vec![1],
            )]))
            .unwrap();
        assert!(frame.commit().is_err());
        assert!(!frame.is_ingested());
        assert!(frame.metadata().is_empty());
    }

    #[test]
    fn animation_tags_read_per_frame() {
        let sink = Arc::new(RecordingSink::default());
        let mut frame = frame_with(sink.clone(), Arc::new(CountingFactory::new()));

        let animated = rgba_source(2, 2)
            .with_tag(crate::animation::TAG_DELAY, crate::MetadataValue::U16(5))
            .with_tag(crate::animation::TAG_LEFT, crate::MetadataValue::U16(1))
            .with_tag(
                crate::animation::TAG_TRANSPARENCY,
                crate::MetadataValue::Bool(true),
            );
        frame.write_source(&animated, None).unwrap();
        assert_eq!(frame.animation().delay_ms, 50);
        assert_eq!(frame.animation().left, 1);
        assert!(frame.animation().transparency);
        frame.commit().unwrap();

        // The next frame is static: nothing leaks forward.
        frame.write_source(&rgba_source(2, 2), None).unwrap();
        assert_eq!(*frame.animation(), AnimationInfo::default());
        frame.commit().unwrap();

        let committed = sink.frames.lock().unwrap();
        assert_eq!(committed[0].1.delay_ms, 50);
        assert_eq!(committed[1].1, AnimationInfo::default());
    }

    #[test]
    fn metadata_blocks_travel_with_commit() {
        let sink = Arc::new(RecordingSink::default());
        let mut frame = frame_with(sink.clone(), Arc::new(CountingFactory::new()));

        frame.write_source(&rgba_source(2, 2), None).unwrap();
        frame
            .import_metadata_blocks(&MemoryBlocks::new(vec![
                MemoryBlock::new(MetadataFormat::Exif, vec![1, 2, 3]),
                MemoryBlock::new(MetadataFormat::Other, vec![9]),
            ]))
            .unwrap();
        frame.commit().unwrap();

        let committed = sink.frames.lock().unwrap();
        let (_, _, metadata) = &committed[0];
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata[0].name, "eXif");
    }

    #[test]
    fn reingest_replaces_previous_frame() {
        let sink = Arc::new(RecordingSink::default());
        let mut frame = frame_with(sink.clone(), Arc::new(CountingFactory::new()));

        frame.write_source(&rgba_source(4, 4), None).unwrap();
        frame.write_source(&rgba_source(2, 2), None).unwrap();
        frame.commit().unwrap();

        let committed = sink.frames.lock().unwrap();
        assert_eq!(committed[0].0.width(), 2);
    }

    #[test]
    fn negotiation_probe_rewrites_unsupported() {
        let sink = Arc::new(RecordingSink::default());
        let frame = frame_with(sink, Arc::new(CountingFactory::new()));

        let mut format = PixelFormat::Bgr565;
        frame.set_pixel_format(&mut format).unwrap();
        assert_eq!(format, PixelFormat::Bgr565);

        let mut format = PixelFormat::Rgba64;
        assert!(frame.set_pixel_format(&mut format).is_err());
        assert_eq!(format, PixelFormat::Undefined);
    }
}
