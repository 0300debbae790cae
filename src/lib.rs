//! # wicflif
//!
//! Frame ingestion for a FLIF encoder: normalize arbitrary pixel sources
//! into the three layouts the compression engine accepts (RGBA-32,
//! RGB-24, Gray-8), extract per-frame animation data, and stage metadata
//! blocks, then hand the whole frame to a container sink in one commit.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use wicflif::{
//!     AnimationInfo, ContainerSink, EncodeError, EncodeFrame, ImgVec,
//!     MemoryConverterFactory, MemorySource, MetadataBlock, RawFrame, Rect,
//! };
//!
//! struct Discard;
//!
//! impl ContainerSink for Discard {
//!     fn add_image(
//!         &self,
//!         _frame: RawFrame,
//!         _animation: AnimationInfo,
//!         _metadata: Vec<MetadataBlock>,
//!     ) -> Result<(), EncodeError> {
//!         Ok(())
//!     }
//! }
//!
//! let source = MemorySource::from_gray8(ImgVec::new(vec![rgb::Gray(0u8); 16], 4, 4));
//! let mut frame = EncodeFrame::new(Arc::new(Discard), Arc::new(MemoryConverterFactory));
//! frame.write_source(&source, Some(Rect::full(4, 4)))?;
//! frame.commit()?;
//! # Ok::<(), EncodeError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod animation;
pub mod convert;
pub mod error;
pub mod format;
pub mod frame;
pub mod memory;
pub mod metadata;
pub mod palette;
#[cfg(feature = "std")]
pub mod pam;
pub mod raw;
pub mod rect;
pub mod source;

pub use animation::{AnimationInfo, FrameMetadataReader, MetadataValue};
pub use convert::{
    ConverterFactory, DitherMode, FormatConverter, MemoryConverter, MemoryConverterFactory,
    PaletteKind,
};
pub use error::EncodeError;
pub use format::{destination_for, negotiate, FormatClass, PixelFormat};
pub use frame::{ContainerSink, EncodeFrame};
pub use memory::{MemoryBlock, MemoryBlocks, MemorySource};
pub use metadata::{MetadataBlock, MetadataBlockReader, MetadataBlockSource, MetadataFormat};
pub use palette::{ColorTable, PaletteQuery};
#[cfg(feature = "std")]
pub use pam::PamImage;
pub use raw::RawFrame;
pub use rect::Rect;
pub use source::BitmapSource;

pub use imgref::{ImgRef, ImgVec};
pub use rgb::{Rgb, Rgba};
