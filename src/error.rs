//! Unified error type for frame ingestion.

use alloc::boxed::Box;
use alloc::string::String;

use crate::format::PixelFormat;

/// Unified error type for frame ingestion, metadata import, and PAM I/O.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EncodeError {
    /// Input validation failed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Rectangle is malformed or does not fit the source image.
    #[error(
        "rectangle ({x}, {y}) {width}x{height} does not fit a {image_width}x{image_height} image"
    )]
    InvalidRect {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        image_width: u32,
        image_height: u32,
    },
    /// Source format is neither canonical nor in the convertible set,
    /// or the conversion capability check failed.
    #[error("unsupported pixel format {0:?}")]
    UnsupportedPixelFormat(PixelFormat),
    /// Allocation failure.
    #[error("out of memory")]
    Oom,
    /// Commit attempted without an ingested frame.
    #[error("no frame has been ingested")]
    NotInitialized,
    /// File I/O failure.
    #[cfg(feature = "std")]
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// Failure surfaced unchanged from a collaborator.
    #[error("{context}: {source}")]
    Source {
        context: &'static str,
        source: Box<dyn core::error::Error + Send + Sync>,
    },
}

impl EncodeError {
    /// Wrap a collaborator-specific error.
    pub fn from_source<E>(context: &'static str, error: E) -> Self
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        EncodeError::Source {
            context,
            source: Box::new(error),
        }
    }
}
