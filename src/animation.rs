//! Per-frame animation metadata, carried over from GIF-style semantics.

/// GIF image-descriptor tag for the frame's left placement offset.
pub const TAG_LEFT: &str = "/imgdesc/Left";
/// GIF image-descriptor tag for the frame's top placement offset.
pub const TAG_TOP: &str = "/imgdesc/Top";
/// GIF graphic-control tag for the frame disposal mode.
pub const TAG_DISPOSAL: &str = "/grctlext/Disposal";
/// GIF graphic-control tag for the frame delay, in centiseconds.
pub const TAG_DELAY: &str = "/grctlext/Delay";
/// GIF graphic-control tag for the transparency flag.
pub const TAG_TRANSPARENCY: &str = "/grctlext/TransparencyFlag";

/// A dynamically-typed metadata value returned by a
/// [`FrameMetadataReader`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetadataValue {
    /// Unsigned 8-bit.
    U8(u8),
    /// Unsigned 16-bit.
    U16(u16),
    /// Unsigned 32-bit.
    U32(u32),
    /// Boolean.
    Bool(bool),
}

impl MetadataValue {
    /// The value if it is exactly `U8`; type mismatch collapses to `None`.
    pub fn as_u8(self) -> Option<u8> {
        match self {
            MetadataValue::U8(v) => Some(v),
            _ => None,
        }
    }

    /// The value if it is exactly `U16`; type mismatch collapses to `None`.
    pub fn as_u16(self) -> Option<u16> {
        match self {
            MetadataValue::U16(v) => Some(v),
            _ => None,
        }
    }

    /// The value if it is exactly `Bool`; type mismatch collapses to `None`.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            MetadataValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}

/// Best-effort lookup of frame-level metadata by tag name.
///
/// Absent tags return `None`. Readers never fail the ingest: a lookup
/// error on the implementor's side is reported as absence.
pub trait FrameMetadataReader {
    /// The value stored under `tag`, if any.
    fn value(&self, tag: &str) -> Option<MetadataValue>;
}

/// Animation timing and compositing data for one frame.
///
/// Defaults to a static frame: zero offsets, disposal 0, no delay, no
/// transparency. Reset at the start of every ingest so values from a
/// previous frame never leak forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnimationInfo {
    /// Placement offset from the left canvas edge.
    pub left: u16,
    /// Placement offset from the top canvas edge.
    pub top: u16,
    /// GIF disposal mode.
    pub disposal: u8,
    /// Frame delay in milliseconds.
    pub delay_ms: u32,
    /// Whether the frame uses a transparent color.
    pub transparency: bool,
}

impl AnimationInfo {
    /// Read animation fields from `reader`, best-effort.
    ///
    /// Every lookup is independent: a missing or wrong-typed value leaves
    /// the field at its default. The source delay is in 10 ms ticks and is
    /// scaled to milliseconds here.
    pub fn from_reader(reader: &dyn FrameMetadataReader) -> Self {
        let mut info = Self::default();
        if let Some(left) = reader.value(TAG_LEFT).and_then(MetadataValue::as_u16) {
            info.left = left;
        }
        if let Some(top) = reader.value(TAG_TOP).and_then(MetadataValue::as_u16) {
            info.top = top;
        }
        if let Some(disposal) = reader.value(TAG_DISPOSAL).and_then(MetadataValue::as_u8) {
            info.disposal = disposal;
        }
        if let Some(delay) = reader.value(TAG_DELAY).and_then(MetadataValue::as_u16) {
            info.delay_ms = u32::from(delay) * 10;
        }
        if let Some(transparency) = reader
            .value(TAG_TRANSPARENCY)
            .and_then(MetadataValue::as_bool)
        {
            info.transparency = transparency;
        }
        info
    }
}
