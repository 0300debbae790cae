//! Embedded metadata blocks (EXIF, XMP, ICC) and their import.

use alloc::vec::Vec;

use crate::error::EncodeError;

/// Format tag of an embedded metadata block, as reported by a source's
/// block reader.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetadataFormat {
    /// EXIF payload.
    Exif,
    /// XMP packet.
    Xmp,
    /// ICC profile chunk.
    IccChunk,
    /// Anything the importer does not recognize. Skipped.
    Other,
}

impl MetadataFormat {
    /// The FLIF chunk name for this format, or `None` if unrecognized.
    pub fn chunk_name(self) -> Option<&'static str> {
        match self {
            MetadataFormat::Exif => Some("eXif"),
            MetadataFormat::Xmp => Some("eXmp"),
            MetadataFormat::IccChunk => Some("iCCP"),
            MetadataFormat::Other => None,
        }
    }
}

/// A named metadata byte buffer owned by a frame until commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataBlock {
    /// FLIF chunk name: `"eXif"`, `"eXmp"` or `"iCCP"`.
    pub name: &'static str,
    /// Serialized block contents.
    pub data: Vec<u8>,
}

/// One metadata block on the source side, serializable to bytes.
///
/// The split between [`serialized_size`](Self::serialized_size) and
/// [`read_into`](Self::read_into) mirrors sources that persist through a
/// seekable stream: the destination buffer is sized from the stream's
/// reported size before the bytes are copied out.
pub trait MetadataBlockSource {
    /// Format tag of this block.
    fn format(&self) -> Result<MetadataFormat, EncodeError>;
    /// Size in bytes of the serialized block.
    fn serialized_size(&self) -> Result<usize, EncodeError>;
    /// Serialize the block into `buffer`, which is exactly
    /// [`serialized_size`](Self::serialized_size) bytes long.
    fn read_into(&self, buffer: &mut [u8]) -> Result<(), EncodeError>;
}

/// Enumerable list of metadata blocks exposed by a source.
pub trait MetadataBlockReader {
    /// Number of blocks.
    fn count(&self) -> Result<usize, EncodeError>;
    /// Block at `index`, `0 <= index < count()`.
    fn block(&self, index: usize) -> Result<&dyn MetadataBlockSource, EncodeError>;
}

/// Import every recognized block from `reader`, appending to `out`.
///
/// Per-block failures (format query, size query, serialization) skip that
/// block and continue; the import never aborts for one bad block. Two
/// exceptions are fatal to the whole call: a failing `count()` and an
/// allocation failure for a block's buffer ([`EncodeError::Oom`]).
pub(crate) fn import_blocks(
    reader: &dyn MetadataBlockReader,
    out: &mut Vec<MetadataBlock>,
) -> Result<(), EncodeError> {
    let count = reader.count()?;
    for index in 0..count {
        let Ok(block) = reader.block(index) else {
            continue;
        };
        let Ok(format) = block.format() else {
            continue;
        };
        let Some(name) = format.chunk_name() else {
            continue;
        };
        let Ok(size) = block.serialized_size() else {
            continue;
        };
        let mut data = Vec::new();
        data.try_reserve_exact(size).map_err(|_| EncodeError::Oom)?;
        data.resize(size, 0);
        if block.read_into(&mut data).is_err() {
            continue;
        }
        out.push(MetadataBlock { name, data });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBlock, MemoryBlocks};
    use alloc::vec;

    #[test]
    fn chunk_names() {
        assert_eq!(MetadataFormat::Exif.chunk_name(), Some("eXif"));
        assert_eq!(MetadataFormat::Xmp.chunk_name(), Some("eXmp"));
        assert_eq!(MetadataFormat::IccChunk.chunk_name(), Some("iCCP"));
        assert_eq!(MetadataFormat::Other.chunk_name(), None);
    }

    #[test]
    fn unknown_blocks_skipped() {
        let reader = MemoryBlocks::new(vec![
            MemoryBlock::new(MetadataFormat::Exif, vec![1, 2, 3]),
            MemoryBlock::new(MetadataFormat::Other, vec![9, 9]),
        ]);
        let mut out = Vec::new();
        import_blocks(&reader, &mut out).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "eXif");
        assert_eq!(out[0].data, vec![1, 2, 3]);
    }

    #[test]
    fn failing_block_skipped_others_kept() {
        let reader = MemoryBlocks::new(vec![
            MemoryBlock::new(MetadataFormat::Xmp, vec![5; 4]).failing_serialization(),
            MemoryBlock::new(MetadataFormat::IccChunk, vec![7; 8]),
        ]);
        let mut out = Vec::new();
        import_blocks(&reader, &mut out).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "iCCP");
    }
}
