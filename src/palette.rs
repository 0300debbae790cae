//! Palette capability for indexed pixel formats.

use alloc::vec::Vec;
use rgb::Rgba;

use crate::error::EncodeError;

/// Capability exposed by indexed sources: answer the three introspection
/// queries that drive destination-format inference, and look entries up
/// for conversion.
///
/// The query methods are fallible because palettes may live behind an
/// external decoder; failures propagate to the caller unchanged.
pub trait PaletteQuery {
    /// Whether any entry is not fully opaque.
    fn has_alpha(&self) -> Result<bool, EncodeError>;
    /// Whether every entry has equal red, green and blue channels.
    fn is_grayscale(&self) -> Result<bool, EncodeError>;
    /// Whether the palette is exactly opaque black and white.
    fn is_black_white(&self) -> Result<bool, EncodeError>;
    /// Entry at `index`, or `None` past the end of the table.
    fn color(&self, index: usize) -> Option<Rgba<u8>>;
}

/// An owned color table backing in-memory indexed sources.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColorTable {
    entries: Vec<Rgba<u8>>,
}

impl ColorTable {
    /// Build a table from RGBA entries.
    pub fn new(entries: Vec<Rgba<u8>>) -> Self {
        Self { entries }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in index order.
    pub fn entries(&self) -> &[Rgba<u8>] {
        &self.entries
    }
}

impl PaletteQuery for ColorTable {
    fn has_alpha(&self) -> Result<bool, EncodeError> {
        Ok(self.entries.iter().any(|c| c.a != u8::MAX))
    }

    fn is_grayscale(&self) -> Result<bool, EncodeError> {
        Ok(self.entries.iter().all(|c| c.r == c.g && c.g == c.b))
    }

    fn is_black_white(&self) -> Result<bool, EncodeError> {
        Ok(self.entries.iter().all(|c| {
            c.a == u8::MAX
                && ((c.r, c.g, c.b) == (0, 0, 0) || (c.r, c.g, c.b) == (255, 255, 255))
        }))
    }

    fn color(&self, index: usize) -> Option<Rgba<u8>> {
        self.entries.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn rgba(r: u8, g: u8, b: u8, a: u8) -> Rgba<u8> {
        Rgba { r, g, b, a }
    }

    #[test]
    fn alpha_detection() {
        let opaque = ColorTable::new(vec![rgba(1, 2, 3, 255); 4]);
        assert!(!opaque.has_alpha().unwrap());

        let translucent = ColorTable::new(vec![rgba(1, 2, 3, 255), rgba(1, 2, 3, 128)]);
        assert!(translucent.has_alpha().unwrap());
    }

    #[test]
    fn grayscale_detection() {
        let gray = ColorTable::new(vec![rgba(0, 0, 0, 255), rgba(77, 77, 77, 255)]);
        assert!(gray.is_grayscale().unwrap());
        assert!(!gray.is_black_white().unwrap());

        let color = ColorTable::new(vec![rgba(10, 20, 30, 255)]);
        assert!(!color.is_grayscale().unwrap());
    }

    #[test]
    fn black_white_detection() {
        let bw = ColorTable::new(vec![rgba(0, 0, 0, 255), rgba(255, 255, 255, 255)]);
        assert!(bw.is_black_white().unwrap());
        assert!(bw.is_grayscale().unwrap());
    }

    #[test]
    fn lookup_past_end() {
        let table = ColorTable::new(vec![rgba(1, 2, 3, 255)]);
        assert_eq!(table.color(0), Some(rgba(1, 2, 3, 255)));
        assert_eq!(table.color(1), None);
    }
}
