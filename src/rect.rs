//! Pixel rectangles.

use crate::error::EncodeError;

/// A pixel rectangle within a source image.
///
/// Coordinates are signed so that malformed rectangles handed in by a
/// caller can be represented and rejected instead of silently wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Rect {
    /// Build a rectangle from its components.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The full-image rectangle for an image of the given size.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width: i32::try_from(width).unwrap_or(i32::MAX),
            height: i32::try_from(height).unwrap_or(i32::MAX),
        }
    }

    /// Validate against image bounds: every component non-negative and
    /// `x + width <= image_width`, `y + height <= image_height`.
    ///
    /// Runs before any conversion or allocation.
    pub fn validate(&self, image_width: u32, image_height: u32) -> Result<(), EncodeError> {
        let out_of_bounds = self.x < 0
            || self.y < 0
            || self.width < 0
            || self.height < 0
            || i64::from(self.x) + i64::from(self.width) > i64::from(image_width)
            || i64::from(self.y) + i64::from(self.height) > i64::from(image_height);
        if out_of_bounds {
            return Err(EncodeError::InvalidRect {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
                image_width,
                image_height,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_covers_image() {
        let rect = Rect::full(640, 480);
        assert_eq!(rect, Rect::new(0, 0, 640, 480));
        rect.validate(640, 480).unwrap();
    }

    #[test]
    fn negative_components_rejected() {
        for rect in [
            Rect::new(-1, 0, 4, 4),
            Rect::new(0, -1, 4, 4),
            Rect::new(0, 0, -4, 4),
            Rect::new(0, 0, 4, -4),
        ] {
            assert!(matches!(
                rect.validate(8, 8),
                Err(EncodeError::InvalidRect { .. })
            ));
        }
    }

    #[test]
    fn out_of_bounds_rejected() {
        assert!(Rect::new(5, 0, 4, 4).validate(8, 8).is_err());
        assert!(Rect::new(0, 5, 4, 4).validate(8, 8).is_err());
        // Exactly at the edge is fine.
        Rect::new(4, 4, 4, 4).validate(8, 8).unwrap();
    }

    #[test]
    fn sum_does_not_overflow() {
        // i32 x + width would overflow; the i64 check must still reject.
        assert!(Rect::new(i32::MAX, 0, i32::MAX, 1).validate(8, 8).is_err());
    }
}
