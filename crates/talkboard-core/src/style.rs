//! Stroke color and width.

use peniko::Color;
use serde::{Deserialize, Serialize};

/// Default stroke width used by the canvas.
pub const DEFAULT_STROKE_WIDTH: f64 = 1.5;

/// Serializable stroke color (RGBA8).
///
/// On the wire a color travels as a packed `u32` in `0xRRGGBBAA` order,
/// see [`StrokeColor::to_packed`] and [`StrokeColor::from_packed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrokeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl StrokeColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    /// Pack into `0xRRGGBBAA`.
    pub fn to_packed(self) -> u32 {
        u32::from_be_bytes([self.r, self.g, self.b, self.a])
    }

    /// Unpack from `0xRRGGBBAA`.
    pub fn from_packed(packed: u32) -> Self {
        let [r, g, b, a] = packed.to_be_bytes();
        Self { r, g, b, a }
    }
}

impl Default for StrokeColor {
    fn default() -> Self {
        Self::black()
    }
}

impl From<Color> for StrokeColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<StrokeColor> for Color {
    fn from(color: StrokeColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Style applied to strokes drawn on a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    /// Color for new strokes.
    pub color: StrokeColor,
    /// Line width used for every stroke.
    pub width: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: StrokeColor::black(),
            width: DEFAULT_STROKE_WIDTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_layout() {
        let color = StrokeColor::new(0x12, 0x34, 0x56, 0x78);
        assert_eq!(color.to_packed(), 0x1234_5678);
        assert_eq!(StrokeColor::from_packed(0x1234_5678), color);
    }

    #[test]
    fn test_black_is_opaque() {
        assert_eq!(StrokeColor::black().to_packed(), 0x0000_00ff);
        assert_eq!(StrokeColor::default(), StrokeColor::black());
    }

    #[test]
    fn test_peniko_conversion() {
        let color = StrokeColor::new(200, 100, 50, 255);
        let peniko_color: Color = color.into();
        assert_eq!(StrokeColor::from(peniko_color), color);
    }

    #[test]
    fn test_default_style() {
        let style = StrokeStyle::default();
        assert_eq!(style.color, StrokeColor::black());
        assert!((style.width - DEFAULT_STROKE_WIDTH).abs() < f64::EPSILON);
    }
}
