//! RGBA colors with a total order, so palettes sort deterministically.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// An RGBA color.
///
/// Alpha is kept separate from the channel bytes because palette entries may
/// or may not carry it depending on the encoding version. The derived ordering
/// (red, green, blue, alpha) is what palette construction sorts by.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: OrderedFloat<f32>,
}

impl Color {
    pub fn new(red: u8, green: u8, blue: u8, alpha: f32) -> Self {
        Color {
            red,
            green,
            blue,
            alpha: OrderedFloat(alpha),
        }
    }

    /// A fully opaque color from channel bytes.
    pub fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Color::new(red, green, blue, 1.0)
    }

    /// The same color with alpha discarded.
    pub fn opaque(self) -> Self {
        Color {
            alpha: OrderedFloat(1.0),
            ..self
        }
    }

    pub fn is_opaque(self) -> bool {
        self.alpha.0 >= 1.0
    }

    /// Alpha scaled to a byte, for palette color records.
    pub fn alpha_u8(self) -> u8 {
        (self.alpha.0.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    /// CSS hex form of the channel bytes; alpha is expressed separately
    /// (`fill-opacity`) in generated documents.
    pub fn to_css(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_by_channel_then_alpha() {
        let mut colors = vec![
            Color::rgb(0xff, 0x00, 0x00),
            Color::rgb(0x00, 0xff, 0x00),
            Color::new(0x00, 0xff, 0x00, 0.5),
            Color::rgb(0x00, 0x00, 0xff),
        ];
        colors.sort();
        assert_eq!(
            colors,
            vec![
                Color::rgb(0x00, 0x00, 0xff),
                Color::new(0x00, 0xff, 0x00, 0.5),
                Color::rgb(0x00, 0xff, 0x00),
                Color::rgb(0xff, 0x00, 0x00),
            ]
        );
    }

    #[test]
    fn opaque_drops_alpha() {
        assert_eq!(
            Color::new(1, 2, 3, 0.25).opaque(),
            Color::rgb(1, 2, 3)
        );
    }

    #[test]
    fn css_hex() {
        assert_eq!(Color::rgb(0x12, 0xab, 0x05).to_css(), "#12ab05");
        assert_eq!(Color::new(0, 0, 0, 0.5).to_css(), "#000000");
    }

    #[test]
    fn alpha_byte() {
        assert_eq!(Color::rgb(0, 0, 0).alpha_u8(), 255);
        assert_eq!(Color::new(0, 0, 0, 0.5).alpha_u8(), 128);
    }
}
