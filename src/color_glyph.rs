//! A color glyph: artwork bound to codepoints, a name, and a glyph id.

use kurbo::{Affine, Rect};

use crate::artwork::{Artwork, PaintedLayer};
use crate::color::Color;
use crate::error::BuildError;
use crate::glyph::glyph_name;

/// The affine that maps artwork units onto the em square: y flipped (artwork
/// origin is top-left, font origin is baseline-up), each axis scaled so the
/// view box fills `upem`, and the view box origin anchored at the font origin.
pub fn font_space_transform(upem: u16, view_box: Rect) -> Affine {
    let upem = upem as f64;
    let sx = upem / view_box.width();
    let sy = upem / view_box.height();
    Affine::new([
        sx,
        0.0,
        0.0,
        -sy,
        -view_box.x0 * sx,
        upem + view_box.y0 * sy,
    ])
}

/// One input glyph, ready for encoding.
///
/// Immutable after construction except for `glyph_id`, which the embedded
/// document encoder reassigns exactly once to satisfy contiguity.
#[derive(Clone, Debug)]
pub struct ColorGlyph {
    pub filename: String,
    pub glyph_name: String,
    pub codepoints: Vec<u32>,
    pub artwork: Artwork,
    glyph_id: u16,
    font_transform: Affine,
}

impl ColorGlyph {
    pub fn create(
        upem: u16,
        filename: impl Into<String>,
        glyph_id: u16,
        codepoints: Vec<u32>,
        artwork: Artwork,
    ) -> Result<Self, BuildError> {
        let filename = filename.into();
        if codepoints.is_empty() {
            return Err(BuildError::NoCodepoints { filename });
        }
        let glyph_name = glyph_name(&codepoints);
        let font_transform = font_space_transform(upem, artwork.view_box);
        Ok(ColorGlyph {
            filename,
            glyph_name,
            codepoints,
            artwork,
            glyph_id,
            font_transform,
        })
    }

    pub fn glyph_id(&self) -> u16 {
        self.glyph_id
    }

    pub(crate) fn set_glyph_id(&mut self, glyph_id: u16) {
        self.glyph_id = glyph_id;
    }

    pub fn font_transform(&self) -> Affine {
        self.font_transform
    }

    pub fn layers(&self) -> &[PaintedLayer] {
        &self.artwork.layers
    }

    /// Every color mentioned by any layer, in z then stop order.
    pub fn colors(&self) -> impl Iterator<Item = Color> + '_ {
        self.artwork.layers.iter().flat_map(|l| l.paint.colors())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artwork::Artwork;

    fn square_artwork() -> Artwork {
        Artwork::new(Rect::new(0.0, 0.0, 128.0, 128.0), vec![])
    }

    #[test]
    fn transform_anchors_view_box_to_em_square() {
        let transform = font_space_transform(1024, Rect::new(0.0, 0.0, 128.0, 128.0));
        // top-left of the artwork lands at the top of the em square
        assert_eq!(transform * kurbo::Point::new(0.0, 0.0), kurbo::Point::new(0.0, 1024.0));
        // bottom-right lands at (upem, 0)
        assert_eq!(
            transform * kurbo::Point::new(128.0, 128.0),
            kurbo::Point::new(1024.0, 0.0)
        );
    }

    #[test]
    fn transform_handles_offset_view_box() {
        let transform = font_space_transform(1000, Rect::new(10.0, 10.0, 110.0, 110.0));
        assert_eq!(
            transform * kurbo::Point::new(10.0, 10.0),
            kurbo::Point::new(0.0, 1000.0)
        );
        assert_eq!(
            transform * kurbo::Point::new(110.0, 110.0),
            kurbo::Point::new(1000.0, 0.0)
        );
    }

    #[test]
    fn create_names_from_codepoints() {
        let glyph =
            ColorGlyph::create(1024, "emoji_u1f600.svg", 2, vec![0x1f600], square_artwork())
                .unwrap();
        assert_eq!(glyph.glyph_name, "emoji_1f600");
        assert_eq!(glyph.glyph_id(), 2);
    }

    #[test]
    fn create_requires_codepoints() {
        let err =
            ColorGlyph::create(1024, "mystery.svg", 2, vec![], square_artwork()).unwrap_err();
        assert_eq!(err.to_string(), "mystery.svg: no codepoints");
    }
}
