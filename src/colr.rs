//! Layered palette encoding: color glyphs become z-ordered lists of outline
//! glyphs, each painted by palette index (version 0) or a richer paint
//! structure (version 1).

use kurbo::Point;
use log::{debug, warn};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::color_glyph::ColorGlyph;
use crate::error::BuildError;
use crate::glyf::outline_glyph_for_layer;
use crate::glyphset::{ColorLayer, GlyphSet};
use crate::paint::{ColorStop, Extend, Paint};
use crate::reuse::ReuseIndex;

/// One gradient stop resolved against the palette.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaintStop {
    pub offset: OrderedFloat<f32>,
    pub palette_index: u16,
    pub alpha: OrderedFloat<f32>,
}

/// A layer's paint resolved against the palette.
///
/// Version 0 reduces every paint to a bare palette index. Version 1 keeps
/// solid alpha and gradient structure, geometry already in font units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LayerPaint {
    PaletteIndex(u16),
    Solid {
        palette_index: u16,
        alpha: OrderedFloat<f32>,
    },
    LinearGradient {
        p0: Point,
        p1: Point,
        /// Rotation point; carrying it keeps the gradient exact under any
        /// affine placement.
        p2: Point,
        stops: Vec<PaintStop>,
        extend: Extend,
    },
    RadialGradient {
        c0: Point,
        r0: f64,
        c1: Point,
        r1: f64,
        stops: Vec<PaintStop>,
        extend: Extend,
    },
}

/// Encodes color glyphs as palette-painted layer lists on the glyph set.
pub fn encode(
    glyph_set: &mut GlyphSet,
    color_glyphs: &[ColorGlyph],
    version: u16,
) -> Result<(), BuildError> {
    if version > 1 {
        return Err(BuildError::UnsupportedColrVersion(version));
    }

    // Sort colors so an index into this list is an index into the palette.
    // Version 1 stores only opaque colors; transparency rides on the paint.
    let mut palette: Vec<Color> = color_glyphs
        .iter()
        .flat_map(|g| g.colors())
        .map(|c| if version == 0 { c } else { c.opaque() })
        .collect();
    palette.sort();
    palette.dedup();
    debug!("colors {palette:?}");

    glyph_set.color_palettes = vec![palette.clone()];

    let mut index = ReuseIndex::new();
    for color_glyph in color_glyphs {
        debug!(
            "{} {} {:?}",
            glyph_set.family,
            color_glyph.glyph_name,
            color_glyph.font_transform()
        );
        let mut layers = Vec::new();
        for layer in color_glyph.layers() {
            let outline = outline_glyph_for_layer(glyph_set, &mut index, color_glyph, layer);
            let paint = layer_paint(version, color_glyph, &layer.paint, &palette);
            layers.push(ColorLayer {
                glyph: outline,
                paint,
            });
        }
        draw_glyph_extents(glyph_set, &color_glyph.glyph_name);
        glyph_set.set_color_layers(&color_glyph.glyph_name, layers);
    }
    Ok(())
}

fn palette_index(palette: &[Color], color: Color) -> u16 {
    palette
        .binary_search(&color)
        .expect("palette was built from these paints") as u16
}

fn layer_paint(
    version: u16,
    color_glyph: &ColorGlyph,
    paint: &Paint,
    palette: &[Color],
) -> LayerPaint {
    if version == 0 {
        // Draw with the first color the paint mentions. Gradients lose
        // everything past their first stop.
        let first = paint
            .colors()
            .next()
            .expect("paints carry at least one color");
        return LayerPaint::PaletteIndex(palette_index(palette, first));
    }

    match paint {
        Paint::Solid(color) => LayerPaint::Solid {
            palette_index: palette_index(palette, color.opaque()),
            alpha: color.alpha,
        },
        Paint::LinearGradient(gradient) => {
            let [p0, p1, p2] = gradient.font_space_points(color_glyph.font_transform());
            LayerPaint::LinearGradient {
                p0,
                p1,
                p2,
                stops: palette_stops(&gradient.stops, palette),
                extend: gradient.extend,
            }
        }
        Paint::RadialGradient(gradient) => {
            let ((c0, r0), (c1, r1), uniform) =
                gradient.font_space_circles(color_glyph.font_transform());
            if !uniform {
                warn!(
                    "{}: radial gradient scales unevenly; radius uses the axis average",
                    color_glyph.glyph_name
                );
            }
            LayerPaint::RadialGradient {
                c0,
                r0,
                c1,
                r1,
                stops: palette_stops(&gradient.stops, palette),
                extend: gradient.extend,
            }
        }
    }
}

fn palette_stops(stops: &[ColorStop], palette: &[Color]) -> Vec<PaintStop> {
    stops
        .iter()
        .map(|stop| PaintStop {
            offset: stop.offset,
            palette_index: palette_index(palette, stop.color.opaque()),
            alpha: stop.color.alpha,
        })
        .collect()
}

/// Some renderers size a color glyph by its base glyph's extents alone and
/// paint nothing when the base is blank. An open corner-to-corner diagonal
/// gives every base a full-em extent without visible geometry.
fn draw_glyph_extents(glyph_set: &mut GlyphSet, name: &str) {
    let upem = glyph_set.upem as f64;
    let glyph = glyph_set
        .get_mut(name)
        .expect("color glyphs are registered before encoding");
    glyph.outline.move_to((0.0, 0.0));
    glyph.outline.line_to((upem, upem));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artwork::{Artwork, PaintedLayer};
    use crate::paint::LinearGradient;
    use kurbo::{Affine, BezPath, Rect};

    fn solid_layer(d: &str, color: Color) -> PaintedLayer {
        PaintedLayer::new(BezPath::from_svg(d).unwrap(), Paint::Solid(color))
    }

    fn gradient_layer(d: &str, stops: Vec<ColorStop>) -> PaintedLayer {
        PaintedLayer::new(
            BezPath::from_svg(d).unwrap(),
            Paint::LinearGradient(LinearGradient {
                id: "g1".into(),
                p0: Point::new(1.0, 1.0),
                p1: Point::new(9.0, 1.0),
                stops,
                extend: Extend::Pad,
                transform: Affine::IDENTITY,
            }),
        )
    }

    /// upem 100 over a 10x10 view box: scale by 10, flip y.
    fn setup(layer_sets: Vec<Vec<PaintedLayer>>) -> (GlyphSet, Vec<ColorGlyph>) {
        let mut glyph_set = GlyphSet::new("Family", 100, false);
        let base_gid = glyph_set.len() as u16;
        let color_glyphs: Vec<ColorGlyph> = layer_sets
            .into_iter()
            .enumerate()
            .map(|(i, layers)| {
                let cp = 0x41 + i as u32;
                ColorGlyph::create(
                    100,
                    format!("emoji_{cp:04x}.svg"),
                    base_gid + i as u16,
                    vec![cp],
                    Artwork::new(Rect::new(0.0, 0.0, 10.0, 10.0), layers),
                )
                .unwrap()
            })
            .collect();
        for color_glyph in &color_glyphs {
            glyph_set.register_color_glyph(color_glyph);
        }
        (glyph_set, color_glyphs)
    }

    const RED: Color = Color {
        red: 0xff,
        green: 0,
        blue: 0,
        alpha: OrderedFloat(1.0),
    };
    const BLUE: Color = Color {
        red: 0,
        green: 0,
        blue: 0xff,
        alpha: OrderedFloat(1.0),
    };

    #[test]
    fn rejects_unknown_version() {
        let (mut glyph_set, color_glyphs) = setup(vec![]);
        let err = encode(&mut glyph_set, &color_glyphs, 2).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported COLR version: 2");
    }

    #[test]
    fn v0_palette_is_sorted_and_indexed() {
        let (mut glyph_set, color_glyphs) = setup(vec![vec![
            solid_layer("M1,1 L2,2 Z", RED),
            solid_layer("M3,3 L4,4 Z", BLUE),
        ]]);
        encode(&mut glyph_set, &color_glyphs, 0).unwrap();

        // blue sorts before red
        assert_eq!(glyph_set.color_palettes, vec![vec![BLUE, RED]]);
        let layers = &glyph_set.color_layers()["emoji_0041"];
        assert_eq!(layers[0].paint, LayerPaint::PaletteIndex(1));
        assert_eq!(layers[1].paint, LayerPaint::PaletteIndex(0));
    }

    #[test]
    fn v0_gradient_truncates_to_first_stop() {
        let (mut glyph_set, color_glyphs) = setup(vec![vec![gradient_layer(
            "M1,1 L2,2 Z",
            vec![ColorStop::new(0.0, RED), ColorStop::new(1.0, BLUE)],
        )]]);
        encode(&mut glyph_set, &color_glyphs, 0).unwrap();

        assert_eq!(glyph_set.color_palettes, vec![vec![BLUE, RED]]);
        let layers = &glyph_set.color_layers()["emoji_0041"];
        assert_eq!(layers[0].paint, LayerPaint::PaletteIndex(1));
    }

    #[test]
    fn v1_palette_holds_opaque_colors_only() {
        let translucent = Color::new(0xff, 0, 0, 0.5);
        let (mut glyph_set, color_glyphs) = setup(vec![vec![
            solid_layer("M1,1 L2,2 Z", translucent),
            solid_layer("M3,3 L4,4 Z", RED),
        ]]);
        encode(&mut glyph_set, &color_glyphs, 1).unwrap();

        assert_eq!(glyph_set.color_palettes, vec![vec![RED]]);
        let layers = &glyph_set.color_layers()["emoji_0041"];
        assert_eq!(
            layers[0].paint,
            LayerPaint::Solid {
                palette_index: 0,
                alpha: OrderedFloat(0.5)
            }
        );
        assert_eq!(
            layers[1].paint,
            LayerPaint::Solid {
                palette_index: 0,
                alpha: OrderedFloat(1.0)
            }
        );
    }

    #[test]
    fn v1_gradient_keeps_stops_in_font_space() {
        let (mut glyph_set, color_glyphs) = setup(vec![vec![gradient_layer(
            "M1,1 L2,2 Z",
            vec![ColorStop::new(0.0, RED), ColorStop::new(1.0, BLUE)],
        )]]);
        encode(&mut glyph_set, &color_glyphs, 1).unwrap();

        let layers = &glyph_set.color_layers()["emoji_0041"];
        let LayerPaint::LinearGradient { p0, p1, stops, .. } = &layers[0].paint else {
            panic!("expected a linear gradient, got {:?}", layers[0].paint);
        };
        assert_eq!(*p0, Point::new(10.0, 90.0));
        assert_eq!(*p1, Point::new(90.0, 90.0));
        assert_eq!(
            stops,
            &vec![
                PaintStop {
                    offset: OrderedFloat(0.0),
                    palette_index: 1,
                    alpha: OrderedFloat(1.0)
                },
                PaintStop {
                    offset: OrderedFloat(1.0),
                    palette_index: 0,
                    alpha: OrderedFloat(1.0)
                },
            ]
        );
    }

    #[test]
    fn base_glyphs_get_extent_diagonal() {
        let (mut glyph_set, color_glyphs) =
            setup(vec![vec![solid_layer("M1,1 L2,2 Z", RED)]]);
        encode(&mut glyph_set, &color_glyphs, 0).unwrap();

        let base = glyph_set.get("emoji_0041").unwrap();
        assert_eq!(base.outline.to_svg(), "M0 0L100 100");
        // layers stay componentized; no collapse in this encoding
        assert!(base.components.is_empty());
        assert!(glyph_set.contains("emoji_0041.0"));
    }

    #[test]
    fn shared_outline_can_carry_different_paints() {
        let (mut glyph_set, color_glyphs) = setup(vec![
            vec![solid_layer("M1,1 L2,2 Z", RED)],
            vec![solid_layer("M1,1 L2,2 Z", BLUE)],
        ]);
        encode(&mut glyph_set, &color_glyphs, 0).unwrap();

        let first = &glyph_set.color_layers()["emoji_0041"];
        let second = &glyph_set.color_layers()["emoji_0042"];
        // same outline glyph, different palette index
        assert_eq!(first[0].glyph, "emoji_0041.0");
        assert_eq!(second[0].glyph, "emoji_0041.0");
        assert_ne!(first[0].paint, second[0].paint);
    }
}
