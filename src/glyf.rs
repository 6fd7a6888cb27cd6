//! Composite outline encoding: each distinct shape is drawn once into an
//! outline glyph; color glyphs become composites referencing those outlines.

use std::collections::HashSet;

use kurbo::Affine;
use log::debug;

use crate::artwork::PaintedLayer;
use crate::color_glyph::ColorGlyph;
use crate::glyphset::{Component, GlyphSet};
use crate::pens::{draw_path_transformed, BezPathPen};
use crate::reuse::{ReuseIndex, ReuseKey};

/// Returns the outline glyph carrying `layer`'s shape, drawing it on first
/// sight and answering by reference afterwards.
pub(crate) fn outline_glyph_for_layer(
    glyph_set: &mut GlyphSet,
    index: &mut ReuseIndex,
    color_glyph: &ColorGlyph,
    layer: &PaintedLayer,
) -> String {
    let key = ReuseKey::new(color_glyph.artwork.view_box, layer);
    if let Some(name) = index.glyph_for(&key) {
        return name.to_string();
    }
    let name = create_outline_glyph(glyph_set, color_glyph, layer);
    index.record(key, &name);
    name
}

/// Draws a layer into a fresh glyph. A layer with reuse placements becomes a
/// composite: the path lands once in a base glyph, referenced at identity and
/// once per reuse transform.
fn create_outline_glyph(
    glyph_set: &mut GlyphSet,
    color_glyph: &ColorGlyph,
    layer: &PaintedLayer,
) -> String {
    let upem = glyph_set.upem;
    let font_transform = color_glyph.font_transform();
    let name = glyph_set.next_free_name(|i| format!("{}.{i}", color_glyph.glyph_name));

    let mut pen = BezPathPen::new();
    draw_path_transformed(&layer.path, font_transform, &mut pen);
    let outline = pen.into_inner();

    if layer.reuses.is_empty() {
        let glyph = glyph_set.new_glyph(&name);
        glyph.width = upem;
        glyph.outline = outline;
        return name;
    }

    let base_name = glyph_set.next_free_name(|i| format!("{name}.component.{i}"));
    let [sx, _, _, sy, _, _] = font_transform.as_coeffs();
    let mut components = vec![Component::new(&base_name)];
    for reuse in &layer.reuses {
        // The shape was already drawn in font units; only the translation
        // still needs scaling there (sy < 0 flips the y movement).
        let [a, b, c, d, e, f] = reuse.as_coeffs();
        components.push(Component::with_transform(
            &base_name,
            Affine::new([a, b, c, d, e * sx, f * sy]),
        ));
    }

    let glyph = glyph_set.new_glyph(&name);
    glyph.width = upem;
    glyph.components = components;
    let base = glyph_set.new_glyph(&base_name);
    base.outline = outline;
    name
}

/// Encodes every color glyph as a composite of shared outline glyphs.
pub fn encode(glyph_set: &mut GlyphSet, color_glyphs: &[ColorGlyph]) {
    let mut index = ReuseIndex::new();
    for color_glyph in color_glyphs {
        debug!(
            "{} {} {:?}",
            glyph_set.family,
            color_glyph.glyph_name,
            color_glyph.font_transform()
        );
        let mut components = Vec::new();
        for layer in color_glyph.layers() {
            let outline = outline_glyph_for_layer(glyph_set, &mut index, color_glyph, layer);
            components.push(Component::new(outline));
        }
        glyph_set
            .get_mut(&color_glyph.glyph_name)
            .expect("color glyphs are registered before encoding")
            .components = components;
    }

    collapse_single_component_glyphs(glyph_set, color_glyphs);
}

/// A parent that wound up with exactly one component is needless indirection;
/// pull the child's definition up, then drop any encoder-created glyph nothing
/// references anymore.
fn collapse_single_component_glyphs(glyph_set: &mut GlyphSet, color_glyphs: &[ColorGlyph]) {
    for color_glyph in color_glyphs {
        let parent = glyph_set
            .get(&color_glyph.glyph_name)
            .expect("color glyphs are registered before encoding");
        if let [only] = parent.components.as_slice() {
            debug_assert_eq!(only.transform, Affine::IDENTITY);
            let child = only.base.clone();
            glyph_set.replace_definition(&color_glyph.glyph_name, &child);
        }
    }

    // Everything after the color block was created by this encoder.
    let first_child = color_glyphs
        .iter()
        .map(|g| g.glyph_id() as usize + 1)
        .max()
        .unwrap_or(glyph_set.len());
    let referenced: HashSet<String> = glyph_set
        .glyph_order()
        .iter()
        .filter_map(|name| glyph_set.get(name))
        .flat_map(|glyph| glyph.components.iter().map(|c| c.base.clone()))
        .collect();
    let removable: Vec<String> = glyph_set.glyph_order()[first_child..]
        .iter()
        .filter(|name| !referenced.contains(*name))
        .cloned()
        .collect();
    for name in removable {
        glyph_set.remove_glyph(&name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artwork::Artwork;
    use crate::color::Color;
    use crate::paint::Paint;
    use kurbo::{BezPath, Rect};

    fn layer(d: &str) -> PaintedLayer {
        PaintedLayer::new(
            BezPath::from_svg(d).unwrap(),
            Paint::Solid(Color::rgb(0, 0, 0)),
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

    #[test]
    fn one_outline_glyph_per_layer() {
        let (mut glyph_set, color_glyphs) =
            setup(vec![vec![layer("M1,1 L2,2 Z"), layer("M3,3 L4,4 Z")]]);
        encode(&mut glyph_set, &color_glyphs);

        assert_eq!(
            glyph_set.glyph_order(),
            &[
                ".notdef",
                ".space",
                "emoji_0041",
                "emoji_0041.0",
                "emoji_0041.1"
            ]
        );
        let parent = glyph_set.get("emoji_0041").unwrap();
        let bases: Vec<&str> = parent.components.iter().map(|c| c.base.as_str()).collect();
        assert_eq!(bases, vec!["emoji_0041.0", "emoji_0041.1"]);
        assert!(parent
            .components
            .iter()
            .all(|c| c.transform == Affine::IDENTITY));
        // drawn through the font space transform: scale 10, y flipped
        assert_eq!(
            glyph_set.get("emoji_0041.0").unwrap().outline.to_svg(),
            "M10 90L20 80Z"
        );
        assert_eq!(glyph_set.get("emoji_0041.0").unwrap().width, 100);
    }

    #[test]
    fn same_shape_drawn_once_across_glyphs() {
        let (mut glyph_set, color_glyphs) = setup(vec![
            vec![layer("M1,1 L2,2 Z"), layer("M3,3 L4,4 Z")],
            vec![layer("M1,1 L2,2 Z"), layer("M5,5 L6,6 Z")],
        ]);
        encode(&mut glyph_set, &color_glyphs);

        let second = glyph_set.get("emoji_0042").unwrap();
        let bases: Vec<&str> = second.components.iter().map(|c| c.base.as_str()).collect();
        // first layer resolves to the glyph the first color glyph created
        assert_eq!(bases, vec!["emoji_0041.0", "emoji_0042.0"]);
        assert_eq!(
            glyph_set.glyph_order(),
            &[
                ".notdef",
                ".space",
                "emoji_0041",
                "emoji_0042",
                "emoji_0041.0",
                "emoji_0041.1",
                "emoji_0042.0"
            ]
        );
    }

    #[test]
    fn single_component_collapses_into_parent() {
        let (mut glyph_set, color_glyphs) = setup(vec![vec![layer("M1,1 L2,2 Z")]]);
        encode(&mut glyph_set, &color_glyphs);

        let parent = glyph_set.get("emoji_0041").unwrap();
        assert!(parent.components.is_empty());
        assert_eq!(parent.outline.to_svg(), "M10 90L20 80Z");
        assert_eq!(parent.codepoints, vec![0x41]);
        // the child glyph is gone
        assert_eq!(glyph_set.glyph_order(), &[".notdef", ".space", "emoji_0041"]);
    }

    #[test]
    fn collapse_keeps_children_others_reference() {
        let (mut glyph_set, color_glyphs) = setup(vec![
            vec![layer("M1,1 L2,2 Z")],
            vec![layer("M1,1 L2,2 Z"), layer("M3,3 L4,4 Z")],
        ]);
        encode(&mut glyph_set, &color_glyphs);

        // first glyph collapsed, but its outline glyph is still referenced
        // by the second so it survives
        assert!(glyph_set.get("emoji_0041").unwrap().components.is_empty());
        let second = glyph_set.get("emoji_0042").unwrap();
        let bases: Vec<&str> = second.components.iter().map(|c| c.base.as_str()).collect();
        assert_eq!(bases, vec!["emoji_0041.0", "emoji_0042.0"]);
        assert!(glyph_set.contains("emoji_0041.0"));
    }

    #[test]
    fn intra_glyph_reuse_forms_composite() {
        let mut repeated = layer("M1,1 L2,2 Z");
        repeated.reuses = vec![
            Affine::translate((4.0, 0.0)),
            Affine::translate((0.0, 2.0)),
        ];
        let (mut glyph_set, color_glyphs) = setup(vec![vec![repeated]]);
        encode(&mut glyph_set, &color_glyphs);

        // single layer, so the composite collapsed into the parent
        let parent = glyph_set.get("emoji_0041").unwrap();
        let transforms: Vec<Affine> = parent.components.iter().map(|c| c.transform).collect();
        assert_eq!(
            transforms,
            vec![
                Affine::IDENTITY,
                // translation scaled into font units, y flipped
                Affine::new([1.0, 0.0, 0.0, 1.0, 40.0, 0.0]),
                Affine::new([1.0, 0.0, 0.0, 1.0, 0.0, -20.0]),
            ]
        );
        assert!(parent
            .components
            .iter()
            .all(|c| c.base == "emoji_0041.0.component.0"));
        assert_eq!(
            glyph_set.glyph_order(),
            &[".notdef", ".space", "emoji_0041", "emoji_0041.0.component.0"]
        );
        assert_eq!(
            glyph_set
                .get("emoji_0041.0.component.0")
                .unwrap()
                .outline
                .to_svg(),
            "M10 90L20 80Z"
        );
    }
}
