//! The glyph set under assembly: glyph order, outlines, components, cmap
//! entries, color layer lists, and feature text. This is what encoders mutate
//! and what the container compiler consumes.

use indexmap::IndexMap;
use kurbo::{Affine, BezPath};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::artwork::InputGlyph;
use crate::color::Color;
use crate::color_glyph::ColorGlyph;
use crate::colr::LayerPaint;
use crate::glyph::glyph_name;

pub const NOTDEF: &str = ".notdef";
pub const SPACE: &str = ".space";

/// A reference to another glyph placed under an affine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub base: String,
    pub transform: Affine,
}

impl Component {
    pub fn new(base: impl Into<String>) -> Self {
        Component {
            base: base.into(),
            transform: Affine::IDENTITY,
        }
    }

    pub fn with_transform(base: impl Into<String>, transform: Affine) -> Self {
        Component {
            base: base.into(),
            transform,
        }
    }
}

/// One glyph: identity (name, codepoints) plus definition (width, outline in
/// font units, components).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Glyph {
    pub name: String,
    pub codepoints: Vec<u32>,
    pub width: u16,
    pub outline: BezPath,
    pub components: Vec<Component>,
}

/// One z-ordered color layer of a base glyph: the outline glyph drawn and the
/// paint to draw it with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorLayer {
    pub glyph: String,
    pub paint: LayerPaint,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GlyphSet {
    pub family: String,
    pub upem: u16,
    pub keep_glyph_names: bool,
    glyph_order: Vec<String>,
    glyphs: IndexMap<String, Glyph>,
    /// Composite outline encoding may swap a glyph id range; everything else
    /// leaves order as inserted.
    pub color_palettes: Vec<Vec<Color>>,
    color_layers: IndexMap<String, Vec<ColorLayer>>,
    pub features: String,
}

impl GlyphSet {
    /// A fresh glyph set with the two required leading glyphs: `.notdef`,
    /// then a blank `.space` mapped to U+0020 at full-em advance (some
    /// rasterizers want a blank gid 1).
    pub fn new(family: impl Into<String>, upem: u16, keep_glyph_names: bool) -> Self {
        let mut glyph_set = GlyphSet {
            family: family.into(),
            upem,
            keep_glyph_names,
            glyph_order: Vec::new(),
            glyphs: IndexMap::new(),
            color_palettes: Vec::new(),
            color_layers: IndexMap::new(),
            features: String::new(),
        };
        glyph_set.new_glyph(NOTDEF);
        let space = glyph_set.new_glyph(SPACE);
        space.codepoints = vec![0x0020];
        space.width = upem;
        glyph_set
    }

    /// Adds an empty glyph at the end of the glyph order.
    pub fn new_glyph(&mut self, name: &str) -> &mut Glyph {
        debug_assert!(!self.glyphs.contains_key(name), "duplicate glyph {name}");
        self.glyph_order.push(name.to_string());
        self.glyphs.entry(name.to_string()).or_insert(Glyph {
            name: name.to_string(),
            ..Default::default()
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.glyphs.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Glyph> {
        self.glyphs.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Glyph> {
        self.glyphs.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.glyph_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyph_order.is_empty()
    }

    pub fn glyph_order(&self) -> &[String] {
        &self.glyph_order
    }

    /// Replaces the glyph order wholesale. The new order must be a
    /// permutation of the old one.
    pub fn set_glyph_order(&mut self, order: Vec<String>) {
        debug_assert_eq!(order.len(), self.glyph_order.len());
        debug_assert!(order.iter().all(|name| self.glyphs.contains_key(name)));
        self.glyph_order = order;
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.glyph_order.iter().position(|n| n == name)
    }

    /// Removes a glyph, preserving the relative order of the rest.
    pub fn remove_glyph(&mut self, name: &str) {
        self.glyph_order.retain(|n| n != name);
        self.glyphs.shift_remove(name);
    }

    /// First unused name produced by `name_fn(0)`, `name_fn(1)`, ...
    pub fn next_free_name(&self, mut name_fn: impl FnMut(usize) -> String) -> String {
        let mut i = 0;
        loop {
            let name = name_fn(i);
            if !self.contains(&name) {
                return name;
            }
            i += 1;
        }
    }

    /// Copies `source`'s definition (width, outline, components) over
    /// `target`'s, leaving target's identity (name, codepoints) alone.
    pub fn replace_definition(&mut self, target: &str, source: &str) {
        let Some(source) = self.glyphs.get(source).cloned() else {
            return;
        };
        if let Some(target) = self.glyphs.get_mut(target) {
            target.width = source.width;
            target.outline = source.outline;
            target.components = source.components;
        }
    }

    /// One blank glyph per codepoint that only ever appears inside
    /// multi-codepoint sequences. Every codepoint the font claims must
    /// resolve to a glyph even when rendering happens via ligature
    /// substitution. Added in sorted codepoint order.
    pub fn ensure_codepoints_have_glyphs(&mut self, inputs: &[InputGlyph]) {
        let mut all_codepoints = std::collections::BTreeSet::new();
        let mut direct_mapped = std::collections::BTreeSet::new();
        for input in inputs {
            if let [lone] = input.codepoints.as_slice() {
                direct_mapped.insert(*lone);
            }
            all_codepoints.extend(input.codepoints.iter().copied());
        }

        let need_blanks: Vec<u32> = all_codepoints.difference(&direct_mapped).copied().collect();
        debug!("{} codepoints require blanks", need_blanks.len());
        for codepoint in need_blanks {
            let name = glyph_name(&[codepoint]);
            let glyph = self.new_glyph(&name);
            glyph.codepoints = vec![codepoint];
        }
    }

    /// Appends a color glyph's base slot: full-em advance, direct cmap entry
    /// when the sequence is a single codepoint.
    pub fn register_color_glyph(&mut self, color_glyph: &ColorGlyph) {
        let upem = self.upem;
        let glyph = self.new_glyph(&color_glyph.glyph_name);
        glyph.width = upem;
        if let [lone] = color_glyph.codepoints.as_slice() {
            glyph.codepoints = vec![*lone];
        }
    }

    /// `(codepoint, glyph name)` pairs in glyph order.
    pub fn codepoint_entries(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.glyph_order.iter().flat_map(move |name| {
            let glyph = &self.glyphs[name];
            glyph
                .codepoints
                .iter()
                .map(move |cp| (*cp, glyph.name.as_str()))
        })
    }

    pub fn set_color_layers(&mut self, name: &str, layers: Vec<ColorLayer>) {
        self.color_layers.insert(name.to_string(), layers);
    }

    pub fn color_layers(&self) -> &IndexMap<String, Vec<ColorLayer>> {
        &self.color_layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artwork::Artwork;
    use kurbo::Rect;

    fn input(codepoints: Vec<u32>) -> InputGlyph {
        InputGlyph {
            filename: "test.svg".into(),
            codepoints,
            artwork: Artwork::new(Rect::new(0.0, 0.0, 10.0, 10.0), vec![]),
        }
    }

    #[test]
    fn seeds_notdef_and_space() {
        let glyph_set = GlyphSet::new("Family", 1024, false);
        assert_eq!(glyph_set.glyph_order(), &[".notdef", ".space"]);
        let space = glyph_set.get(SPACE).unwrap();
        assert_eq!(space.width, 1024);
        assert_eq!(space.codepoints, vec![0x20]);
        assert_eq!(glyph_set.get(NOTDEF).unwrap().width, 0);
    }

    #[test]
    fn blanks_only_for_indirect_codepoints() {
        let mut glyph_set = GlyphSet::new("Family", 1024, false);
        glyph_set.ensure_codepoints_have_glyphs(&[
            input(vec![0x1f600]),
            input(vec![0x1f600, 0x200d, 0x1f648]),
        ]);
        // 0x1f600 is directly mapped elsewhere; 0x200d and 0x1f648 are not
        assert_eq!(
            glyph_set.glyph_order(),
            &[".notdef", ".space", "emoji_200d", "emoji_1f648"]
        );
        assert_eq!(glyph_set.get("emoji_200d").unwrap().codepoints, vec![0x200d]);
    }

    #[test]
    fn blank_glyphs_in_sorted_codepoint_order() {
        let mut glyph_set = GlyphSet::new("Family", 1024, false);
        glyph_set.ensure_codepoints_have_glyphs(&[input(vec![0xfe0f, 0x200d, 0x2708])]);
        assert_eq!(
            glyph_set.glyph_order(),
            &[".notdef", ".space", "emoji_200d", "emoji_2708", "emoji_fe0f"]
        );
    }

    #[test]
    fn next_free_name_skips_taken() {
        let mut glyph_set = GlyphSet::new("Family", 1024, false);
        glyph_set.new_glyph("emoji_1f600.0");
        let name = glyph_set.next_free_name(|i| format!("emoji_1f600.{i}"));
        assert_eq!(name, "emoji_1f600.1");
    }

    #[test]
    fn replace_definition_keeps_identity() {
        let mut glyph_set = GlyphSet::new("Family", 1024, false);
        let target = glyph_set.new_glyph("emoji_0041");
        target.codepoints = vec![0x41];
        let source = glyph_set.new_glyph("emoji_0041.0");
        source.width = 500;
        source.outline.move_to((0.0, 0.0));
        source.outline.line_to((5.0, 5.0));

        glyph_set.replace_definition("emoji_0041", "emoji_0041.0");

        let target = glyph_set.get("emoji_0041").unwrap();
        assert_eq!(target.codepoints, vec![0x41]);
        assert_eq!(target.width, 500);
        assert_eq!(target.outline.elements().len(), 2);
    }
}
