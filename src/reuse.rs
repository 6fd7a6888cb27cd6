//! Shape reuse across glyphs.
//!
//! Two glyphs drawing the same shape should share one outline glyph (glyf,
//! COLR) or land in one document (SVG). Reuse is keyed on geometry alone;
//! paint never participates so differently-colored copies of a shape still
//! share.

use indexmap::IndexMap;
use kurbo::{Affine, Rect};
use ordered_float::OrderedFloat;

use crate::artwork::PaintedLayer;

/// An affine in hashable form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HashableAffine([OrderedFloat<f64>; 6]);

impl From<Affine> for HashableAffine {
    fn from(value: Affine) -> Self {
        HashableAffine(value.as_coeffs().map(OrderedFloat))
    }
}

/// Identity of a drawable layer for reuse purposes.
///
/// The source view box participates: a `d` string means different font-space
/// geometry under a different view box.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReuseKey {
    view_box: [OrderedFloat<f64>; 4],
    path: String,
    reuses: Vec<HashableAffine>,
}

impl ReuseKey {
    pub fn new(view_box: Rect, layer: &PaintedLayer) -> Self {
        ReuseKey {
            view_box: [
                OrderedFloat(view_box.x0),
                OrderedFloat(view_box.y0),
                OrderedFloat(view_box.x1),
                OrderedFloat(view_box.y1),
            ],
            path: layer.path.to_svg(),
            reuses: layer.reuses.iter().copied().map(Into::into).collect(),
        }
    }
}

/// First-seen owner of each distinct shape.
#[derive(Debug, Default)]
pub struct ReuseIndex {
    glyphs: IndexMap<ReuseKey, String>,
}

impl ReuseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn glyph_for(&self, key: &ReuseKey) -> Option<&str> {
        self.glyphs.get(key).map(String::as_str)
    }

    pub fn record(&mut self, key: ReuseKey, glyph: &str) {
        self.glyphs.entry(key).or_insert_with(|| glyph.to_string());
    }
}

/// Union-find over glyph names, insertion-ordered.
#[derive(Debug, Default)]
pub struct DisjointSets {
    nodes: IndexMap<String, usize>,
    parent: Vec<usize>,
}

impl DisjointSets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_set(&mut self, name: &str) {
        if !self.nodes.contains_key(name) {
            let idx = self.parent.len();
            self.nodes.insert(name.to_string(), idx);
            self.parent.push(idx);
        }
    }

    pub fn union(&mut self, a: &str, b: &str) {
        self.make_set(a);
        self.make_set(b);
        let a = self.find(self.nodes[a]);
        let b = self.find(self.nodes[b]);
        if a != b {
            // lower index wins so roots track first appearance
            let (keep, merge) = if a < b { (a, b) } else { (b, a) };
            self.parent[merge] = keep;
        }
    }

    fn find(&mut self, mut idx: usize) -> usize {
        while self.parent[idx] != idx {
            self.parent[idx] = self.parent[self.parent[idx]];
            idx = self.parent[idx];
        }
        idx
    }

    /// Every set, members in insertion order, sets ordered by their first
    /// member's insertion.
    pub fn sorted_sets(&mut self) -> Vec<Vec<String>> {
        let mut groups: IndexMap<usize, Vec<String>> = IndexMap::new();
        let names: Vec<(String, usize)> = self
            .nodes
            .iter()
            .map(|(name, idx)| (name.clone(), *idx))
            .collect();
        for (name, idx) in names {
            let root = self.find(idx);
            groups.entry(root).or_default().push(name);
        }
        groups.into_values().collect()
    }
}
