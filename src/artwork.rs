//! The normalized input model: flat painted layers plus reuse annotations.

use kurbo::{Affine, BezPath, Rect};
use serde::{Deserialize, Serialize};

use crate::paint::Paint;

/// One flattened, filled outline within a glyph's artwork.
///
/// `reuses` records additional placements of the same path later in the same
/// artwork, discovered by the normalizer. Encoders consume the annotations;
/// they never recompute them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaintedLayer {
    pub path: BezPath,
    pub paint: Paint,
    pub reuses: Vec<Affine>,
}

impl PaintedLayer {
    pub fn new(path: BezPath, paint: Paint) -> Self {
        PaintedLayer {
            path,
            paint,
            reuses: Vec::new(),
        }
    }
}

/// A normalized vector document: a coordinate frame and bottom-to-top layers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Artwork {
    pub view_box: Rect,
    pub layers: Vec<PaintedLayer>,
}

impl Artwork {
    pub fn new(view_box: Rect, layers: Vec<PaintedLayer>) -> Self {
        Artwork { view_box, layers }
    }
}

/// One input file, ready for assembly.
#[derive(Clone, Debug)]
pub struct InputGlyph {
    pub filename: String,
    pub codepoints: Vec<u32>,
    pub artwork: Artwork,
}
