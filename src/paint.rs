//! Fill descriptors: solid colors and gradients.
//!
//! Gradient geometry stays in artwork units; encoders map it through the
//! glyph's font-space transform (composed with any gradient transform) when
//! they need device coordinates.

use kurbo::{Affine, Point};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::color::Color;

/// One stop on a gradient color line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub offset: OrderedFloat<f32>,
    pub color: Color,
}

impl ColorStop {
    pub fn new(offset: f32, color: Color) -> Self {
        ColorStop {
            offset: OrderedFloat(offset),
            color,
        }
    }
}

/// How a gradient continues outside its defined range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Extend {
    #[default]
    Pad,
    Repeat,
    Reflect,
}

impl Extend {
    /// The svg `spreadMethod` keyword; `None` for the default.
    pub fn spread_method(self) -> Option<&'static str> {
        match self {
            Extend::Pad => None,
            Extend::Repeat => Some("repeat"),
            Extend::Reflect => Some("reflect"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearGradient {
    /// Identifier carried over from the source document; generated documents
    /// rename it but need the original for the new name.
    pub id: String,
    pub p0: Point,
    pub p1: Point,
    pub stops: Vec<ColorStop>,
    pub extend: Extend,
    pub transform: Affine,
}

impl LinearGradient {
    /// Start, end, and rotation points mapped into font space.
    ///
    /// The rotation point starts perpendicular to the gradient vector; mapping
    /// all three through the composed affine preserves the gradient exactly,
    /// which is the reason the layered encoding carries a third point at all.
    pub fn font_space_points(&self, font_transform: Affine) -> [Point; 3] {
        let p2 = Point::new(
            self.p0.x - (self.p1.y - self.p0.y),
            self.p0.y + (self.p1.x - self.p0.x),
        );
        let full = font_transform * self.transform;
        [full * self.p0, full * self.p1, full * p2]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RadialGradient {
    pub id: String,
    pub center: Point,
    pub radius: f64,
    /// Focal point; equal to `center` when the source had none.
    pub focal: Point,
    pub stops: Vec<ColorStop>,
    pub extend: Extend,
    pub transform: Affine,
}

impl RadialGradient {
    /// Start circle (focal, radius 0) and end circle mapped into font space.
    ///
    /// Returns the two circles and whether the composed transform scaled both
    /// axes equally; when it did not, the radius is the average of the axis
    /// scales and the caller should warn about the approximation.
    pub fn font_space_circles(&self, font_transform: Affine) -> ((Point, f64), (Point, f64), bool) {
        let full = font_transform * self.transform;
        let (sx, sy) = scale_factors(full);
        let uniform = (sx - sy).abs() <= 1e-6 * sx.max(sy).max(1.0);
        let radius = self.radius * (sx + sy) / 2.0;
        ((full * self.focal, 0.0), (full * self.center, radius), uniform)
    }
}

/// Absolute scale applied to the x and y axes by an affine.
pub(crate) fn scale_factors(affine: Affine) -> (f64, f64) {
    let [a, b, c, d, _, _] = affine.as_coeffs();
    ((a * a + b * b).sqrt(), (c * c + d * d).sqrt())
}

/// A layer's fill.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Paint {
    Solid(Color),
    LinearGradient(LinearGradient),
    RadialGradient(RadialGradient),
}

impl Paint {
    /// Colors mentioned by this paint, in declaration order.
    ///
    /// The first color is what version 0 of the layered encoding keeps when
    /// it flattens a gradient.
    pub fn colors(&self) -> impl Iterator<Item = Color> + '_ {
        let solid = match self {
            Paint::Solid(color) => Some(*color),
            _ => None,
        };
        let stops: &[ColorStop] = match self {
            Paint::Solid(_) => &[],
            Paint::LinearGradient(g) => &g.stops,
            Paint::RadialGradient(g) => &g.stops,
        };
        solid.into_iter().chain(stops.iter().map(|s| s.color))
    }
}
