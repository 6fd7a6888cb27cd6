//! Replaying [`BezPath`]s into [`Pen`]s.
//!
//! A small segment-sink abstraction: outline producers draw into any `Pen`,
//! and `TransformPen` lets an affine ride along without the producer knowing.

use kurbo::{Affine, BezPath, PathEl, Point};

/// A sink for outline segments.
pub trait Pen {
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn quad_to(&mut self, cx: f64, cy: f64, x: f64, y: f64);
    fn curve_to(&mut self, cx0: f64, cy0: f64, cx1: f64, cy1: f64, x: f64, y: f64);
    fn close(&mut self);
}

/// Collects drawn segments into a [`BezPath`].
#[derive(Debug, Default)]
pub struct BezPathPen {
    path: BezPath,
}

impl BezPathPen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> BezPath {
        self.path
    }
}

impl Pen for BezPathPen {
    fn move_to(&mut self, x: f64, y: f64) {
        self.path.move_to((x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.path.line_to((x, y));
    }

    fn quad_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        self.path.quad_to((cx, cy), (x, y));
    }

    fn curve_to(&mut self, cx0: f64, cy0: f64, cx1: f64, cy1: f64, x: f64, y: f64) {
        self.path.curve_to((cx0, cy0), (cx1, cy1), (x, y));
    }

    fn close(&mut self) {
        self.path.close_path();
    }
}

/// Maps every drawn point through an affine before forwarding.
pub struct TransformPen<'a, P: Pen> {
    inner: &'a mut P,
    transform: Affine,
}

impl<'a, P: Pen> TransformPen<'a, P> {
    pub fn new(inner: &'a mut P, transform: Affine) -> Self {
        TransformPen { inner, transform }
    }

    fn map(&self, x: f64, y: f64) -> Point {
        self.transform * Point::new(x, y)
    }
}

impl<P: Pen> Pen for TransformPen<'_, P> {
    fn move_to(&mut self, x: f64, y: f64) {
        let p = self.map(x, y);
        self.inner.move_to(p.x, p.y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        let p = self.map(x, y);
        self.inner.line_to(p.x, p.y);
    }

    fn quad_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        let c = self.map(cx, cy);
        let p = self.map(x, y);
        self.inner.quad_to(c.x, c.y, p.x, p.y);
    }

    fn curve_to(&mut self, cx0: f64, cy0: f64, cx1: f64, cy1: f64, x: f64, y: f64) {
        let c0 = self.map(cx0, cy0);
        let c1 = self.map(cx1, cy1);
        let p = self.map(x, y);
        self.inner.curve_to(c0.x, c0.y, c1.x, c1.y, p.x, p.y);
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

/// Replays a path into a pen.
pub fn draw_path(path: &BezPath, pen: &mut impl Pen) {
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pen.move_to(p.x, p.y),
            PathEl::LineTo(p) => pen.line_to(p.x, p.y),
            PathEl::QuadTo(c, p) => pen.quad_to(c.x, c.y, p.x, p.y),
            PathEl::CurveTo(c0, c1, p) => pen.curve_to(c0.x, c0.y, c1.x, c1.y, p.x, p.y),
            PathEl::ClosePath => pen.close(),
        }
    }
}

/// Replays a path into a pen under an affine.
pub fn draw_path_transformed(path: &BezPath, transform: Affine, pen: &mut impl Pen) {
    if transform == Affine::IDENTITY {
        draw_path(path, pen);
    } else {
        let mut pen = TransformPen::new(pen, transform);
        draw_path(path, &mut pen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_path() -> BezPath {
        let mut path = BezPath::new();
        path.move_to((10.0, 10.0));
        path.quad_to((40.0, 40.0), (60.0, 10.0));
        path.curve_to((80.0, 10.0), (100.0, 40.0), (100.0, 10.0));
        path.close_path();
        path
    }

    #[test]
    fn replay_is_lossless() {
        let mut pen = BezPathPen::new();
        draw_path(&sample_path(), &mut pen);
        assert_eq!(sample_path(), pen.into_inner());
    }

    #[test]
    fn replay_scaled() {
        let mut pen = BezPathPen::new();
        let mut path = BezPath::new();
        path.move_to((1.0, 1.0));
        path.line_to((2.0, 2.0));
        draw_path_transformed(&path, Affine::scale(2.0), &mut pen);
        let mut expected = BezPath::new();
        expected.move_to((2.0, 2.0));
        expected.line_to((4.0, 4.0));
        assert_eq!(expected, pen.into_inner());
    }
}
