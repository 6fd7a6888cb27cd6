//! Input loading: parse each SVG file into the normalized artwork model.
//!
//! A file that fails codepoint extraction or parsing is logged and dropped;
//! the batch continues. Everything fatal happens later, during assembly.

use std::path::Path;

use kurbo::{Affine, BezPath, PathEl, Point, Rect};
use log::warn;
use usvg::tiny_skia_path::PathSegment;

use crate::artwork::{Artwork, InputGlyph, PaintedLayer};
use crate::color::Color;
use crate::glyph::codepoints_from_filename;
use crate::paint::{ColorStop, Extend, LinearGradient, Paint, RadialGradient};

/// Reads and normalizes every input, in argument order. Failures skip the
/// file with a warning.
pub fn load_inputs(paths: &[impl AsRef<Path>]) -> Vec<InputGlyph> {
    let mut inputs = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let Some(codepoints) = codepoints_from_filename(&filename) else {
            continue;
        };
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Unable to read {}: {e}", path.display());
                continue;
            }
        };
        match parse_artwork(&text) {
            Ok(artwork) => inputs.push(InputGlyph {
                filename,
                codepoints,
                artwork,
            }),
            Err(e) => warn!("Unable to parse {}: {e}", path.display()),
        }
    }
    inputs
}

/// Parses an SVG document into flat painted layers with absolute coordinates.
pub fn parse_artwork(text: &str) -> Result<Artwork, usvg::Error> {
    let tree = usvg::Tree::from_str(text, &usvg::Options::default())?;
    let size = tree.size();
    let view_box = Rect::new(0.0, 0.0, size.width() as f64, size.height() as f64);

    let mut layers = Vec::new();
    collect_layers(tree.root(), 1.0, &mut layers);
    annotate_reuse(&mut layers);
    Ok(Artwork::new(view_box, layers))
}

fn collect_layers(group: &usvg::Group, opacity: f32, layers: &mut Vec<PaintedLayer>) {
    let opacity = opacity * group.opacity().get();
    for node in group.children() {
        match node {
            usvg::Node::Group(child) => collect_layers(child, opacity, layers),
            usvg::Node::Path(path) => {
                if path.stroke().is_some() {
                    warn!("strokes are not supported; ignoring stroke");
                }
                let Some(fill) = path.fill() else {
                    continue;
                };
                let transform = to_affine(path.abs_transform());
                let outline = to_bezpath(path.data(), transform);
                if outline.elements().is_empty() {
                    continue;
                }
                let alpha = opacity * fill.opacity().get();
                match convert_paint(fill.paint(), alpha, transform) {
                    Some(paint) => layers.push(PaintedLayer::new(outline, paint)),
                    None => warn!("unsupported fill paint; ignoring layer"),
                }
            }
            usvg::Node::Image(_) => warn!("embedded images are not supported; ignoring"),
            usvg::Node::Text(_) => warn!("text elements are not supported; ignoring"),
        }
    }
}

fn to_affine(transform: usvg::Transform) -> Affine {
    Affine::new([
        transform.sx as f64,
        transform.ky as f64,
        transform.kx as f64,
        transform.sy as f64,
        transform.tx as f64,
        transform.ty as f64,
    ])
}

fn to_bezpath(path: &usvg::tiny_skia_path::Path, transform: Affine) -> BezPath {
    let point = |p: usvg::tiny_skia_path::Point| transform * Point::new(p.x as f64, p.y as f64);
    let mut bez = BezPath::new();
    for segment in path.segments() {
        match segment {
            PathSegment::MoveTo(p) => bez.move_to(point(p)),
            PathSegment::LineTo(p) => bez.line_to(point(p)),
            PathSegment::QuadTo(c, p) => bez.quad_to(point(c), point(p)),
            PathSegment::CubicTo(c0, c1, p) => bez.curve_to(point(c0), point(c1), point(p)),
            PathSegment::Close => bez.close_path(),
        }
    }
    bez
}

fn convert_paint(paint: &usvg::Paint, alpha: f32, path_transform: Affine) -> Option<Paint> {
    match paint {
        usvg::Paint::Color(color) => Some(Paint::Solid(Color::new(
            color.red,
            color.green,
            color.blue,
            alpha,
        ))),
        usvg::Paint::LinearGradient(gradient) => Some(Paint::LinearGradient(LinearGradient {
            id: gradient.id().to_string(),
            p0: Point::new(gradient.x1() as f64, gradient.y1() as f64),
            p1: Point::new(gradient.x2() as f64, gradient.y2() as f64),
            stops: convert_stops(gradient.stops(), alpha),
            extend: convert_spread(gradient.spread_method()),
            // gradient geometry is in pre-transform user space; the layer's
            // outline is not, so carry the composition on the paint
            transform: path_transform * to_affine(gradient.transform()),
        })),
        usvg::Paint::RadialGradient(gradient) => {
            let center = Point::new(gradient.cx() as f64, gradient.cy() as f64);
            let focal = Point::new(gradient.fx() as f64, gradient.fy() as f64);
            Some(Paint::RadialGradient(RadialGradient {
                id: gradient.id().to_string(),
                center,
                radius: gradient.r().get() as f64,
                focal,
                stops: convert_stops(gradient.stops(), alpha),
                extend: convert_spread(gradient.spread_method()),
                transform: path_transform * to_affine(gradient.transform()),
            }))
        }
        usvg::Paint::Pattern(_) => None,
    }
}

fn convert_stops(stops: &[usvg::Stop], alpha: f32) -> Vec<ColorStop> {
    stops
        .iter()
        .map(|stop| {
            let color = stop.color();
            ColorStop::new(
                stop.offset().get(),
                Color::new(
                    color.red,
                    color.green,
                    color.blue,
                    alpha * stop.opacity().get(),
                ),
            )
        })
        .collect()
}

fn convert_spread(spread: usvg::SpreadMethod) -> Extend {
    match spread {
        usvg::SpreadMethod::Pad => Extend::Pad,
        usvg::SpreadMethod::Repeat => Extend::Repeat,
        usvg::SpreadMethod::Reflect => Extend::Reflect,
    }
}

/// Folds layers that are pure translations of an earlier, identically painted
/// layer into that layer's reuse list. Only translation is detected here;
/// rotated or scaled repeats stay as independent layers.
fn annotate_reuse(layers: &mut Vec<PaintedLayer>) {
    let mut kept: Vec<PaintedLayer> = Vec::new();
    for layer in layers.drain(..) {
        let repeat = kept.iter().enumerate().find_map(|(i, earlier)| {
            (earlier.paint == layer.paint)
                .then(|| translation_between(&earlier.path, &layer.path))
                .flatten()
                .map(|offset| (i, offset))
        });
        match repeat {
            Some((i, (dx, dy))) => kept[i].reuses.push(Affine::translate((dx, dy))),
            None => kept.push(layer),
        }
    }
    *layers = kept;
}

/// The `(dx, dy)` such that `from` shifted by it equals `to`, if one exists.
fn translation_between(from: &BezPath, to: &BezPath) -> Option<(f64, f64)> {
    const EPSILON: f64 = 1e-6;
    if from.elements().len() != to.elements().len() {
        return None;
    }
    let mut offset: Option<(f64, f64)> = None;
    for (a, b) in from.elements().iter().zip(to.elements()) {
        let points = match (a, b) {
            (PathEl::MoveTo(p), PathEl::MoveTo(q)) | (PathEl::LineTo(p), PathEl::LineTo(q)) => {
                vec![(*p, *q)]
            }
            (PathEl::QuadTo(c, p), PathEl::QuadTo(d, q)) => vec![(*c, *d), (*p, *q)],
            (PathEl::CurveTo(c0, c1, p), PathEl::CurveTo(d0, d1, q)) => {
                vec![(*c0, *d0), (*c1, *d1), (*p, *q)]
            }
            (PathEl::ClosePath, PathEl::ClosePath) => vec![],
            _ => return None,
        };
        for (p, q) in points {
            let (dx, dy) = (q.x - p.x, q.y - p.y);
            match offset {
                None => offset = Some((dx, dy)),
                Some((ex, ey)) => {
                    if (dx - ex).abs() > EPSILON || (dy - ey).abs() > EPSILON {
                        return None;
                    }
                }
            }
        }
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_solid_fill() {
        let artwork = parse_artwork(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
                 <path fill="#ff0000" d="M1,1 L2,2 L1,2 Z"/>
               </svg>"##,
        )
        .unwrap();
        assert_eq!(artwork.view_box, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(artwork.layers.len(), 1);
        assert_eq!(
            artwork.layers[0].paint,
            Paint::Solid(Color::rgb(0xff, 0, 0))
        );
    }

    #[test]
    fn applies_group_transforms_to_path_data() {
        let artwork = parse_artwork(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
                 <g transform="translate(2 3)">
                   <path fill="#000000" d="M1,1 L2,2 L1,2 Z"/>
                 </g>
               </svg>"##,
        )
        .unwrap();
        assert_eq!(artwork.layers[0].path.to_svg(), "M3 4L4 5L3 5Z");
    }

    #[test]
    fn linear_gradient_fill() {
        let artwork = parse_artwork(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
                 <defs>
                   <linearGradient id="g1" x1="1" y1="1" x2="9" y2="1" gradientUnits="userSpaceOnUse">
                     <stop offset="0" stop-color="#ff0000"/>
                     <stop offset="1" stop-color="#0000ff" stop-opacity="0.5"/>
                   </linearGradient>
                 </defs>
                 <path fill="url(#g1)" d="M1,1 L9,1 L9,9 L1,9 Z"/>
               </svg>"##,
        )
        .unwrap();
        let Paint::LinearGradient(gradient) = &artwork.layers[0].paint else {
            panic!("expected a linear gradient, got {:?}", artwork.layers[0].paint);
        };
        assert_eq!(gradient.p0, Point::new(1.0, 1.0));
        assert_eq!(gradient.p1, Point::new(9.0, 1.0));
        assert_eq!(
            gradient.stops,
            vec![
                ColorStop::new(0.0, Color::rgb(0xff, 0, 0)),
                ColorStop::new(1.0, Color::new(0, 0, 0xff, 0.5)),
            ]
        );
    }

    #[test]
    fn translated_repeat_folds_into_reuse() {
        let mut layers = vec![
            PaintedLayer::new(
                BezPath::from_svg("M1,1 L2,2 Z").unwrap(),
                Paint::Solid(Color::rgb(0, 0, 0)),
            ),
            PaintedLayer::new(
                BezPath::from_svg("M5,1 L6,2 Z").unwrap(),
                Paint::Solid(Color::rgb(0, 0, 0)),
            ),
        ];
        annotate_reuse(&mut layers);
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].reuses, vec![Affine::translate((4.0, 0.0))]);
    }

    #[test]
    fn differently_painted_repeat_stays_separate() {
        let mut layers = vec![
            PaintedLayer::new(
                BezPath::from_svg("M1,1 L2,2 Z").unwrap(),
                Paint::Solid(Color::rgb(0xff, 0, 0)),
            ),
            PaintedLayer::new(
                BezPath::from_svg("M5,1 L6,2 Z").unwrap(),
                Paint::Solid(Color::rgb(0, 0, 0xff)),
            ),
        ];
        annotate_reuse(&mut layers);
        assert_eq!(layers.len(), 2);
        assert!(layers.iter().all(|l| l.reuses.is_empty()));
    }

    #[test]
    fn scaled_repeat_is_not_translation() {
        assert_eq!(
            translation_between(
                &BezPath::from_svg("M1,1 L2,2 Z").unwrap(),
                &BezPath::from_svg("M2,2 L4,4 Z").unwrap()
            ),
            None
        );
    }

    #[test]
    fn translation_detected_across_all_points() {
        assert_eq!(
            translation_between(
                &BezPath::from_svg("M1,1 L2,2 L1,3 Z").unwrap(),
                &BezPath::from_svg("M4,2 L5,3 L4,4 Z").unwrap()
            ),
            Some((3.0, 1.0))
        );
    }
}
