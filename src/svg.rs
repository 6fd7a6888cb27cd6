//! Embedded document encoding: color glyphs grouped into shared SVG
//! documents so shapes can be referenced across glyph boundaries.
//!
//! The format only allows a reference to cross glyphs when both glyphs live
//! in the same document, and every glyph in one document must occupy a
//! contiguous glyph id range. Grouping by reuse is what makes cross-glyph
//! reuse expressible at all; the price is reshuffling the color block of the
//! glyph order.

use std::collections::HashMap;
use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use indexmap::IndexMap;
use kurbo::{Affine, Rect};

use crate::color::Color;
use crate::color_glyph::ColorGlyph;
use crate::error::BuildError;
use crate::glyphset::GlyphSet;
use crate::paint::{ColorStop, Extend, Paint};
use crate::reuse::{DisjointSets, ReuseIndex, ReuseKey};

/// One generated document and the inclusive glyph id range it covers.
#[derive(Clone, Debug)]
pub struct SvgDocument {
    pub data: Vec<u8>,
    pub min_glyph_id: u16,
    pub max_glyph_id: u16,
}

/// Encodes color glyphs into grouped documents, reassigning glyph ids so
/// every group is contiguous. Returns the documents for the font compiler to
/// embed.
pub fn encode(
    glyph_set: &mut GlyphSet,
    color_glyphs: &mut [ColorGlyph],
    compressed: bool,
) -> Result<Vec<SvgDocument>, BuildError> {
    let groups = reuse_groups(color_glyphs);
    reassign_glyph_ids(glyph_set, color_glyphs, &groups);

    let by_name: IndexMap<&str, &ColorGlyph> = color_glyphs
        .iter()
        .map(|g| (g.glyph_name.as_str(), g))
        .collect();

    let mut documents = Vec::new();
    for group in &groups {
        let doc = generate_document(group, &by_name, glyph_set.upem)?;
        let data = if compressed {
            gzip(doc.as_bytes())?
        } else {
            doc.into_bytes()
        };
        // ids were assigned sequentially across the group
        let first = group.first().expect("groups are never empty");
        let last = group.last().expect("groups are never empty");
        documents.push(SvgDocument {
            data,
            min_glyph_id: by_name[first.as_str()].glyph_id(),
            max_glyph_id: by_name[last.as_str()].glyph_id(),
        });
    }
    Ok(documents)
}

/// Partitions glyph names into groups that must share a document: the first
/// glyph to present a reuse key owns it, later presenters join its group.
fn reuse_groups(color_glyphs: &[ColorGlyph]) -> Vec<Vec<String>> {
    let mut index = ReuseIndex::new();
    let mut groups = DisjointSets::new();
    for color_glyph in color_glyphs {
        groups.make_set(&color_glyph.glyph_name);
        for layer in color_glyph.layers() {
            let key = ReuseKey::new(color_glyph.artwork.view_box, layer);
            match index.glyph_for(&key) {
                Some(owner) => groups.union(&color_glyph.glyph_name, owner),
                None => index.record(key, &color_glyph.glyph_name),
            }
        }
    }
    groups.sorted_sets()
}

/// Rewrites the color block of the glyph order as the concatenation of the
/// groups and gives each color glyph its new id. Breaks and then re-establishes
/// the "glyph id equals position" invariant.
fn reassign_glyph_ids(
    glyph_set: &mut GlyphSet,
    color_glyphs: &mut [ColorGlyph],
    groups: &[Vec<String>],
) {
    let base = glyph_set.len() - color_glyphs.len();
    let mut order = glyph_set.glyph_order()[..base].to_vec();
    let mut new_ids: HashMap<String, u16> = HashMap::new();
    for group in groups {
        for name in group {
            new_ids.insert(name.clone(), order.len() as u16);
            order.push(name.clone());
        }
    }
    glyph_set.set_glyph_order(order);
    for color_glyph in color_glyphs.iter_mut() {
        color_glyph.set_glyph_id(new_ids[color_glyph.glyph_name.as_str()]);
    }
}

/// Maps artwork units onto the em square in document coordinates: y stays
/// pointing down, the baseline sits at y = 0 and the view box top at -upem.
fn document_transform(upem: u16, view_box: Rect) -> Affine {
    let upem = upem as f64;
    let sx = upem / view_box.width();
    let sy = upem / view_box.height();
    Affine::new([
        sx,
        0.0,
        0.0,
        sy,
        -view_box.x0 * sx,
        -view_box.y0 * sy - upem,
    ])
}

enum PlannedElement {
    Path { layer: usize },
    Use { href: String, x: f64, y: f64 },
}

struct GlyphPlan {
    name: String,
    transform: Affine,
    elements: Vec<PlannedElement>,
}

fn assign_id(
    ids: &mut HashMap<(usize, usize), String>,
    group: &[String],
    glyph_index: usize,
    element_index: usize,
) -> String {
    ids.entry((glyph_index, element_index))
        .or_insert_with(|| format!("{}::{}", group[glyph_index], element_index))
        .clone()
}

fn generate_document(
    group: &[String],
    by_name: &IndexMap<&str, &ColorGlyph>,
    upem: u16,
) -> Result<String, BuildError> {
    // First pass: decide per layer whether it draws or references, and which
    // drawn elements need ids.
    let mut emitted: HashMap<ReuseKey, (usize, usize)> = HashMap::new();
    let mut ids: HashMap<(usize, usize), String> = HashMap::new();
    let mut plans: Vec<GlyphPlan> = Vec::new();
    for (glyph_index, name) in group.iter().enumerate() {
        let color_glyph = by_name[name.as_str()];
        let mut elements: Vec<PlannedElement> = Vec::new();
        for (layer_index, layer) in color_glyph.layers().iter().enumerate() {
            let key = ReuseKey::new(color_glyph.artwork.view_box, layer);
            if let Some(&(owner_glyph, owner_element)) = emitted.get(&key) {
                let href = assign_id(&mut ids, group, owner_glyph, owner_element);
                elements.push(PlannedElement::Use {
                    href,
                    x: 0.0,
                    y: 0.0,
                });
                continue;
            }
            let element_index = elements.len();
            emitted.insert(key, (glyph_index, element_index));
            elements.push(PlannedElement::Path { layer: layer_index });
            for reuse in &layer.reuses {
                let [a, b, c, d, e, f] = reuse.as_coeffs();
                if (a, b, c, d) != (1.0, 0.0, 0.0, 1.0) {
                    return Err(BuildError::NonTranslationReuse {
                        glyph: name.clone(),
                        transform: *reuse,
                    });
                }
                let href = assign_id(&mut ids, group, glyph_index, element_index);
                elements.push(PlannedElement::Use { href, x: e, y: f });
            }
        }
        plans.push(GlyphPlan {
            name: name.clone(),
            transform: document_transform(upem, color_glyph.artwork.view_box),
            elements,
        });
    }

    // Shared defs: one copy per structurally distinct gradient, renamed
    // "{owning glyph}::{original id}".
    let mut defs = String::new();
    let mut structural_ids: HashMap<String, String> = HashMap::new();
    let mut fills: HashMap<(usize, usize), String> = HashMap::new();
    for (glyph_index, name) in group.iter().enumerate() {
        let color_glyph = by_name[name.as_str()];
        let mut local: HashMap<&str, String> = HashMap::new();
        for (layer_index, layer) in color_glyph.layers().iter().enumerate() {
            let Some((original_id, body)) = gradient_body(&layer.paint) else {
                continue;
            };
            let new_id = if let Some(id) = local.get(original_id) {
                id.clone()
            } else if let Some(id) = structural_ids.get(&body) {
                local.insert(original_id, id.clone());
                id.clone()
            } else {
                let id = format!("{name}::{original_id}");
                defs.push_str(&with_id(&body, &id));
                structural_ids.insert(body, id.clone());
                local.insert(original_id, id.clone());
                id
            };
            fills.insert((glyph_index, layer_index), new_id);
        }
    }

    // Second pass: emit.
    let mut doc = String::from(r#"<svg version="1.1" xmlns="http://www.w3.org/2000/svg">"#);
    if defs.is_empty() {
        doc.push_str("<defs/>");
    } else {
        doc.push_str(&format!("<defs>{defs}</defs>"));
    }
    for (glyph_index, plan) in plans.iter().enumerate() {
        doc.push_str(&format!(
            r#"<g id="{}" transform="{}">"#,
            plan.name,
            matrix(plan.transform)
        ));
        for (element_index, element) in plan.elements.iter().enumerate() {
            match element {
                PlannedElement::Path { layer } => {
                    let painted = &by_name[plan.name.as_str()].layers()[*layer];
                    doc.push_str("<path");
                    match &painted.paint {
                        Paint::Solid(color) => {
                            if color.opaque() != Color::rgb(0, 0, 0) {
                                doc.push_str(&format!(r#" fill="{}""#, color.to_css()));
                            }
                            if !color.is_opaque() {
                                doc.push_str(&format!(
                                    r#" fill-opacity="{}""#,
                                    ntos32(color.alpha.0)
                                ));
                            }
                        }
                        _ => {
                            doc.push_str(&format!(
                                r#" fill="url(#{})""#,
                                fills[&(glyph_index, *layer)]
                            ));
                        }
                    }
                    doc.push_str(&format!(r#" d="{}""#, painted.path.to_svg()));
                    if let Some(id) = ids.get(&(glyph_index, element_index)) {
                        doc.push_str(&format!(r#" id="{id}""#));
                    }
                    doc.push_str("/>");
                }
                PlannedElement::Use { href, x, y } => {
                    doc.push_str(&format!(r##"<use href="#{href}""##));
                    if *x != 0.0 {
                        doc.push_str(&format!(r#" x="{}""#, ntos(*x)));
                    }
                    if *y != 0.0 {
                        doc.push_str(&format!(r#" y="{}""#, ntos(*y)));
                    }
                    doc.push_str("/>");
                }
            }
        }
        doc.push_str("</g>");
    }
    doc.push_str("</svg>");
    Ok(doc)
}

/// Serializes a gradient paint without its id attribute; the result doubles
/// as the structural dedup key. Returns the original id alongside.
fn gradient_body(paint: &Paint) -> Option<(&str, String)> {
    match paint {
        Paint::Solid(_) => None,
        Paint::LinearGradient(gradient) => {
            let mut attrs = format!(
                r#" x1="{}" y1="{}" x2="{}" y2="{}" gradientUnits="userSpaceOnUse""#,
                ntos(gradient.p0.x),
                ntos(gradient.p0.y),
                ntos(gradient.p1.x),
                ntos(gradient.p1.y),
            );
            push_common_attrs(&mut attrs, gradient.transform, gradient.extend);
            Some((
                &gradient.id,
                format!(
                    "<linearGradient{attrs}>{}</linearGradient>",
                    stop_elements(&gradient.stops)
                ),
            ))
        }
        Paint::RadialGradient(gradient) => {
            let mut attrs = format!(
                r#" cx="{}" cy="{}" r="{}""#,
                ntos(gradient.center.x),
                ntos(gradient.center.y),
                ntos(gradient.radius),
            );
            if gradient.focal != gradient.center {
                attrs.push_str(&format!(
                    r#" fx="{}" fy="{}""#,
                    ntos(gradient.focal.x),
                    ntos(gradient.focal.y)
                ));
            }
            attrs.push_str(r#" gradientUnits="userSpaceOnUse""#);
            push_common_attrs(&mut attrs, gradient.transform, gradient.extend);
            Some((
                &gradient.id,
                format!(
                    "<radialGradient{attrs}>{}</radialGradient>",
                    stop_elements(&gradient.stops)
                ),
            ))
        }
    }
}

fn push_common_attrs(attrs: &mut String, transform: Affine, extend: Extend) {
    if transform != Affine::IDENTITY {
        attrs.push_str(&format!(r#" gradientTransform="{}""#, matrix(transform)));
    }
    if let Some(spread) = extend.spread_method() {
        attrs.push_str(&format!(r#" spreadMethod="{spread}""#));
    }
}

fn stop_elements(stops: &[ColorStop]) -> String {
    let mut out = String::new();
    for stop in stops {
        out.push_str(&format!(
            r#"<stop offset="{}" stop-color="{}""#,
            ntos32(stop.offset.0),
            stop.color.to_css()
        ));
        if !stop.color.is_opaque() {
            out.push_str(&format!(
                r#" stop-opacity="{}""#,
                ntos32(stop.color.alpha.0)
            ));
        }
        out.push_str("/>");
    }
    out
}

/// Inserts the id as the last attribute, right before the first `>`.
fn with_id(body: &str, id: &str) -> String {
    match body.find('>') {
        Some(end) => format!(r#"{} id="{}"{}"#, &body[..end], id, &body[end..]),
        None => body.to_string(),
    }
}

fn matrix(affine: Affine) -> String {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    format!(
        "matrix({} {} {} {} {} {})",
        ntos(a),
        ntos(b),
        ntos(c),
        ntos(d),
        ntos(e),
        ntos(f)
    )
}

/// Number-to-string with integral values shortened, `10` not `10.0`.
fn ntos(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn ntos32(value: f32) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f32 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn gzip(data: &[u8]) -> Result<Vec<u8>, BuildError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
