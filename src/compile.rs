//! Container compilation: turn the finished glyph set into a binary font.

use kurbo::{BezPath, CubicBez, PathEl, Shape};
use log::debug;
use write_fonts::tables::cmap::Cmap;
use write_fonts::tables::colr::{
    BaseGlyph, BaseGlyphList, BaseGlyphPaint, ColorLine, ColorStop as ColrStop, Colr,
    Extend as ColrExtend, Layer, LayerList, Paint as ColrPaint, PaintColrLayers, PaintGlyph,
    PaintLinearGradient, PaintRadialGradient, PaintSolid,
};
use write_fonts::tables::cpal::{ColorRecord, Cpal};
use write_fonts::tables::glyf::{
    Anchor, Bbox, Component as GlyfComponent, ComponentFlags, CompositeGlyph, GlyfLocaBuilder,
    Glyph as GlyfGlyph, SimpleGlyph, Transform as GlyfTransform,
};
use write_fonts::tables::head::Head;
use write_fonts::tables::hhea::Hhea;
use write_fonts::tables::hmtx::{Hmtx, LongMetric};
use write_fonts::tables::loca::LocaFormat;
use write_fonts::tables::maxp::Maxp;
use write_fonts::tables::name::{Name, NameRecord};
use write_fonts::tables::os2::{Os2, SelectionFlags};
use write_fonts::tables::post::Post;
use write_fonts::types::{
    F2Dot14, FWord, GlyphId, GlyphId16, NameId, Tag, UfWord, Version16Dot16,
};
use write_fonts::{FontBuilder, OtRound};

use crate::color::Color;
use crate::config::{ColorFormat, FontConfig};
use crate::error::BuildError;
use crate::features::{compile_gsub, LigatureRule};
use crate::glyphset::{ColorLayer, Glyph, GlyphSet};
use crate::paint::Extend;
use crate::svg::SvgDocument;

const SVG_TAG: Tag = Tag::new(b"SVG ");

/// Compiles the glyph set, substitution rules, and any embedded documents
/// into a binary font.
pub fn build_font(
    glyph_set: &GlyphSet,
    config: &FontConfig,
    rules: &[LigatureRule],
    documents: &[SvgDocument],
) -> Result<Vec<u8>, BuildError> {
    let upem = glyph_set.upem;
    let ascender = (0.8 * upem as f64).ot_round();
    let descender: i16 = (-0.2 * upem as f64).ot_round();

    let mut builder = GlyfBuilder::new(glyph_set);
    for name in glyph_set.glyph_order() {
        builder.add(name)?;
    }
    let stats = builder.stats.clone();
    let bboxes = builder.bboxes.clone();
    let (glyf, loca, loca_format) = builder.inner.build();
    debug!("{} glyphs compiled", glyph_set.len());

    let h_metrics: Vec<LongMetric> = glyph_set
        .glyph_order()
        .iter()
        .zip(&bboxes)
        .map(|(name, bbox)| LongMetric {
            advance: glyph_set.get(name).map(|g| g.width).unwrap_or_default(),
            side_bearing: bbox.map(|b| b.x_min).unwrap_or_default(),
        })
        .collect();
    let hmtx = Hmtx::new(h_metrics.clone(), vec![]);

    let font_bbox = bboxes
        .iter()
        .flatten()
        .copied()
        .reduce(Bbox::union)
        .unwrap_or_default();
    let head = Head {
        units_per_em: upem,
        index_to_loc_format: match loca_format {
            LocaFormat::Short => 0,
            _ => 1,
        },
        x_min: font_bbox.x_min,
        y_min: font_bbox.y_min,
        x_max: font_bbox.x_max,
        y_max: font_bbox.y_max,
        ..Default::default()
    };

    let hhea = Hhea {
        ascender: FWord::new(ascender),
        descender: FWord::new(descender),
        line_gap: FWord::new(0),
        advance_width_max: UfWord::new(
            h_metrics.iter().map(|m| m.advance).max().unwrap_or_default(),
        ),
        min_left_side_bearing: FWord::new(
            bboxes.iter().flatten().map(|b| b.x_min).min().unwrap_or_default(),
        ),
        min_right_side_bearing: FWord::new(
            glyph_set
                .glyph_order()
                .iter()
                .zip(&bboxes)
                .filter_map(|(name, bbox)| {
                    let width = glyph_set.get(name)?.width as i32;
                    bbox.map(|b| (width - b.x_max as i32) as i16)
                })
                .min()
                .unwrap_or_default(),
        ),
        x_max_extent: FWord::new(font_bbox.x_max),
        caret_slope_rise: 1,
        caret_slope_run: 0,
        caret_offset: 0,
        number_of_h_metrics: glyph_set.len() as u16,
    };

    let maxp = Maxp {
        num_glyphs: glyph_set.len() as u16,
        max_points: Some(stats.max_points),
        max_contours: Some(stats.max_contours),
        max_composite_points: Some(stats.max_composite_points),
        max_composite_contours: Some(stats.max_composite_contours),
        max_zones: Some(1),
        max_twilight_points: Some(0),
        max_storage: Some(0),
        max_function_defs: Some(0),
        max_instruction_defs: Some(0),
        max_stack_elements: Some(0),
        max_size_of_instructions: Some(0),
        max_component_elements: Some(stats.max_component_elements),
        max_component_depth: Some(stats.max_component_depth),
        ..Default::default()
    };

    let mappings = glyph_set
        .codepoint_entries()
        .map(|(cp, name)| {
            let position = glyph_set
                .position(name)
                .expect("codepoint entries come from the glyph order");
            char::from_u32(cp)
                .ok_or(BuildError::BadCodepoint(cp))
                .map(|ch| (ch, GlyphId::new(position as u32)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let cmap = Cmap::from_mappings(mappings)?;

    let name = name_table(&glyph_set.family);
    let os2 = Os2 {
        us_weight_class: 400,
        us_width_class: 5,
        fs_selection: SelectionFlags::REGULAR,
        s_typo_ascender: ascender,
        s_typo_descender: descender,
        s_typo_line_gap: 0,
        us_win_ascent: ascender.max(0) as u16,
        us_win_descent: (-descender).max(0) as u16,
        ..Default::default()
    };
    let post = if glyph_set.keep_glyph_names {
        Post::new_v2(glyph_set.glyph_order().iter().map(String::as_str))
    } else {
        Post {
            version: Version16Dot16::VERSION_3_0,
            ..Default::default()
        }
    };

    let mut builder = FontBuilder::new();
    builder.add_table(&head)?;
    builder.add_table(&hhea)?;
    builder.add_table(&maxp)?;
    builder.add_table(&hmtx)?;
    builder.add_table(&cmap)?;
    builder.add_table(&glyf)?;
    builder.add_table(&loca)?;
    builder.add_table(&name)?;
    builder.add_table(&os2)?;
    builder.add_table(&post)?;

    match config.color_format {
        ColorFormat::Glyf => (),
        ColorFormat::Colr0 => {
            let (colr, cpal) = compile_colr_v0(glyph_set)?;
            builder.add_table(&colr)?;
            builder.add_table(&cpal)?;
        }
        ColorFormat::Colr1 => {
            let (colr, cpal) = compile_colr_v1(glyph_set)?;
            builder.add_table(&colr)?;
            builder.add_table(&cpal)?;
        }
        ColorFormat::Svg | ColorFormat::Svgz => {
            builder.add_raw(SVG_TAG, svg_table_bytes(documents));
        }
        // rejected during encoding dispatch, before compilation
        ColorFormat::Cbdt | ColorFormat::Sbix => {
            return Err(BuildError::NotImplemented(config.color_format))
        }
    }

    if let Some(gsub) = compile_gsub(glyph_set, rules)? {
        builder.add_table(&gsub)?;
    }

    Ok(builder.build())
}

#[derive(Clone, Debug, Default)]
struct GlyfStats {
    max_points: u16,
    max_contours: u16,
    max_composite_points: u16,
    max_composite_contours: u16,
    max_component_elements: u16,
    max_component_depth: u16,
}

struct GlyfBuilder<'a> {
    glyph_set: &'a GlyphSet,
    inner: GlyfLocaBuilder,
    stats: GlyfStats,
    bboxes: Vec<Option<Bbox>>,
    /// glyf outlines hold quadratics only; tighter than this and file size
    /// suffers, looser and curves visibly wobble
    accuracy: f64,
}

impl<'a> GlyfBuilder<'a> {
    fn new(glyph_set: &'a GlyphSet) -> Self {
        GlyfBuilder {
            glyph_set,
            inner: GlyfLocaBuilder::new(),
            stats: GlyfStats::default(),
            bboxes: Vec::new(),
            accuracy: glyph_set.upem as f64 / 1000.0,
        }
    }

    fn add(&mut self, name: &str) -> Result<(), BuildError> {
        let glyph = self
            .glyph_set
            .get(name)
            .expect("glyph order names are registered");
        let (compiled, bbox) = if !glyph.components.is_empty() {
            self.composite_glyph(glyph)?
        } else if !glyph.outline.elements().is_empty() {
            self.simple_glyph(glyph)?
        } else {
            (GlyfGlyph::Empty, None)
        };
        self.bboxes.push(bbox);
        self.inner
            .add_glyph(&compiled)
            .map_err(|error| BuildError::GlyphCompile {
                glyph: name.to_string(),
                error,
            })?;
        Ok(())
    }

    fn simple_glyph(&mut self, glyph: &Glyph) -> Result<(GlyfGlyph, Option<Bbox>), BuildError> {
        let quads = cubics_to_quads(&glyph.outline, self.accuracy);
        let simple =
            SimpleGlyph::from_bezpath(&quads).map_err(|reason| BuildError::MalformedOutline {
                glyph: glyph.name.clone(),
                reason,
            })?;
        let (points, contours) = point_stats(&quads);
        self.stats.max_points = self.stats.max_points.max(points);
        self.stats.max_contours = self.stats.max_contours.max(contours);
        let bbox = Bbox::from(quads.bounding_box());
        Ok((GlyfGlyph::Simple(simple), Some(bbox)))
    }

    /// The glyph's outline with nested components resolved, in quadratic form.
    fn flattened_outline(&self, owner: &str, name: &str) -> Result<BezPath, BuildError> {
        let glyph = self
            .glyph_set
            .get(name)
            .ok_or_else(|| BuildError::MissingComponent {
                glyph: owner.to_string(),
                component: name.to_string(),
            })?;
        if glyph.components.is_empty() {
            return Ok(cubics_to_quads(&glyph.outline, self.accuracy));
        }
        let mut out = BezPath::new();
        for component in &glyph.components {
            let placed = component.transform * self.flattened_outline(name, &component.base)?;
            for el in placed.elements() {
                out.push(*el);
            }
        }
        Ok(out)
    }

    fn component_depth(&self, glyph: &Glyph) -> u16 {
        glyph
            .components
            .iter()
            .filter_map(|component| self.glyph_set.get(&component.base))
            .map(|base| self.component_depth(base))
            .max()
            .map(|deepest| deepest + 1)
            .unwrap_or(0)
    }

    fn composite_glyph(&mut self, glyph: &Glyph) -> Result<(GlyfGlyph, Option<Bbox>), BuildError> {
        let mut compiled: Option<CompositeGlyph> = None;
        let (mut points, mut contours) = (0u16, 0u16);
        for component in &glyph.components {
            let base_gid = self
                .glyph_set
                .position(&component.base)
                .ok_or_else(|| BuildError::MissingComponent {
                    glyph: glyph.name.clone(),
                    component: component.base.clone(),
                })? as u16;
            // Extents come from the fully resolved outline; a child may
            // itself be a composite.
            let placed = component.transform * self.flattened_outline(&glyph.name, &component.base)?;
            let bbox = Bbox::from(placed.bounding_box());
            let (p, c) = point_stats(&placed);
            points += p;
            contours += c;

            let [a, b, c, d, e, f] = component.transform.as_coeffs();
            let glyf_component = GlyfComponent::new(
                GlyphId16::new(base_gid),
                Anchor::Offset {
                    x: e.ot_round(),
                    y: f.ot_round(),
                },
                GlyfTransform {
                    xx: F2Dot14::from_f32(a as f32),
                    yx: F2Dot14::from_f32(b as f32),
                    xy: F2Dot14::from_f32(c as f32),
                    yy: F2Dot14::from_f32(d as f32),
                },
                ComponentFlags::default(),
            );
            match compiled.as_mut() {
                None => compiled = Some(CompositeGlyph::new(glyf_component, bbox)),
                Some(composite) => composite.add_component(glyf_component, bbox),
            }
        }
        let composite = compiled.expect("components is non-empty");
        let bbox = composite.bbox;
        self.stats.max_composite_points = self.stats.max_composite_points.max(points);
        self.stats.max_composite_contours = self.stats.max_composite_contours.max(contours);
        self.stats.max_component_elements = self
            .stats
            .max_component_elements
            .max(glyph.components.len() as u16);
        self.stats.max_component_depth =
            self.stats.max_component_depth.max(self.component_depth(glyph));
        Ok((GlyfGlyph::Composite(composite), Some(bbox)))
    }
}

/// Replaces every cubic segment with a quadratic spline approximation.
fn cubics_to_quads(path: &BezPath, accuracy: f64) -> BezPath {
    let mut out = BezPath::new();
    let mut current = kurbo::Point::ZERO;
    let mut start = kurbo::Point::ZERO;
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                out.move_to(p);
                current = p;
                start = p;
            }
            PathEl::LineTo(p) => {
                out.line_to(p);
                current = p;
            }
            PathEl::QuadTo(c, p) => {
                out.quad_to(c, p);
                current = p;
            }
            PathEl::CurveTo(c0, c1, p) => {
                let cubic = CubicBez::new(current, c0, c1, p);
                for (_, _, quad) in cubic.to_quads(accuracy) {
                    out.quad_to(quad.p1, quad.p2);
                }
                current = p;
            }
            PathEl::ClosePath => {
                out.close_path();
                current = start;
            }
        }
    }
    out
}

/// `(points, contours)` as glyf counts them: one point per on- or off-curve
/// coordinate, one contour per move.
fn point_stats(path: &BezPath) -> (u16, u16) {
    let (mut points, mut contours) = (0u16, 0u16);
    for el in path.elements() {
        match el {
            PathEl::MoveTo(_) => {
                points += 1;
                contours += 1;
            }
            PathEl::LineTo(_) => points += 1,
            PathEl::QuadTo(..) => points += 2,
            PathEl::CurveTo(..) => points += 3,
            PathEl::ClosePath => (),
        }
    }
    (points, contours)
}

fn name_table(family: &str) -> Name {
    let full_name = format!("{family} Regular");
    let postscript = format!("{}-Regular", family.replace(' ', ""));
    let records = [
        (NameId::FAMILY_NAME, family.to_string()),
        (NameId::SUBFAMILY_NAME, "Regular".to_string()),
        (NameId::UNIQUE_ID, full_name.clone()),
        (NameId::FULL_NAME, full_name),
        (NameId::VERSION_STRING, "Version 1.000".to_string()),
        (NameId::POSTSCRIPT_NAME, postscript),
    ];
    Name::new(
        records
            .into_iter()
            .map(|(id, value)| NameRecord::new(3, 1, 0x409, id, value.into()))
            .collect(),
    )
}

/// Base glyphs with their color layers, ordered by glyph id as COLR requires.
fn bases_by_gid<'a>(
    glyph_set: &'a GlyphSet,
) -> Vec<(GlyphId16, &'a [ColorLayer])> {
    let mut bases: Vec<(GlyphId16, &[ColorLayer])> = glyph_set
        .color_layers()
        .iter()
        .filter_map(|(name, layers)| {
            let position = glyph_set.position(name)?;
            Some((GlyphId16::new(position as u16), layers.as_slice()))
        })
        .collect();
    bases.sort_by_key(|(gid, _)| *gid);
    bases
}

fn outline_gid(glyph_set: &GlyphSet, layer: &ColorLayer) -> Result<GlyphId16, BuildError> {
    glyph_set
        .position(&layer.glyph)
        .map(|pos| GlyphId16::new(pos as u16))
        .ok_or_else(|| BuildError::MissingComponent {
            glyph: layer.glyph.clone(),
            component: layer.glyph.clone(),
        })
}

fn compile_cpal(palette: &[Color]) -> Cpal {
    let mut cpal = Cpal {
        num_palettes: 1,
        num_palette_entries: palette.len() as u16,
        num_color_records: palette.len() as u16,
        color_record_indices: vec![0],
        ..Default::default()
    };
    cpal.color_records_array.set(
        palette
            .iter()
            .map(|color| ColorRecord {
                red: color.red,
                green: color.green,
                blue: color.blue,
                alpha: color.alpha_u8(),
            })
            .collect::<Vec<_>>(),
    );
    cpal
}

fn compile_colr_v0(glyph_set: &GlyphSet) -> Result<(Colr, Cpal), BuildError> {
    let palette = glyph_set.color_palettes.first().cloned().unwrap_or_default();
    let mut base_records = Vec::new();
    let mut layer_records = Vec::new();
    for (base_gid, layers) in bases_by_gid(glyph_set) {
        base_records.push(BaseGlyph::new(
            base_gid,
            layer_records.len() as u16,
            layers.len() as u16,
        ));
        for layer in layers {
            let palette_index = match &layer.paint {
                crate::colr::LayerPaint::PaletteIndex(index) => *index,
                // version 0 lists never carry the richer paints
                crate::colr::LayerPaint::Solid { palette_index, .. } => *palette_index,
                crate::colr::LayerPaint::LinearGradient { stops, .. }
                | crate::colr::LayerPaint::RadialGradient { stops, .. } => {
                    stops.first().map(|s| s.palette_index).unwrap_or_default()
                }
            };
            layer_records.push(Layer::new(outline_gid(glyph_set, layer)?, palette_index));
        }
    }
    let mut colr = Colr::default();
    colr.num_base_glyph_records = base_records.len() as u16;
    colr.num_layer_records = layer_records.len() as u16;
    colr.base_glyph_records.set(base_records);
    colr.layer_records.set(layer_records);
    Ok((colr, compile_cpal(&palette)))
}

fn compile_colr_v1(glyph_set: &GlyphSet) -> Result<(Colr, Cpal), BuildError> {
    let palette = glyph_set.color_palettes.first().cloned().unwrap_or_default();
    let mut base_paints = Vec::new();
    let mut layer_paints = Vec::new();
    for (base_gid, layers) in bases_by_gid(glyph_set) {
        let first_layer_index = layer_paints.len() as u32;
        for layer in layers {
            layer_paints.push(ColrPaint::Glyph(PaintGlyph::new(
                layer_paint(&layer.paint),
                outline_gid(glyph_set, layer)?,
            )));
        }
        base_paints.push(BaseGlyphPaint::new(
            base_gid,
            ColrPaint::ColrLayers(PaintColrLayers::new(layers.len() as u8, first_layer_index)),
        ));
    }
    let mut colr = Colr::default();
    colr.base_glyph_list
        .set(BaseGlyphList::new(base_paints.len() as u32, base_paints));
    colr.layer_list
        .set(LayerList::new(layer_paints.len() as u32, layer_paints));
    Ok((colr, compile_cpal(&palette)))
}

fn layer_paint(paint: &crate::colr::LayerPaint) -> ColrPaint {
    use crate::colr::LayerPaint;
    match paint {
        LayerPaint::PaletteIndex(index) => {
            ColrPaint::Solid(PaintSolid::new(*index, F2Dot14::from_f32(1.0)))
        }
        LayerPaint::Solid {
            palette_index,
            alpha,
        } => ColrPaint::Solid(PaintSolid::new(*palette_index, F2Dot14::from_f32(alpha.0))),
        LayerPaint::LinearGradient {
            p0,
            p1,
            p2,
            stops,
            extend,
        } => ColrPaint::LinearGradient(PaintLinearGradient::new(
            color_line(stops, *extend),
            FWord::new(p0.x.ot_round()),
            FWord::new(p0.y.ot_round()),
            FWord::new(p1.x.ot_round()),
            FWord::new(p1.y.ot_round()),
            FWord::new(p2.x.ot_round()),
            FWord::new(p2.y.ot_round()),
        )),
        LayerPaint::RadialGradient {
            c0,
            r0,
            c1,
            r1,
            stops,
            extend,
        } => ColrPaint::RadialGradient(PaintRadialGradient::new(
            color_line(stops, *extend),
            FWord::new(c0.x.ot_round()),
            FWord::new(c0.y.ot_round()),
            UfWord::new(r0.ot_round()),
            FWord::new(c1.x.ot_round()),
            FWord::new(c1.y.ot_round()),
            UfWord::new(r1.ot_round()),
        )),
    }
}

fn color_line(stops: &[crate::colr::PaintStop], extend: Extend) -> ColorLine {
    let extend = match extend {
        Extend::Pad => ColrExtend::Pad,
        Extend::Repeat => ColrExtend::Repeat,
        Extend::Reflect => ColrExtend::Reflect,
    };
    let color_stops: Vec<ColrStop> = stops
        .iter()
        .map(|stop| {
            ColrStop::new(
                F2Dot14::from_f32(stop.offset.0),
                stop.palette_index,
                F2Dot14::from_f32(stop.alpha.0),
            )
        })
        .collect();
    ColorLine::new(extend, color_stops.len() as u16, color_stops)
}

/// The SVG table in its documented binary layout: a header pointing at a
/// document list, records carrying `[start gid, end gid]` plus offset and
/// length into the trailing document data.
fn svg_table_bytes(documents: &[SvgDocument]) -> Vec<u8> {
    let list_base = 2 + 12 * documents.len();
    let mut records = Vec::new();
    let mut data = Vec::new();
    for doc in documents {
        records.push((doc.min_glyph_id, doc.max_glyph_id, list_base + data.len(), doc.data.len()));
        data.extend_from_slice(&doc.data);
    }

    let mut out = Vec::new();
    out.extend_from_slice(&0u16.to_be_bytes()); // version
    out.extend_from_slice(&10u32.to_be_bytes()); // offset to document list
    out.extend_from_slice(&0u32.to_be_bytes()); // reserved
    out.extend_from_slice(&(documents.len() as u16).to_be_bytes());
    for (start, end, offset, length) in records {
        out.extend_from_slice(&start.to_be_bytes());
        out.extend_from_slice(&end.to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(length as u32).to_be_bytes());
    }
    out.extend_from_slice(&data);
    out
}
