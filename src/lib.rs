//! Color font assembler
//!
//! Takes a batch of per-glyph SVG artwork files named for the codepoint
//! sequences they render, and assembles a color font in one of several
//! encodings: composite outline glyphs, COLR v0/v1 layer lists, or embedded
//! SVG documents. Multi-codepoint sequences get `rlig` ligature rules;
//! repeated shapes are encoded once and reused.

pub mod artwork;
pub mod color;
pub mod color_glyph;
pub mod colr;
pub mod compile;
pub mod config;
pub mod error;
pub mod features;
pub mod glyf;
pub mod glyph;
pub mod glyphset;
pub mod load;
pub mod paint;
pub mod pens;
pub mod reuse;
pub mod svg;

use log::debug;

use crate::artwork::InputGlyph;
use crate::color_glyph::ColorGlyph;
use crate::config::{ColorFormat, FontConfig, OutputFormat};
use crate::error::BuildError;
use crate::glyphset::GlyphSet;

/// Everything one batch produces: the assembled glyph set, and the compiled
/// font when the destination asks for one.
#[derive(Debug)]
pub struct BuildResult {
    pub glyph_set: GlyphSet,
    pub font: Option<Vec<u8>>,
}

/// Assembles the surviving inputs into a glyph set and, for font output,
/// compiles the binary container.
pub fn generate_color_font(
    config: &FontConfig,
    inputs: Vec<InputGlyph>,
) -> Result<BuildResult, BuildError> {
    // Bitmap formats fail here, before any encoding work happens.
    if matches!(config.color_format, ColorFormat::Cbdt | ColorFormat::Sbix) {
        return Err(BuildError::NotImplemented(config.color_format));
    }

    let mut glyph_set = GlyphSet::new(&config.family, config.upem, config.keep_glyph_names);
    glyph_set.ensure_codepoints_have_glyphs(&inputs);

    let base_gid = glyph_set.len() as u16;
    let mut color_glyphs = Vec::with_capacity(inputs.len());
    for (i, input) in inputs.into_iter().enumerate() {
        let color_glyph = ColorGlyph::create(
            config.upem,
            input.filename,
            base_gid + i as u16,
            input.codepoints,
            input.artwork,
        )?;
        glyph_set.register_color_glyph(&color_glyph);
        color_glyphs.push(color_glyph);
    }
    debug_assert!(color_glyphs
        .iter()
        .all(|g| glyph_set.position(&g.glyph_name) == Some(g.glyph_id() as usize)));
    debug!("{} color glyphs in a set of {}", color_glyphs.len(), glyph_set.len());

    let rules = features::ligature_rules(&color_glyphs);
    glyph_set.features = features::fea_text(&rules);

    let documents = match config.color_format {
        ColorFormat::Glyf => {
            glyf::encode(&mut glyph_set, &color_glyphs);
            Vec::new()
        }
        ColorFormat::Colr0 => {
            colr::encode(&mut glyph_set, &color_glyphs, 0)?;
            Vec::new()
        }
        ColorFormat::Colr1 => {
            colr::encode(&mut glyph_set, &color_glyphs, 1)?;
            Vec::new()
        }
        ColorFormat::Svg => svg::encode(&mut glyph_set, &mut color_glyphs, false)?,
        ColorFormat::Svgz => svg::encode(&mut glyph_set, &mut color_glyphs, true)?,
        ColorFormat::Cbdt | ColorFormat::Sbix => unreachable!("rejected above"),
    };

    let font = match config.output_format {
        OutputFormat::Font => Some(compile::build_font(&glyph_set, config, &rules, &documents)?),
        OutputFormat::GlyphSet => None,
    };
    Ok(BuildResult { glyph_set, font })
}
