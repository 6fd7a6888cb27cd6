//! Batch configuration.

use std::fmt;
use std::path::Path;

use clap::ValueEnum;

use crate::error::BuildError;

/// Which color table the finished font carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorFormat {
    /// Composite outline glyphs only; no color table.
    Glyf,
    /// COLR version 0 + CPAL.
    #[value(name = "colr_0")]
    Colr0,
    /// COLR version 1 + CPAL.
    #[value(name = "colr_1")]
    Colr1,
    /// SVG table, uncompressed documents.
    Svg,
    /// SVG table, gzip-compressed documents.
    Svgz,
    /// Bitmap CBDT/CBLC. Not implemented; selecting it fails the build.
    Cbdt,
    /// Bitmap sbix. Not implemented; selecting it fails the build.
    Sbix,
}

impl fmt::Display for ColorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorFormat::Glyf => "glyf",
            ColorFormat::Colr0 => "colr_0",
            ColorFormat::Colr1 => "colr_1",
            ColorFormat::Svg => "svg",
            ColorFormat::Svgz => "svgz",
            ColorFormat::Cbdt => "cbdt",
            ColorFormat::Sbix => "sbix",
        };
        f.write_str(name)
    }
}

/// What the destination path's extension asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// A compiled binary font (`.ttf`).
    Font,
    /// The uncompiled glyph set, serialized as JSON (`.json`).
    GlyphSet,
}

impl OutputFormat {
    /// Selects the output form from the destination extension.
    pub fn from_path(path: &Path, color_format: ColorFormat) -> Result<Self, BuildError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        match extension {
            "ttf" => Ok(OutputFormat::Font),
            "json" => Ok(OutputFormat::GlyphSet),
            _ => Err(BuildError::UnsupportedOutput {
                color_format,
                extension: format!(".{extension}"),
            }),
        }
    }
}

/// Immutable configuration for one batch, threaded through the pipeline.
#[derive(Clone, Debug)]
pub struct FontConfig {
    pub upem: u16,
    pub family: String,
    pub color_format: ColorFormat,
    pub output_format: OutputFormat,
    pub keep_glyph_names: bool,
}

impl FontConfig {
    pub fn new(upem: u16, family: impl Into<String>, color_format: ColorFormat) -> Self {
        FontConfig {
            upem,
            family: family.into(),
            color_format,
            output_format: OutputFormat::Font,
            keep_glyph_names: false,
        }
    }
}
