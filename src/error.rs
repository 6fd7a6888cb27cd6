//! Build failure taxonomy.

use kurbo::Affine;
use thiserror::Error;
use write_fonts::{tables::cmap::CmapConflict, tables::glyf::MalformedPath, BuilderError};

use crate::config::ColorFormat;

/// A fatal error; the whole batch aborts and no output is written.
///
/// Individual inputs that fail codepoint extraction or normalization are not
/// represented here: they are logged and dropped before assembly starts.
#[derive(Debug, Error)]
pub enum BuildError {
    /// An input reached assembly with an empty codepoint sequence.
    #[error("{filename}: no codepoints")]
    NoCodepoints { filename: String },

    #[error("Unsupported COLR version: {0}")]
    UnsupportedColrVersion(u16),

    /// An svg document back-reference can only carry a translation.
    #[error("reuse of a shape in {glyph} has non-translation transform {transform:?}")]
    NonTranslationReuse { glyph: String, transform: Affine },

    #[error("{0} not implemented")]
    NotImplemented(ColorFormat),

    #[error("Unable to generate {color_format} {extension}")]
    UnsupportedOutput {
        color_format: ColorFormat,
        extension: String,
    },

    /// An outline could not be converted to a glyf glyph.
    #[error("glyph {glyph}: malformed outline: {reason:?}")]
    MalformedOutline {
        glyph: String,
        reason: MalformedPath,
    },

    /// A component references a glyph name missing from the glyph set.
    #[error("glyph {glyph}: component references unknown glyph {component}")]
    MissingComponent { glyph: String, component: String },

    /// A ligature rule references a glyph name missing from the glyph set.
    #[error("ligature for {target} references unknown glyph {glyph}")]
    MissingLigatureGlyph { target: String, glyph: String },

    #[error("glyph {glyph}: {error}")]
    GlyphCompile {
        glyph: String,
        error: write_fonts::error::Error,
    },

    #[error(transparent)]
    CmapConflict(#[from] CmapConflict),

    #[error(transparent)]
    TableCompile(#[from] BuilderError),

    #[error("codepoint {0:#x} is not a valid char")]
    BadCodepoint(u32),

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
