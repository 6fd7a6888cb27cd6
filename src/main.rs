//! Color font assembly tool
//!
//! Takes a batch of per-glyph SVG files named for the codepoint sequences
//! they render, and writes a color font containing them.

use clap::Parser;
use log::info;
use smida::config::{ColorFormat, FontConfig, OutputFormat};
use smida::error::BuildError;
use smida::{generate_color_font, load};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Units per em of the generated font.
    #[arg(long, default_value_t = 1024)]
    upem: u16,

    /// Family name of the generated font.
    #[arg(long, default_value = "An Emoji Family")]
    family: String,

    /// Which color table to generate.
    #[arg(long, value_enum, default_value_t = ColorFormat::Colr0)]
    color_format: ColorFormat,

    /// Where to write the font (.ttf) or the raw glyph set (.json).
    #[arg(long, default_value = "AnEmojiFamily-Regular.ttf")]
    output_file: std::path::PathBuf,

    /// Keep glyph names in the generated font (post version 2.0).
    #[arg(long)]
    keep_glyph_names: bool,

    /// The SVG files to assemble, one per glyph.
    svg_files: Vec<std::path::PathBuf>,
}

fn run(args: Args) -> Result<(), BuildError> {
    let mut config = FontConfig::new(args.upem, args.family, args.color_format);
    config.keep_glyph_names = args.keep_glyph_names;
    config.output_format = OutputFormat::from_path(&args.output_file, args.color_format)?;

    let num_files = args.svg_files.len();
    let inputs = load::load_inputs(&args.svg_files);
    info!("{}/{} inputs prepared successfully", inputs.len(), num_files);
    if inputs.is_empty() {
        return Err(BuildError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "no inputs survived preparation",
        )));
    }

    let result = generate_color_font(&config, inputs)?;
    match result.font {
        Some(bytes) => std::fs::write(&args.output_file, bytes)?,
        None => std::fs::write(&args.output_file, serde_json::to_vec_pretty(&result.glyph_set)?)?,
    }
    info!("Wrote {}", args.output_file.display());
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
