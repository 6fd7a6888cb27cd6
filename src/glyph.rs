//! Glyph naming and codepoint extraction from input filenames.

use std::fmt::Write;
use std::sync::OnceLock;

use log::warn;
use regex::Regex;

/// Deterministic glyph name for a codepoint sequence, e.g. `emoji_1f600` or
/// `emoji_1f468_200d_1f4bb`. Sequences are unique per batch so names are too.
pub fn glyph_name(codepoints: &[u32]) -> String {
    let mut name = String::from("emoji");
    for cp in codepoints {
        write!(name, "_{cp:04x}").unwrap();
    }
    name
}

fn filename_codepoints_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // An optional emoji_u prefix, then runs of hex separated by - or _.
    RE.get_or_init(|| Regex::new(r"(?:^emoji_u)?(?:[-_]?[0-9a-fA-F]+)+").unwrap())
}

/// Extracts the codepoint sequence encoded in an input filename.
///
/// Accepts the common naming shapes: `emoji_u270d.svg`, `1f600.svg`,
/// `1f468-200d-1f4bb.svg`. A name with no extractable codepoints logs a
/// warning and returns `None`; the input is skipped, not fatal.
pub fn codepoints_from_filename(filename: &str) -> Option<Vec<u32>> {
    if let Some(found) = filename_codepoints_regex().find(filename) {
        let hex_runs = found
            .as_str()
            .strip_prefix("emoji_u")
            .unwrap_or(found.as_str());
        let codepoints: Option<Vec<u32>> = hex_runs
            .split(['-', '_'])
            .filter(|run| !run.is_empty())
            .map(|run| u32::from_str_radix(run, 16).ok())
            .collect();
        match codepoints {
            Some(cps) if !cps.is_empty() => return Some(cps),
            _ => {}
        }
    }
    warn!("Bad filename {filename}; unable to extract codepoints");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_for_single_codepoint() {
        assert_eq!(glyph_name(&[0x1f600]), "emoji_1f600");
    }

    #[test]
    fn name_for_sequence() {
        assert_eq!(
            glyph_name(&[0x1f468, 0x200d, 0x1f4bb]),
            "emoji_1f468_200d_1f4bb"
        );
    }

    #[test]
    fn name_pads_short_codepoints() {
        assert_eq!(glyph_name(&[0x20]), "emoji_0020");
    }

    #[test]
    fn filename_with_prefix() {
        assert_eq!(
            codepoints_from_filename("emoji_u270d.svg"),
            Some(vec![0x270d])
        );
    }

    #[test]
    fn filename_bare_hex() {
        assert_eq!(codepoints_from_filename("1f600.svg"), Some(vec![0x1f600]));
    }

    #[test]
    fn filename_sequence_with_dashes() {
        assert_eq!(
            codepoints_from_filename("1f468-200d-1f4bb.svg"),
            Some(vec![0x1f468, 0x200d, 0x1f4bb])
        );
    }

    #[test]
    fn filename_sequence_with_underscores() {
        assert_eq!(
            codepoints_from_filename("emoji_u1f1e6_1f1e8.svg"),
            Some(vec![0x1f1e6, 0x1f1e8])
        );
    }

    #[test]
    fn filename_without_codepoints() {
        assert_eq!(codepoints_from_filename("zzz.zzz"), None);
    }
}
