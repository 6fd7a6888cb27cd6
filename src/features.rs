//! Ligature substitution rules: multi-codepoint sequences resolve to their
//! assembled glyph via `rlig`, emitted both as feature text and as a compiled
//! GSUB lookup.

use std::collections::BTreeMap;
use std::fmt::Write;

use write_fonts::tables::gsub::{
    Gsub, Ligature, LigatureSet, LigatureSubstFormat1, SubstitutionLookup, SubstitutionLookupList,
};
use write_fonts::tables::layout::builders::CoverageTableBuilder;
use write_fonts::tables::layout::{
    Feature, FeatureList, FeatureRecord, LangSys, Lookup, LookupFlag, Script, ScriptList,
    ScriptRecord,
};
use write_fonts::types::{GlyphId16, Tag};
use write_fonts::{NullableOffsetMarker, OffsetMarker};

use crate::color_glyph::ColorGlyph;
use crate::error::BuildError;
use crate::glyph::glyph_name;
use crate::glyphset::GlyphSet;

/// One substitution: a sequence of single-codepoint glyphs replaced by the
/// glyph assembled for the whole sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct LigatureRule {
    pub components: Vec<String>,
    pub target: String,
}

/// Rules for every multi-codepoint color glyph, ordered by codepoint sequence.
/// Single codepoints need no rule; cmap covers them.
pub fn ligature_rules(color_glyphs: &[ColorGlyph]) -> Vec<LigatureRule> {
    let mut sequences: Vec<(&[u32], &str)> = color_glyphs
        .iter()
        .filter(|g| g.codepoints.len() > 1)
        .map(|g| (g.codepoints.as_slice(), g.glyph_name.as_str()))
        .collect();
    sequences.sort();
    sequences
        .into_iter()
        .map(|(codepoints, target)| LigatureRule {
            components: codepoints.iter().map(|cp| glyph_name(&[*cp])).collect(),
            target: target.to_string(),
        })
        .collect()
}

/// The feature file text for a rule set, default script/language coverage
/// included. Emitted even when there are no rules so downstream consumers
/// always see the boilerplate.
pub fn fea_text(rules: &[LigatureRule]) -> String {
    let mut fea = String::new();
    fea.push_str("languagesystem DFLT dflt;\n");
    fea.push_str("languagesystem latn dflt;\n");
    fea.push_str("feature rlig {\n");
    for rule in rules {
        writeln!(
            fea,
            "  sub {} by {};",
            rule.components.join(" "),
            rule.target
        )
        .unwrap();
    }
    fea.push_str("} rlig;");
    fea
}

fn gid(glyph_set: &GlyphSet, rule: &LigatureRule, name: &str) -> Result<GlyphId16, BuildError> {
    glyph_set
        .position(name)
        .map(|pos| GlyphId16::new(pos as u16))
        .ok_or_else(|| BuildError::MissingLigatureGlyph {
            target: rule.target.clone(),
            glyph: name.to_string(),
        })
}

/// Compiles the rules into a GSUB table: one ligature lookup referenced by an
/// `rlig` feature under `DFLT` and `latn`. `None` when there are no rules.
pub fn compile_gsub(glyph_set: &GlyphSet, rules: &[LigatureRule]) -> Result<Option<Gsub>, BuildError> {
    if rules.is_empty() {
        return Ok(None);
    }

    // Ligature subtables are grouped by first glyph; within a set, longer
    // sequences must come first so they win over their own prefixes.
    let mut by_first: BTreeMap<GlyphId16, Vec<(Vec<GlyphId16>, GlyphId16)>> = BTreeMap::new();
    for rule in rules {
        let mut components = rule
            .components
            .iter()
            .map(|name| gid(glyph_set, rule, name))
            .collect::<Result<Vec<_>, _>>()?;
        let target = gid(glyph_set, rule, &rule.target)?;
        let first = components.remove(0);
        by_first.entry(first).or_default().push((components, target));
    }

    let coverage = by_first
        .keys()
        .copied()
        .collect::<CoverageTableBuilder>()
        .build();
    let ligature_sets = by_first
        .into_values()
        .map(|mut ligatures| {
            ligatures.sort_by_key(|(components, _)| std::cmp::Reverse(components.len()));
            LigatureSet::new(
                ligatures
                    .into_iter()
                    .map(|(components, target)| Ligature::new(target, components))
                    .collect(),
            )
        })
        .collect();
    let subtable = LigatureSubstFormat1::new(coverage, ligature_sets);
    let lookup_list = SubstitutionLookupList::new(vec![SubstitutionLookup::Ligature(
        Lookup::new(LookupFlag::empty(), vec![subtable]),
    )]);

    let feature_list = FeatureList::new(vec![FeatureRecord::new(
        Tag::new(b"rlig"),
        Feature::new(None, vec![0]),
    )]);
    let default_script = || Script {
        default_lang_sys: NullableOffsetMarker::new(Some(LangSys {
            required_feature_index: 0xffff,
            feature_indices: vec![0],
        })),
        lang_sys_records: vec![],
    };
    let script_list = ScriptList::new(vec![
        ScriptRecord {
            script_tag: Tag::new(b"DFLT"),
            script: OffsetMarker::new(default_script()),
        },
        ScriptRecord {
            script_tag: Tag::new(b"latn"),
            script: OffsetMarker::new(default_script()),
        },
    ]);

    Ok(Some(Gsub::new(script_list, feature_list, lookup_list)))
}
