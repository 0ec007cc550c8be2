//! Geometric (form) tolerance extraction.
//!
//! Recognizes FLATNESS/STRAIGHTNESS/CYLINDRICITY/ROUNDNESS tolerance
//! entities, resolves each to a nominal value through the entity index,
//! and associates a datum letter and surface location through an ordered
//! fallback chain. CAD exports frequently omit the explicit link, so the
//! later tiers are intentionally speculative; the chain order is part of
//! the contract and each tier guards on what earlier tiers left open.

use once_cell::sync::Lazy;
use regex::Regex;

use super::datum::DatumMap;
use super::index::EntityIndex;

static TOLERANCE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(#\d+)\s*=\s*(CYLINDRICITY|FLATNESS|STRAIGHTNESS|ROUNDNESS)_TOLERANCE\(\s*'([^']*)'\s*,\s*''\s*,\s*(#\d+)",
    )
    .unwrap()
});
static MEASURE_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:LENGTH_MEASURE|VALUE_REPRESENTATION_ITEM)\s*\(\s*([\d.]+)").unwrap()
});
static PAREN_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([A-Z])\)").unwrap());
static ENTITY_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\d+)").unwrap());
static DATUM_FEATURE_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i:DATUM_FEATURE)\([^']*'[^']*\(([A-Z])\)'").unwrap());

/// One extracted form tolerance, before presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricTolerance {
    /// Flatness, Straightness, Circularity or Cylindricity.
    pub label: String,
    /// Nominal value as captured, or `"N/A"`.
    pub value: String,
    pub datum: Option<char>,
    pub location: String,
}

/// Working state threaded through the fallback chain.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Resolution {
    pub datum: Option<char>,
    pub location: String,
}

/// Inputs visible to every tier of the chain.
pub struct TierCtx<'a> {
    pub label: &'a str,
    pub name: &'a str,
    pub tol_id: &'a str,
    pub text: &'a str,
    pub index: &'a EntityIndex,
    pub datums: &'a DatumMap,
    /// Rows emitted before this tolerance; the straightness round-robin
    /// keys off it. Scan-order dependent, kept for compatibility.
    pub rows_emitted: usize,
}

/// The datum/location fallback chain, most to least reliable.
const CHAIN: &[(&str, fn(&TierCtx, &mut Resolution))] = &[
    ("explicit-letter", tier_explicit_letter),
    ("known-letter-scan", tier_known_letter_scan),
    ("datum-feature-link", tier_datum_feature_link),
    ("feature-keyword", tier_feature_keyword),
    ("compatible-location", tier_compatible_location),
    ("type-default", tier_type_default),
];

/// Tier 1: a parenthesized uppercase letter in the tolerance's own name.
/// The letter is taken even when the datum map has never seen it; the
/// caller synthesizes the map entry so referential integrity holds.
fn tier_explicit_letter(ctx: &TierCtx, res: &mut Resolution) {
    if res.datum.is_some() {
        return;
    }
    if let Some(caps) = PAREN_LETTER.captures(ctx.name) {
        if let Some(letter) = caps[1].chars().next() {
            res.datum = Some(letter);
            res.location = ctx.datums.location(letter).to_string();
        }
    }
}

/// Tier 2: case-insensitive scan of every known letter against the name.
fn tier_known_letter_scan(ctx: &TierCtx, res: &mut Resolution) {
    if res.datum.is_some() {
        return;
    }
    let name_lower = ctx.name.to_lowercase();
    for letter in ctx.datums.letters() {
        let lower = format!("({})", letter.to_ascii_lowercase());
        let upper = format!("({})", letter);
        if name_lower.contains(&lower) || ctx.name.contains(&upper) {
            res.datum = Some(letter);
            res.location = ctx.datums.location(letter).to_string();
            return;
        }
    }
}

/// Tier 3: follow the entity refs on the tolerance's own line to any
/// DATUM_FEATURE line that mentions them, and lift its inline letter.
fn tier_datum_feature_link(ctx: &TierCtx, res: &mut Resolution) {
    if res.datum.is_some() {
        return;
    }
    let tol_line = ctx.index.line(ctx.tol_id);
    for ref_caps in ENTITY_REF.captures_iter(tol_line) {
        let needle = format!("#{}", &ref_caps[1]);
        for line in ctx.text.lines() {
            if !line.contains(&needle) {
                continue;
            }
            if let Some(df) = DATUM_FEATURE_LETTER.captures(line) {
                if let Some(letter) = df[1].chars().next() {
                    res.datum = Some(letter);
                    res.location = ctx.datums.location(letter).to_string();
                    break;
                }
            }
        }
        if res.datum.is_some() {
            return;
        }
    }
}

/// Tier 4: feature keywords in the tolerance name fix the location, and
/// where possible a datum whose defining feature shares the keyword.
fn tier_feature_keyword(ctx: &TierCtx, res: &mut Resolution) {
    if !res.location.is_empty() {
        return;
    }
    let name_lower = ctx.name.to_lowercase();

    let keyword_location: Option<(&str, &str)> = if name_lower.contains("boss") {
        Some(("boss", "cylindrical side"))
    } else if name_lower.contains("plane1") {
        Some(("plane1", "bottom face"))
    } else if name_lower.contains("plane2") {
        Some(("plane2", "top face"))
    } else if name_lower.contains("plane") {
        res.location = "planar surface".to_string();
        None
    } else {
        None
    };

    if let Some((keyword, location)) = keyword_location {
        res.location = location.to_string();
        if res.datum.is_none() {
            res.datum = ctx
                .datums
                .records()
                .iter()
                .find(|r| r.feature.to_lowercase().contains(keyword))
                .map(|r| r.letter);
        }
    }
}

const PLANAR_FAMILY: [&str; 3] = ["bottom face", "top face", "planar surface"];

/// Tier 5: a location without a letter adopts any datum whose own
/// location is compatible (exact for cylindrical, any planar for planar).
fn tier_compatible_location(ctx: &TierCtx, res: &mut Resolution) {
    if res.datum.is_some() || res.location.is_empty() {
        return;
    }
    for record in ctx.datums.records() {
        let compatible = (res.location == "cylindrical side"
            && record.location == "cylindrical side")
            || (PLANAR_FAMILY.contains(&res.location.as_str())
                && PLANAR_FAMILY.contains(&record.location.as_str()));
        if compatible {
            res.datum = Some(record.letter);
            return;
        }
    }
}

/// Tier 6: nothing resolved a location, so fall back to what the
/// tolerance type implies. The straightness arm cycles through the known
/// datums by emission count; deterministic but arbitrary, a documented
/// limitation rather than a guarantee.
fn tier_type_default(ctx: &TierCtx, res: &mut Resolution) {
    if !res.location.is_empty() {
        return;
    }
    match ctx.label.to_lowercase().as_str() {
        "cylindricity" | "circularity" => {
            res.location = "cylindrical side".to_string();
            if let Some(record) = ctx
                .datums
                .records()
                .iter()
                .find(|r| r.location == "cylindrical side")
            {
                res.datum = Some(record.letter);
            }
        }
        "flatness" => {
            res.location = "planar surface".to_string();
            if let Some(record) = ctx
                .datums
                .records()
                .iter()
                .find(|r| r.location.contains("face"))
            {
                res.datum = Some(record.letter);
                res.location = record.location.clone();
            }
        }
        "straightness" => {
            let available: Vec<char> = ctx.datums.letters().collect();
            if available.is_empty() {
                return;
            }
            let letter = if ctx.rows_emitted < available.len() {
                available[ctx.rows_emitted % available.len()]
            } else {
                available[0]
            };
            res.datum = Some(letter);
            res.location = ctx.datums.location(letter).to_string();
        }
        _ => {}
    }
}

/// Run the full chain for one tolerance.
pub fn resolve_datum_and_location(ctx: &TierCtx) -> Resolution {
    let mut res = Resolution::default();
    for (_, tier) in CHAIN {
        tier(ctx, &mut res);
    }
    res
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Scan the text for form-tolerance entities, in file order.
///
/// Letters introduced by the name itself (tier 1) are synthesized into
/// the datum map so every emitted letter exists as a key.
pub fn extract_geometric(
    text: &str,
    index: &EntityIndex,
    datums: &mut DatumMap,
) -> Vec<GeometricTolerance> {
    let mut rows: Vec<GeometricTolerance> = Vec::new();
    for caps in TOLERANCE_LINE.captures_iter(text) {
        let tol_id = &caps[1];
        let tol_type = caps[2].to_uppercase();
        let name = &caps[3];
        let ref_id = &caps[4];

        let definition = index.line(ref_id);
        let value = MEASURE_VALUE
            .captures(definition)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let label = if tol_type == "ROUNDNESS" {
            "Circularity".to_string()
        } else {
            capitalize(&tol_type)
        };

        let res = {
            let ctx = TierCtx {
                label: &label,
                name,
                tol_id,
                text,
                index,
                datums,
                rows_emitted: rows.len(),
            };
            resolve_datum_and_location(&ctx)
        };
        if let Some(letter) = res.datum {
            datums.ensure(letter);
        }
        rows.push(GeometricTolerance {
            label,
            value,
            datum: res.datum,
            location: res.location,
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::datum::resolve_datums;

    fn ctx_with<'a>(
        label: &'a str,
        name: &'a str,
        tol_id: &'a str,
        text: &'a str,
        index: &'a EntityIndex,
        datums: &'a DatumMap,
        rows_emitted: usize,
    ) -> TierCtx<'a> {
        TierCtx {
            label,
            name,
            tol_id,
            text,
            index,
            datums,
            rows_emitted,
        }
    }

    #[test]
    fn test_tier_explicit_letter() {
        let datums = resolve_datums("#1=DATUM('Datum1@Boss1(A)',$,#2,.F.,'A');");
        let index = EntityIndex::default();
        let ctx = ctx_with("Cylindricity", "Tol3(A)", "#9", "", &index, &datums, 0);
        let mut res = Resolution::default();
        tier_explicit_letter(&ctx, &mut res);
        assert_eq!(res.datum, Some('A'));
        assert_eq!(res.location, "cylindrical side");
    }

    #[test]
    fn test_tier_known_letter_scan_lowercase() {
        let datums = resolve_datums("#1=DATUM('Datum1@Plane2(D)',$,#2,.F.,'D');");
        let index = EntityIndex::default();
        let ctx = ctx_with("Flatness", "flat(d)", "#9", "", &index, &datums, 0);
        let mut res = Resolution::default();
        tier_known_letter_scan(&ctx, &mut res);
        assert_eq!(res.datum, Some('D'));
        assert_eq!(res.location, "top face");
    }

    #[test]
    fn test_tier_datum_feature_link() {
        let text = "#70=FLATNESS_TOLERANCE('flat','',#71);\n\
                    #72=DATUM_FEATURE('Face(B)','',#71,.T.);\n\
                    #1=DATUM('Datum1@Boss1(B)',$,#2,.F.,'B');";
        let index = EntityIndex::build(text);
        let datums = resolve_datums(text);
        let ctx = ctx_with("Flatness", "flat", "#70", text, &index, &datums, 0);
        let mut res = Resolution::default();
        tier_datum_feature_link(&ctx, &mut res);
        assert_eq!(res.datum, Some('B'));
        assert_eq!(res.location, "cylindrical side");
    }

    #[test]
    fn test_tier_datum_feature_link_keyword_case_insensitive() {
        let text = "#70=FLATNESS_TOLERANCE('flat','',#71);\n\
                    #72=datum_feature('Face(B)','',#71,.T.);\n\
                    #1=DATUM('Datum1@Boss1(B)',$,#2,.F.,'B');";
        let index = EntityIndex::build(text);
        let datums = resolve_datums(text);
        let ctx = ctx_with("Flatness", "flat", "#70", text, &index, &datums, 0);
        let mut res = Resolution::default();
        tier_datum_feature_link(&ctx, &mut res);
        assert_eq!(res.datum, Some('B'));
    }

    #[test]
    fn test_tier_feature_keyword_finds_matching_datum() {
        let datums = resolve_datums("#1=DATUM('Datum1@Boss1(B)',$,#2,.F.,'B');");
        let index = EntityIndex::default();
        let ctx = ctx_with("Circularity", "Boss1 control", "#9", "", &index, &datums, 0);
        let mut res = Resolution::default();
        tier_feature_keyword(&ctx, &mut res);
        assert_eq!(res.location, "cylindrical side");
        assert_eq!(res.datum, Some('B'));
    }

    #[test]
    fn test_tier_feature_keyword_generic_plane_sets_no_datum() {
        let datums = DatumMap::default();
        let index = EntityIndex::default();
        let ctx = ctx_with("Flatness", "some plane", "#9", "", &index, &datums, 0);
        let mut res = Resolution::default();
        tier_feature_keyword(&ctx, &mut res);
        assert_eq!(res.location, "planar surface");
        assert_eq!(res.datum, None);
    }

    #[test]
    fn test_tier_compatible_location_planar_family() {
        let datums = resolve_datums("#1=DATUM('Datum1@Plane1(A)',$,#2,.F.,'A');");
        let index = EntityIndex::default();
        let ctx = ctx_with("Flatness", "", "#9", "", &index, &datums, 0);
        let mut res = Resolution {
            datum: None,
            location: "planar surface".to_string(),
        };
        tier_compatible_location(&ctx, &mut res);
        assert_eq!(res.datum, Some('A'));
    }

    #[test]
    fn test_tier_type_default_flatness_adopts_face_datum() {
        let datums = resolve_datums("#1=DATUM('Datum1@Plane2(D)',$,#2,.F.,'D');");
        let index = EntityIndex::default();
        let ctx = ctx_with("Flatness", "unnamed", "#9", "", &index, &datums, 0);
        let mut res = Resolution::default();
        tier_type_default(&ctx, &mut res);
        assert_eq!(res.datum, Some('D'));
        assert_eq!(res.location, "top face");
    }

    #[test]
    fn test_tier_type_default_straightness_round_robin() {
        let text = "#1=DATUM('Datum1@Plane1(A)',$,#2,.F.,'A');\n\
                    #3=DATUM('Datum2@Boss1(B)',$,#4,.F.,'B');";
        let datums = resolve_datums(text);
        let index = EntityIndex::default();

        let mut first = Resolution::default();
        tier_type_default(
            &ctx_with("Straightness", "s", "#9", "", &index, &datums, 0),
            &mut first,
        );
        let mut second = Resolution::default();
        tier_type_default(
            &ctx_with("Straightness", "s", "#9", "", &index, &datums, 1),
            &mut second,
        );
        let mut third = Resolution::default();
        tier_type_default(
            &ctx_with("Straightness", "s", "#9", "", &index, &datums, 5),
            &mut third,
        );
        assert_eq!(first.datum, Some('A'));
        assert_eq!(second.datum, Some('B'));
        // past the end of the list the first datum is reused
        assert_eq!(third.datum, Some('A'));
    }

    #[test]
    fn test_extract_geometric_resolves_value_through_index() {
        let text = "#10=DATUM('Datum1@Boss1(A)',$,#1,.F.,'A');\n\
                    #20=CYLINDRICITY_TOLERANCE('Tol(A)','',#30);\n\
                    #30=LENGTH_MEASURE_WITH_UNIT(LENGTH_MEASURE(0.05),#40);";
        let index = EntityIndex::build(text);
        let mut datums = resolve_datums(text);
        let rows = extract_geometric(text, &index, &mut datums);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label, "Cylindricity");
        assert_eq!(rows[0].value, "0.05");
        assert_eq!(rows[0].datum, Some('A'));
        assert_eq!(rows[0].location, "cylindrical side");
    }

    #[test]
    fn test_extract_geometric_missing_value_is_na() {
        let text = "#20=FLATNESS_TOLERANCE('flat','',#99);";
        let index = EntityIndex::build(text);
        let mut datums = DatumMap::default();
        let rows = extract_geometric(text, &index, &mut datums);
        assert_eq!(rows[0].value, "N/A");
        assert_eq!(rows[0].label, "Flatness");
        assert_eq!(rows[0].location, "planar surface");
        assert_eq!(rows[0].datum, None);
    }

    #[test]
    fn test_extract_geometric_roundness_relabeled_circularity() {
        let text = "#20=ROUNDNESS_TOLERANCE('r','',#99);";
        let index = EntityIndex::build(text);
        let mut datums = DatumMap::default();
        let rows = extract_geometric(text, &index, &mut datums);
        assert_eq!(rows[0].label, "Circularity");
        assert_eq!(rows[0].location, "cylindrical side");
    }

    #[test]
    fn test_unknown_explicit_letter_synthesized_into_map() {
        let text = "#20=FLATNESS_TOLERANCE('flat(Z)','',#99);";
        let index = EntityIndex::build(text);
        let mut datums = DatumMap::default();
        let rows = extract_geometric(text, &index, &mut datums);
        assert_eq!(rows[0].datum, Some('Z'));
        assert!(datums.contains('Z'));
        assert_eq!(datums.get('Z').unwrap().feature, "");
    }
}
