//! Datum discovery and shape-aspect refinement.
//!
//! The datum map is built in two passes: first every `DATUM` entity line
//! contributes a letter, its raw feature name, and an inferred location;
//! then `SHAPE_ASPECT` lines refine the picture. Shape-aspect data is
//! considered more authoritative than the initial datum-name inference,
//! so an inline letter in a shape aspect overwrites the earlier entry.
//! Letters are unique within a file; a redefined letter is last-write-wins.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use super::classify::classify;

static DATUM_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^#\d+\s*=\s*DATUM\('([^']*)',\$,#\d+,\.F\.,'([A-Za-z])'\);").unwrap()
});
static AT_FEATURE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@([^(]+)").unwrap());
// Lenient on purpose: tolerates a missing inline letter and trailing
// attribute noise between the name and the entity reference.
static SHAPE_ASPECT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"#\d+\s*=\s*(?i:SHAPE_ASPECT)\('([^']*?)\((\w)?'?,.*?#(\d+)\)").unwrap()
});

/// One discovered datum: the letter, the raw feature name it was carved
/// from, and the coarse location inferred for it. Records synthesized by
/// later resolution steps (a letter referenced but never defined by a
/// `DATUM` entity) have an empty feature name and produce no summary row.
#[derive(Debug, Clone)]
pub struct DatumRecord {
    pub letter: char,
    pub feature: String,
    pub location: String,
}

/// Insertion-ordered letter -> record map. Discovery order matters: the
/// trailing datum rows of the result, the round-robin straightness
/// fallback, and the "first datum" defaults all follow it.
#[derive(Debug, Default)]
pub struct DatumMap {
    records: Vec<DatumRecord>,
}

impl DatumMap {
    pub fn get(&self, letter: char) -> Option<&DatumRecord> {
        self.records.iter().find(|r| r.letter == letter)
    }

    pub fn contains(&self, letter: char) -> bool {
        self.get(letter).is_some()
    }

    /// Resolved location for a letter, `""` when unknown.
    pub fn location(&self, letter: char) -> &str {
        self.get(letter).map(|r| r.location.as_str()).unwrap_or("")
    }

    pub fn records(&self) -> &[DatumRecord] {
        &self.records
    }

    pub fn letters(&self) -> impl Iterator<Item = char> + '_ {
        self.records.iter().map(|r| r.letter)
    }

    pub fn first_letter(&self) -> Option<char> {
        self.records.first().map(|r| r.letter)
    }

    pub fn sorted_letters(&self) -> Vec<char> {
        let mut letters: Vec<char> = self.letters().collect();
        letters.sort_unstable();
        letters
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert or overwrite a full record, keeping the original discovery
    /// position on overwrite.
    pub fn upsert(&mut self, letter: char, feature: &str, location: String) {
        if let Some(existing) = self.records.iter_mut().find(|r| r.letter == letter) {
            existing.feature = feature.to_string();
            existing.location = location;
        } else {
            self.records.push(DatumRecord {
                letter,
                feature: feature.to_string(),
                location,
            });
        }
    }

    /// Overwrite just the location, synthesizing a feature-less record
    /// when the letter is new.
    pub fn set_location(&mut self, letter: char, location: String) {
        if let Some(existing) = self.records.iter_mut().find(|r| r.letter == letter) {
            existing.location = location;
        } else {
            self.records.push(DatumRecord {
                letter,
                feature: String::new(),
                location,
            });
        }
    }

    /// Make sure a letter exists as a key, without touching an existing
    /// record. Keeps the referential-integrity invariant: a row never
    /// carries a letter absent from the map.
    pub fn ensure(&mut self, letter: char) {
        if !self.contains(letter) {
            self.records.push(DatumRecord {
                letter,
                feature: String::new(),
                location: String::new(),
            });
        }
    }
}

/// Scan all `DATUM` entity lines and build the initial datum map.
///
/// The location comes from the feature token after the `@` when present
/// (`Datum29@Boss1(A)` -> `Boss1`), otherwise from classifying the whole
/// name with the datum letter as context.
pub fn resolve_datums(text: &str) -> DatumMap {
    let mut datums = DatumMap::default();
    for line in text.lines() {
        let Some(caps) = DATUM_LINE.captures(line) else {
            continue;
        };
        let feature = &caps[1];
        let letter = caps[2]
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('?');

        let location = match AT_FEATURE.captures(feature) {
            Some(at) => {
                let token = at[1].to_lowercase();
                if token.contains("boss") {
                    "cylindrical side".to_string()
                } else if token.contains("plane1") {
                    "bottom face".to_string()
                } else if token.contains("plane2") {
                    "top face".to_string()
                } else if token.contains("plane") {
                    classify(&token, Some(letter))
                } else {
                    token
                }
            }
            None => classify(feature, Some(letter)),
        };
        datums.upsert(letter, feature, location);
    }
    datums
}

/// Per-feature coarse locations keyed by the shape aspect's referenced
/// entity id (normalized to `#N` form).
#[derive(Debug, Default)]
pub struct ShapeAspects {
    by_id: HashMap<String, String>,
}

impl ShapeAspects {
    /// Coarse location for a referenced entity id, `""` when unknown.
    pub fn location_of(&self, id: &str) -> &str {
        self.by_id.get(id).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Scan `SHAPE_ASPECT` lines, recording a coarse location per referenced
/// entity and overriding the datum map whenever an inline letter names
/// the datum the aspect belongs to.
pub fn resolve_shape_aspects(text: &str, datums: &mut DatumMap) -> ShapeAspects {
    let mut aspects = ShapeAspects::default();
    for caps in SHAPE_ASPECT_LINE.captures_iter(text) {
        let name = caps[1].to_lowercase();
        let location = if name.contains("plane1") {
            "Plane1"
        } else if name.contains("plane2") {
            "Plane2"
        } else if name.contains("boss1") {
            "Boss1"
        } else if name.contains("torus") {
            "torus side"
        } else if name.contains("top") {
            "top face"
        } else if name.contains("bottom") {
            "bottom face"
        } else if name.contains("cylindrical") || name.contains("side") {
            "cylindrical side"
        } else {
            ""
        };
        aspects
            .by_id
            .insert(format!("#{}", &caps[3]), location.to_string());

        if let Some(letter) = caps.get(2).and_then(|m| m.as_str().chars().next()) {
            if letter.is_ascii_alphabetic() {
                datums.set_location(letter.to_ascii_uppercase(), location.to_string());
            }
        }
    }
    aspects
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_datum_with_boss_feature() {
        let datums = resolve_datums("#522=DATUM('Datum29@Boss1(A)',$,#23,.F.,'A');");
        assert_eq!(datums.location('A'), "cylindrical side");
        assert_eq!(datums.get('A').unwrap().feature, "Datum29@Boss1(A)");
    }

    #[test]
    fn test_resolve_datum_plane_numbering() {
        let text = "#10=DATUM('Datum1@Plane1(D)',$,#1,.F.,'D');\n\
                    #11=DATUM('Datum2@Plane2(E)',$,#2,.F.,'E');";
        let datums = resolve_datums(text);
        assert_eq!(datums.location('D'), "bottom face");
        assert_eq!(datums.location('E'), "top face");
    }

    #[test]
    fn test_resolve_datum_location_depends_only_on_feature_token() {
        // Same @token, different datum names and refs: same location.
        let a = resolve_datums("#1=DATUM('Datum5@Boss1(A)',$,#7,.F.,'A');");
        let b = resolve_datums("#9=DATUM('Datum88@Boss1(B)',$,#42,.F.,'B');");
        assert_eq!(a.location('A'), b.location('B'));
    }

    #[test]
    fn test_resolve_datum_without_at_falls_back_to_classifier() {
        let datums = resolve_datums("#5=DATUM('TopReference',$,#2,.F.,'C');");
        assert_eq!(datums.location('C'), "top face");
    }

    #[test]
    fn test_duplicate_letter_last_write_wins_keeps_order() {
        let text = "#1=DATUM('Datum1@Plane1(A)',$,#2,.F.,'A');\n\
                    #2=DATUM('Datum2@Boss1(B)',$,#3,.F.,'B');\n\
                    #3=DATUM('Datum3@Plane2(A)',$,#4,.F.,'A');";
        let datums = resolve_datums(text);
        assert_eq!(datums.len(), 2);
        assert_eq!(datums.location('A'), "top face");
        // A keeps its original discovery position
        let letters: Vec<char> = datums.letters().collect();
        assert_eq!(letters, vec!['A', 'B']);
    }

    #[test]
    fn test_shape_aspect_records_location_by_id() {
        let mut datums = DatumMap::default();
        let aspects =
            resolve_shape_aspects("#30=SHAPE_ASPECT('Plane2(,'',#14)", &mut datums);
        assert_eq!(aspects.location_of("#14"), "Plane2");
    }

    #[test]
    fn test_shape_aspect_keyword_case_insensitive() {
        let mut datums = DatumMap::default();
        let aspects =
            resolve_shape_aspects("#30=shape_aspect('Plane2(,'',#14)", &mut datums);
        assert_eq!(aspects.location_of("#14"), "Plane2");
    }

    #[test]
    fn test_shape_aspect_inline_letter_overrides_datum_location() {
        let mut datums = resolve_datums("#1=DATUM('Datum1@Plane1(A)',$,#2,.F.,'A');");
        assert_eq!(datums.location('A'), "bottom face");
        resolve_shape_aspects("#31=SHAPE_ASPECT('TopCap(A',$,#15)", &mut datums);
        assert_eq!(datums.location('A'), "top face");
    }

    #[test]
    fn test_shape_aspect_unrecognized_name_yields_empty_location() {
        let mut datums = DatumMap::default();
        let aspects =
            resolve_shape_aspects("#32=SHAPE_ASPECT('Gizmo(,'',#16)", &mut datums);
        assert_eq!(aspects.location_of("#16"), "");
    }

    #[test]
    fn test_ensure_synthesizes_featureless_record() {
        let mut datums = DatumMap::default();
        datums.ensure('Q');
        assert!(datums.contains('Q'));
        assert_eq!(datums.get('Q').unwrap().feature, "");
        datums.upsert('Q', "Datum1@Boss1(Q)", "cylindrical side".to_string());
        datums.ensure('Q');
        assert_eq!(datums.get('Q').unwrap().feature, "Datum1@Boss1(Q)");
        assert_eq!(datums.len(), 1);
    }
}
