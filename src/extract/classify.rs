//! Surface/position classification heuristics.
//!
//! CAD exporters encode face identity inconsistently: sometimes by name
//! ("TopPlane"), sometimes only by generation order ("Plane2") or by
//! datum-letter convention (A = base). [`classify`] is a best-effort
//! cascade ordered from most to least reliable signal. The tier order is
//! load-bearing: later tiers can contradict earlier ones on ambiguous
//! input, so callers rely on first-match-wins.

use once_cell::sync::Lazy;
use regex::Regex;

static PLANE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"plane(\d+)").unwrap());
static DATUM_AT_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"datum\d+@").unwrap());

const TOP_KEYWORDS: [&str; 3] = ["top", "upper", "above"];
const BOTTOM_KEYWORDS: [&str; 4] = ["bottom", "lower", "below", "base"];

/// Feature tokens recognized by [`normalize_feature_name`], most specific first.
const FEATURE_TOKENS: [&str; 6] = ["torus", "plane", "boss", "cylinder", "cone", "sphere"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Infer a coarse physical location for a feature from its name and an
/// optional datum-letter context.
///
/// Resolution order, first match wins:
/// 1. explicit top/bottom keywords in the name,
/// 2. datum-letter convention (A base, B/C cylindrical, D top, E-H alternate),
/// 3. plane-number heuristics ("plane1" base, "plane2" and up top),
/// 4. axis-direction hints for otherwise anonymous planes,
/// 5. the name itself, unchanged (caller treats that as unclassified).
pub fn classify(feature_name: &str, datum_letter: Option<char>) -> String {
    if feature_name.is_empty() {
        return "surface".to_string();
    }
    let fname = feature_name.to_lowercase();

    if contains_any(&fname, &TOP_KEYWORDS) {
        return "top face".to_string();
    }
    if contains_any(&fname, &BOTTOM_KEYWORDS) {
        return "bottom face".to_string();
    }

    if let Some(letter) = datum_letter {
        match letter.to_ascii_uppercase() {
            // A is conventionally the primary reference (base), unless the
            // name says otherwise. The top/upper check is unreachable after
            // tier 1 but kept so the branch stands on its own.
            'A' => {
                return if fname.contains("top") || fname.contains("upper") {
                    "top face".to_string()
                } else {
                    "bottom face".to_string()
                };
            }
            'B' | 'C' => return "cylindrical side".to_string(),
            'D' => return "top face".to_string(),
            'E' | 'G' => return "top face".to_string(),
            'F' | 'H' => return "bottom face".to_string(),
            _ => {}
        }
    } else {
        if fname.contains("plane1") {
            return "bottom face".to_string();
        }
        if fname.contains("plane2") {
            return "top face".to_string();
        }
    }

    if let Some(caps) = PLANE_NUMBER.captures(&fname) {
        match caps[1].parse::<u32>() {
            Ok(1) => return "bottom face".to_string(),
            Ok(n) if n >= 2 => return "top face".to_string(),
            _ => {}
        }
    }

    if fname.contains("plane") {
        if contains_any(&fname, &["+z", "positive", "high"]) {
            return "top face".to_string();
        }
        if contains_any(&fname, &["-z", "negative", "low"]) {
            return "bottom face".to_string();
        }
        return "planar surface".to_string();
    }

    feature_name.to_string()
}

/// Reduce a raw feature name to its geometric token: lower-case, strip any
/// `datumN@` prefix, and return the first of
/// torus/plane/boss/cylinder/cone/sphere found as a substring. Names with
/// no recognized token come back lower-cased and prefix-stripped.
pub fn normalize_feature_name(feature_name: &str) -> String {
    if feature_name.is_empty() {
        return String::new();
    }
    let fname = feature_name.to_lowercase();
    let fname = DATUM_AT_PREFIX.replace_all(&fname, "");
    for token in FEATURE_TOKENS {
        if fname.contains(token) {
            return token.to_string();
        }
    }
    fname.into_owned()
}

/// Map a feature name to the vocabulary used in the Location column.
///
/// Torus is checked twice, on the raw lower-cased name and again after
/// normalization, to survive naming variants like `Datum7@Torus1`.
pub fn location_for_feature(feature_name: &str, datum_letter: Option<char>) -> String {
    if feature_name.is_empty() {
        return "surface".to_string();
    }
    let fname = feature_name.to_lowercase();

    if fname.contains("torus") || normalize_feature_name(feature_name) == "torus" {
        return "torus side".to_string();
    }
    if fname.contains("plane") {
        return classify(feature_name, datum_letter);
    }
    if fname.contains("cone") || fname.contains("conical") {
        return "conical side of the part".to_string();
    }
    if fname.contains("boss") || fname.contains("cylindrical") || fname.contains("side") {
        return "cylindrical side".to_string();
    }
    feature_name.to_string()
}

/// Map a feature name to the vocabulary used in the Surface column. Same
/// branching as [`location_for_feature`] but with the cylinder phrased as
/// a curved surface and an extra branch for explicit "face" names.
pub fn surface_for_feature(feature_name: &str) -> String {
    if feature_name.is_empty() {
        return "surface".to_string();
    }
    let fname = feature_name.to_lowercase();

    if fname.contains("torus") || normalize_feature_name(feature_name) == "torus" {
        return "torus side".to_string();
    }
    if fname.contains("plane") {
        return classify(feature_name, None);
    }
    if fname.contains("cone") || fname.contains("conical") {
        return "conical side of the part".to_string();
    }
    if fname.contains("boss") || fname.contains("cylindrical") || fname.contains("side") {
        return "curved side of the cylinder".to_string();
    }
    if fname.contains("face") {
        return "planar face".to_string();
    }
    feature_name.to_string()
}

/// Fixed Location -> Surface normalization applied to every emitted row.
/// The Surface column is always a deterministic function of Location.
pub fn surface_for_location(location: &str) -> String {
    match location {
        "cylindrical side" => "curved side of the cylinder".to_string(),
        "planar surface" => "planar face".to_string(),
        "" => "surface".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_keyword_tier_wins() {
        assert_eq!(classify("TopPlane3", None), "top face");
        assert_eq!(classify("base_plate", Some('B')), "bottom face");
        assert_eq!(classify("Upper Shell", Some('A')), "top face");
    }

    #[test]
    fn test_classify_datum_letter_conventions() {
        assert_eq!(classify("SomePlane", Some('A')), "bottom face");
        assert_eq!(classify("SomePlane", Some('B')), "cylindrical side");
        assert_eq!(classify("SomePlane", Some('C')), "cylindrical side");
        assert_eq!(classify("SomePlane", Some('D')), "top face");
        assert_eq!(classify("SomePlane", Some('E')), "top face");
        assert_eq!(classify("SomePlane", Some('F')), "bottom face");
        assert_eq!(classify("SomePlane", Some('G')), "top face");
        assert_eq!(classify("SomePlane", Some('H')), "bottom face");
    }

    #[test]
    fn test_classify_plane_number_heuristics() {
        assert_eq!(classify("Plane1", None), "bottom face");
        assert_eq!(classify("Plane2", None), "top face");
        assert_eq!(classify("plane7", None), "top face");
    }

    #[test]
    fn test_classify_unmapped_letter_falls_through_to_numbers() {
        // Letters past H carry no convention; numeric suffix still applies.
        assert_eq!(classify("Plane3", Some('K')), "top face");
    }

    #[test]
    fn test_classify_axis_hints_for_anonymous_planes() {
        assert_eq!(classify("plane_+z", None), "top face");
        assert_eq!(classify("plane_negative", None), "bottom face");
        assert_eq!(classify("MidPlane", None), "planar surface");
    }

    #[test]
    fn test_classify_unrecognized_name_returned_unchanged() {
        assert_eq!(classify("RandomName", None), "RandomName");
        assert_eq!(classify("", None), "surface");
    }

    #[test]
    fn test_normalize_strips_datum_prefix() {
        assert_eq!(normalize_feature_name("Datum29@Boss1(A)"), "boss");
        assert_eq!(normalize_feature_name("Datum7@Torus2"), "torus");
        assert_eq!(normalize_feature_name("Datum3@Widget9"), "widget9");
    }

    #[test]
    fn test_normalize_token_priority() {
        // torus outranks plane when both appear
        assert_eq!(normalize_feature_name("torus_plane"), "torus");
        assert_eq!(normalize_feature_name("MyCylinder"), "cylinder");
        assert_eq!(normalize_feature_name("Sphere4"), "sphere");
    }

    #[test]
    fn test_location_for_feature_vocabulary() {
        assert_eq!(location_for_feature("Torus1", None), "torus side");
        assert_eq!(location_for_feature("Cone_A", None), "conical side of the part");
        assert_eq!(location_for_feature("Boss1", None), "cylindrical side");
        assert_eq!(location_for_feature("Plane1", None), "bottom face");
        assert_eq!(location_for_feature("Housing", None), "Housing");
    }

    #[test]
    fn test_surface_for_feature_vocabulary() {
        assert_eq!(surface_for_feature("Boss1"), "curved side of the cylinder");
        assert_eq!(surface_for_feature("EndFace"), "planar face");
        assert_eq!(surface_for_feature("Datum2@Torus1"), "torus side");
        assert_eq!(surface_for_feature("Plane2"), "top face");
    }

    #[test]
    fn test_surface_for_location_fixed_mapping() {
        assert_eq!(surface_for_location("cylindrical side"), "curved side of the cylinder");
        assert_eq!(surface_for_location("planar surface"), "planar face");
        assert_eq!(surface_for_location("top face"), "top face");
        assert_eq!(surface_for_location("bottom face"), "bottom face");
        assert_eq!(surface_for_location(""), "surface");
        assert_eq!(surface_for_location("torus side"), "torus side");
    }
}
