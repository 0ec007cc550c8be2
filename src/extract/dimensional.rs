//! Dimensional tolerance extraction.
//!
//! Covers `DIMENSIONAL_SIZE` (diameters) and `DIMENSIONAL_LOCATION`
//! (feature-to-feature distances), resolving plus/minus bands through the
//! PLUS_MINUS_TOLERANCE -> TOLERANCE_VALUE -> LENGTH_MEASURE link tables
//! and nominals through DIMENSIONAL_CHARACTERISTIC_REPRESENTATION.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::datum::DatumMap;
use super::index::EntityIndex;

static DIM_SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(#\d+)\s*=\s*DIMENSIONAL_SIZE\s*\(\s*(#\d+)\s*,\s*'([^']*)'\s*\)").unwrap()
});
static DIM_LOC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(#\d+)\s*=\s*DIMENSIONAL_LOCATION\s*\(\s*'([^']*)'[^#]*#(\d+)[^#]*#(\d+)")
        .unwrap()
});
static PLUS_MINUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(#\d+)\s*=\s*PLUS_MINUS_TOLERANCE\s*\(\s*(#\d+)\s*,\s*(#\d+)\s*\)").unwrap()
});
static TOL_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(#\d+)\s*=\s*TOLERANCE_VALUE\s*\(\s*(#\d+)\s*,\s*(#\d+)\s*\)").unwrap()
});
// Also matches POSITIVE_LENGTH_MEASURE lines; both carry usable magnitudes.
static LENGTH_MEASURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(#\d+)\s*=.*?LENGTH_MEASURE\(([^)]+)\)").unwrap());
static POSITIVE_LENGTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)POSITIVE_LENGTH_MEASURE\(([^)]+)\)").unwrap());
static ENTITY_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#\d+)\s*=").unwrap());
static REPR_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\d+)\)").unwrap());
static NOMINAL_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(#(\d+)\)").unwrap());
static SHAPE_ASPECT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)SHAPE_ASPECT\s*\(\s*'([^']*)'").unwrap());
static DATUM_REF_IN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)datum\d+@[^(]*\(([A-Za-z])\)").unwrap());
static PAREN_LETTER_CI: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\(([A-Za-z])\)").unwrap());
static PLANE_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"plane(\d+)").unwrap());

/// Whether a dimension measures a single feature of size or a distance
/// between two features. Decides the ⌀/↔ glyph downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimKind {
    Size,
    Location,
}

/// One extracted dimensional tolerance, before presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionalTolerance {
    pub kind: DimKind,
    /// "Diameter", "Length", or a title-cased distance type.
    pub label: String,
    /// Nominal value as written in the file, e.g. `"10.0"`.
    pub value: String,
    pub datum: String,
    pub location: String,
    pub surface: String,
    /// `±x.xxx` band, empty when unresolved.
    pub tolerance: String,
    pub upper_limit: String,
    pub lower_limit: String,
}

#[derive(Debug, Clone, Copy)]
struct TolBand {
    lower: f64,
    upper: f64,
}

impl TolBand {
    fn range(&self) -> f64 {
        (self.upper - self.lower).abs()
    }
}

/// Link tables shared by the size and location scans.
struct LinkTables {
    /// dimension id -> tolerance value id, via PLUS_MINUS_TOLERANCE.
    plus_minus: HashMap<String, String>,
    /// tolerance value id -> resolved band.
    bands: HashMap<String, TolBand>,
    /// measure id -> magnitude.
    lengths: HashMap<String, f64>,
    /// measure id -> nominal, kept as written for display plus parsed.
    nominals: HashMap<String, (String, f64)>,
}

impl LinkTables {
    fn build(text: &str) -> Self {
        let mut lengths = HashMap::new();
        for caps in LENGTH_MEASURE.captures_iter(text) {
            if let Ok(v) = caps[2].trim().parse::<f64>() {
                lengths.insert(caps[1].to_string(), v);
            }
        }

        let mut nominals = HashMap::new();
        for line in text.lines() {
            let (Some(id), Some(val)) = (
                ENTITY_ID.captures(line),
                POSITIVE_LENGTH.captures(line),
            ) else {
                continue;
            };
            let raw = val[1].trim().to_string();
            if let Ok(parsed) = raw.parse::<f64>() {
                nominals.insert(id[1].to_string(), (raw, parsed));
            }
        }

        let mut plus_minus = HashMap::new();
        for caps in PLUS_MINUS.captures_iter(text) {
            plus_minus.insert(caps[3].to_string(), caps[2].to_string());
        }

        let mut bands = HashMap::new();
        for caps in TOL_VALUE.captures_iter(text) {
            let lower = lengths.get(&caps[2]).copied().unwrap_or(0.0);
            let upper = lengths.get(&caps[3]).copied().unwrap_or(0.0);
            bands.insert(caps[1].to_string(), TolBand { lower, upper });
        }

        LinkTables {
            plus_minus,
            bands,
            lengths,
            nominals,
        }
    }

    fn band_for(&self, dim_id: &str) -> Option<TolBand> {
        let tol_id = self.plus_minus.get(dim_id)?;
        self.bands.get(tol_id).copied()
    }

    /// Nominal for a dimension, via its characteristic representation.
    /// When several representations reference the dimension the last one
    /// in the file wins.
    fn nominal_for(&self, text: &str, index: &EntityIndex, dim_id: &str) -> Option<(String, f64)> {
        let mut found = None;
        for line in text.lines() {
            if !line.contains(dim_id) || !line.contains("DIMENSIONAL_CHARACTERISTIC_REPRESENTATION")
            {
                continue;
            }
            let Some(repr) = REPR_REF.captures(line) else {
                continue;
            };
            let repr_line = index.line(&format!("#{}", &repr[1]));
            let Some(nom_ref) = NOMINAL_REF.captures(repr_line) else {
                continue;
            };
            found = self.nominals.get(&format!("#{}", &nom_ref[1])).cloned();
        }
        found
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn feature_name_of(index: &EntityIndex, id: &str) -> String {
    SHAPE_ASPECT_NAME
        .captures(index.line(id))
        .map(|caps| caps[1].to_string())
        .unwrap_or_default()
}

/// Datum association for a size dimension, tried in order of confidence:
/// an explicit `DatumN@...(X)` reference in the name, any parenthesized
/// letter that names a known datum, then feature-kind heuristics against
/// the datum map, and finally the first known datum.
fn datum_for_size(name: &str, datums: &DatumMap) -> Option<char> {
    if let Some(caps) = DATUM_REF_IN_NAME.captures(name) {
        return caps[1].chars().next().map(|c| c.to_ascii_uppercase());
    }
    if let Some(caps) = PAREN_LETTER_CI.captures(name) {
        let letter = caps[1].chars().next()?.to_ascii_uppercase();
        if datums.contains(letter) {
            return Some(letter);
        }
    }

    let lower = name.to_lowercase();
    if lower.contains("boss") || lower.contains("cylinder") {
        if let Some(record) = datums
            .records()
            .iter()
            .find(|r| r.location.contains("cylindrical"))
        {
            return Some(record.letter);
        }
        if let Some(first) = datums.first_letter() {
            return Some(first);
        }
    }
    if lower.contains("plane") {
        if let Some(digit) = PLANE_DIGIT
            .captures(&lower)
            .and_then(|c| c[1].parse::<usize>().ok())
        {
            let sorted = datums.sorted_letters();
            if digit >= 1 && digit <= sorted.len() {
                return Some(sorted[digit - 1]);
            }
        }
        if let Some(record) = datums
            .records()
            .iter()
            .find(|r| r.location.contains("face") || r.location.contains("plane"))
        {
            return Some(record.letter);
        }
    }

    // Feature-name similarity against each datum's defining feature, in
    // discovery order.
    for record in datums.records() {
        let feature = record.feature.to_lowercase();
        let similar = ["boss", "plane1", "plane2", "plane"]
            .iter()
            .any(|kw| lower.contains(kw) && feature.contains(kw));
        if similar {
            return Some(record.letter);
        }
    }

    if !datums.is_empty() {
        if lower.contains("boss") || lower.contains("cylinder") || lower.contains("diameter") {
            if datums.contains('A') {
                return Some('A');
            }
            if let Some(record) = datums
                .records()
                .iter()
                .find(|r| r.location.contains("cylindrical"))
            {
                return Some(record.letter);
            }
        } else if lower.contains("plane") || lower.contains("length") || lower.contains("distance")
        {
            if datums.contains('A') {
                return Some('A');
            }
            if let Some(record) = datums
                .records()
                .iter()
                .find(|r| r.location.contains("face") || r.location.contains("plane"))
            {
                return Some(record.letter);
            }
        }
        return datums.first_letter();
    }
    None
}

/// Tolerance band and limit columns. Without a nominal the band is still
/// reported but the limits stay empty.
fn limits_for(nominal: Option<f64>, band: Option<TolBand>) -> (String, String, String) {
    match (nominal, band) {
        (Some(nom), Some(b)) => (
            format!("\u{b1}{:.3}", b.range() / 2.0),
            format!("{:.3}", nom + b.upper),
            format!("{:.3}", nom + b.lower),
        ),
        (None, Some(b)) => (
            format!("\u{b1}{:.3}", b.range() / 2.0),
            String::new(),
            String::new(),
        ),
        _ => (String::new(), String::new(), String::new()),
    }
}

/// Scan `DIMENSIONAL_SIZE` and `DIMENSIONAL_LOCATION` entities, in file
/// order (all sizes first, then all locations).
///
/// Letters introduced only by an explicit reference in a feature name are
/// synthesized into the datum map so every emitted letter exists as a key.
pub fn extract_dimensional(
    text: &str,
    index: &EntityIndex,
    datums: &mut DatumMap,
) -> Vec<DimensionalTolerance> {
    let tables = LinkTables::build(text);
    let mut rows = Vec::new();

    for caps in DIM_SIZE.captures_iter(text) {
        let dim_id = &caps[1];
        let feature_id = &caps[2];
        let name = feature_name_of(index, feature_id);

        let band = tables.band_for(dim_id);
        let nominal = tables.nominal_for(text, index, dim_id);
        let (tolerance, upper, lower) = limits_for(nominal.as_ref().map(|n| n.1), band);

        let letter = datum_for_size(&name, datums);
        if let Some(letter) = letter {
            datums.ensure(letter);
        }
        let datum = letter.map(|c| c.to_string()).unwrap_or_default();
        let location = if name.to_lowercase().contains("boss") {
            "cylindrical surface"
        } else {
            "cylindrical side"
        };

        rows.push(DimensionalTolerance {
            kind: DimKind::Size,
            label: "Diameter".to_string(),
            value: nominal.map(|n| n.0).unwrap_or_else(|| "N/A".to_string()),
            datum,
            location: location.to_string(),
            surface: "curved side of the cylinder".to_string(),
            tolerance,
            upper_limit: upper,
            lower_limit: lower,
        });
    }

    for caps in DIM_LOC.captures_iter(text) {
        let dim_id = &caps[1];
        let distance_type = &caps[2];
        let from_id = format!("#{}", &caps[3]);
        let to_id = format!("#{}", &caps[4]);

        let band = tables.band_for(dim_id);
        let nominal = tables.nominal_for(text, index, dim_id);
        let (tolerance, upper, lower) = limits_for(nominal.as_ref().map(|n| n.1), band);

        let name1 = feature_name_of(index, &from_id);
        let name2 = feature_name_of(index, &to_id);
        let combined = format!("{} to {}", name1, name2);

        // Try each endpoint's name, then the pair, stopping at the first hit.
        let mut datum = None;
        if !name1.is_empty() {
            datum = datum_for_size(&name1, datums);
        }
        if datum.is_none() && !name2.is_empty() {
            datum = datum_for_size(&name2, datums);
        }
        if datum.is_none() {
            datum = datum_for_size(&combined, datums);
        }
        if let Some(letter) = datum {
            datums.ensure(letter);
        }
        let datum = datum.map(|c| c.to_string()).unwrap_or_default();

        let both_planes = !name1.is_empty()
            && !name2.is_empty()
            && name1.to_lowercase().contains("plane")
            && name2.to_lowercase().contains("plane");
        let (location, surface) = if both_planes {
            ("between planes".to_string(), "planar faces".to_string())
        } else {
            ("between surfaces".to_string(), "linear distance".to_string())
        };

        let label = if distance_type.trim().is_empty() {
            "Length".to_string()
        } else {
            title_case(distance_type)
        };

        rows.push(DimensionalTolerance {
            kind: DimKind::Location,
            label,
            value: nominal.map(|n| n.0).unwrap_or_else(|| "N/A".to_string()),
            datum,
            location,
            surface,
            tolerance,
            upper_limit: upper,
            lower_limit: lower,
        });
    }

    rows
}
