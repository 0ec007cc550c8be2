//! Normalized output rows shared by every extractor.

use serde::Serialize;

/// Column headers for delimited export, in row-field order.
pub const HEADERS: [&str; 8] = [
    "Type",
    "Value",
    "Datum",
    "Location",
    "Surface",
    "Tolerance Value",
    "Upper Limit",
    "Lower Limit",
];

/// Which extractor produced a row. Drives presentation (row grouping,
/// filters) only; the data columns are uniform across kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Geometric,
    Dimensional,
    Datum,
}

/// One row of the final result table. All fields are display strings;
/// missing numerics are `"N/A"` and unresolved references are empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub kind: RowKind,
    #[serde(rename = "type")]
    pub row_type: String,
    pub value: String,
    pub datum: String,
    pub location: String,
    pub surface: String,
    pub tolerance_value: String,
    pub upper_limit: String,
    pub lower_limit: String,
}

impl ResultRow {
    /// Fields in header order, for delimited writers.
    pub fn fields(&self) -> [&str; 8] {
        [
            &self.row_type,
            &self.value,
            &self.datum,
            &self.location,
            &self.surface,
            &self.tolerance_value,
            &self.upper_limit,
            &self.lower_limit,
        ]
    }
}

/// Display glyph for a tolerance/dimension label. Unknown labels get none.
pub fn symbol_for(label: &str) -> &'static str {
    match label {
        "Straightness" => "─",
        "Flatness" => "☐",
        "Circularity" => "○",
        "Cylindricity" | "Diameter" => "⌀",
        "Length" | "Linear Distance" => "↔",
        _ => "",
    }
}

/// `"☐ Flatness"`-style label, or the bare label when no glyph exists.
pub fn type_with_symbol(label: &str) -> String {
    let symbol = symbol_for(label);
    if symbol.is_empty() {
        label.to_string()
    } else {
        format!("{} {}", symbol, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols() {
        assert_eq!(symbol_for("Flatness"), "☐");
        assert_eq!(symbol_for("Circularity"), "○");
        assert_eq!(symbol_for("Cylindricity"), "⌀");
        assert_eq!(symbol_for("Straightness"), "─");
        assert_eq!(symbol_for("Diameter"), "⌀");
        assert_eq!(symbol_for("Linear Distance"), "↔");
        assert_eq!(symbol_for("Datum"), "");
    }

    #[test]
    fn test_type_with_symbol() {
        assert_eq!(type_with_symbol("Cylindricity"), "⌀ Cylindricity");
        assert_eq!(type_with_symbol("Datum"), "Datum");
    }

    #[test]
    fn test_fields_order_matches_headers() {
        let row = ResultRow {
            kind: RowKind::Datum,
            row_type: "Datum".into(),
            value: "A".into(),
            datum: "A".into(),
            location: "bottom face".into(),
            surface: "bottom face".into(),
            tolerance_value: String::new(),
            upper_limit: String::new(),
            lower_limit: String::new(),
        };
        assert_eq!(row.fields().len(), HEADERS.len());
        assert_eq!(row.fields()[0], "Datum");
        assert_eq!(row.fields()[3], "bottom face");
    }
}
