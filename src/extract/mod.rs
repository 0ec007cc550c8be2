//! STEP (ISO 10303-21) tolerance extraction engine.
//!
//! The engine is line-oriented: it never parses the full EXPRESS schema,
//! only the entity lines that carry tolerance and datum information, and
//! it degrades gracefully when cross-references dangle. The result is one
//! flat table of [`ResultRow`]s in a stable order: geometric tolerances
//! in file order, then dimensional tolerances, then one summary row per
//! datum.

pub mod classify;
pub mod datum;
pub mod dimensional;
pub mod geometric;
pub mod index;
pub mod row;

use thiserror::Error;

use classify::surface_for_location;
use datum::{resolve_datums, resolve_shape_aspects};
use dimensional::extract_dimensional;
use geometric::extract_geometric;
use index::EntityIndex;
use row::{type_with_symbol, ResultRow, RowKind};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// How a geometric row's Location column renders its datum association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatumDisplay {
    /// The resolved location string verbatim, e.g. `"cylindrical side"`.
    #[default]
    Location,
    /// `"at datum X"` whenever a letter was resolved.
    AtDatum,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    pub datum_display: DatumDisplay,
}

/// Run the whole pipeline over raw file text.
pub fn extract_rows(text: &str, options: &ExtractOptions) -> Vec<ResultRow> {
    let index = EntityIndex::build(text);
    let mut datums = resolve_datums(text);
    resolve_shape_aspects(text, &mut datums);

    let geometric = extract_geometric(text, &index, &mut datums);
    let dimensional = extract_dimensional(text, &index, &mut datums);

    let mut rows = Vec::with_capacity(geometric.len() + dimensional.len() + datums.len());

    for tol in &geometric {
        let location = if tol.location.is_empty() {
            "surface".to_string()
        } else {
            tol.location.clone()
        };
        let display_location = match (options.datum_display, tol.datum) {
            (DatumDisplay::AtDatum, Some(letter)) => format!("at datum {}", letter),
            _ => location.clone(),
        };
        rows.push(ResultRow {
            kind: RowKind::Geometric,
            row_type: type_with_symbol(&tol.label),
            value: tol.value.clone(),
            datum: tol.datum.map(|c| c.to_string()).unwrap_or_default(),
            location: display_location,
            surface: surface_for_location(&location),
            tolerance_value: String::new(),
            upper_limit: String::new(),
            lower_limit: String::new(),
        });
    }

    for dim in &dimensional {
        // Every size row carries the diameter glyph and every distance row
        // the two-headed arrow, whatever the label says.
        let glyph = match dim.kind {
            dimensional::DimKind::Size => "\u{2300}",
            dimensional::DimKind::Location => "\u{2194}",
        };
        rows.push(ResultRow {
            kind: RowKind::Dimensional,
            row_type: format!("{} {}", glyph, dim.label),
            value: dim.value.clone(),
            datum: dim.datum.clone(),
            location: dim.location.clone(),
            surface: dim.surface.clone(),
            tolerance_value: dim.tolerance.clone(),
            upper_limit: dim.upper_limit.clone(),
            lower_limit: dim.lower_limit.clone(),
        });
    }

    // Synthesized records (letters only ever seen inside a tolerance name)
    // have no defining feature and get no summary row.
    for record in datums.records() {
        if record.feature.is_empty() {
            continue;
        }
        let letter = record.letter.to_string();
        rows.push(ResultRow {
            kind: RowKind::Datum,
            row_type: "Datum".to_string(),
            value: letter.clone(),
            datum: letter,
            location: record.location.clone(),
            surface: record.location.clone(),
            tolerance_value: String::new(),
            upper_limit: String::new(),
            lower_limit: String::new(),
        });
    }

    rows
}
