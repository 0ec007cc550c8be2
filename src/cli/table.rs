//! Table formatting for the extraction result table
//!
//! One column model shared by every output format: aligned terminal
//! output (tsv), RFC 4180 CSV, Markdown tables, and JSON. Column subsets
//! (e.g. the reduced five-column view without tolerance/limit data) are
//! selected by key.

use console::style;
use serde_json::{json, Map, Value};

use crate::cli::helpers::{escape_csv, truncate_str};
use crate::cli::OutputFormat;
use crate::extract::row::{ResultRow, RowKind};

/// Column definition with selection key, display header and width cap
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: &'static str,
    pub width: usize,
}

impl ColumnDef {
    pub const fn new(key: &'static str, header: &'static str, width: usize) -> Self {
        Self { key, header, width }
    }
}

/// The full eight-column table, in output order.
pub const COLUMNS: [ColumnDef; 8] = [
    ColumnDef::new("type", "Type", 20),
    ColumnDef::new("value", "Value", 12),
    ColumnDef::new("datum", "Datum", 18),
    ColumnDef::new("location", "Location", 26),
    ColumnDef::new("surface", "Surface", 30),
    ColumnDef::new("tolerance", "Tolerance Value", 16),
    ColumnDef::new("upper", "Upper Limit", 12),
    ColumnDef::new("lower", "Lower Limit", 12),
];

/// Every selectable column key, in output order.
pub fn all_keys() -> Vec<&'static str> {
    COLUMNS.iter().map(|c| c.key).collect()
}

/// Resolve user-supplied column names to canonical keys, preserving the
/// table's column order rather than the user's.
pub fn select_columns(requested: &[String]) -> Result<Vec<&'static str>, String> {
    for name in requested {
        if !COLUMNS.iter().any(|c| c.key == name.as_str()) {
            return Err(format!(
                "unknown column '{}' (expected one of: {})",
                name,
                all_keys().join(", ")
            ));
        }
    }
    Ok(COLUMNS
        .iter()
        .map(|c| c.key)
        .filter(|k| requested.iter().any(|r| r == k))
        .collect())
}

fn field<'r>(row: &'r ResultRow, key: &str) -> &'r str {
    match key {
        "type" => &row.row_type,
        "value" => &row.value,
        "datum" => &row.datum,
        "location" => &row.location,
        "surface" => &row.surface,
        "tolerance" => &row.tolerance_value,
        "upper" => &row.upper_limit,
        "lower" => &row.lower_limit,
        _ => "",
    }
}

/// Configuration for table output
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Show summary line after the table
    pub show_summary: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { show_summary: true }
    }
}

/// Formatter over extraction rows for the supported output formats
pub struct TableFormatter {
    config: TableConfig,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            config: TableConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    /// Output rows in the specified format
    pub fn output(&self, rows: &[ResultRow], format: OutputFormat, visible: &[&str]) {
        match format {
            OutputFormat::Csv => self.output_csv(rows, visible),
            OutputFormat::Md => self.output_md(rows, visible),
            OutputFormat::Json => self.output_json(rows, visible),
            OutputFormat::Tsv | OutputFormat::Auto => self.output_tsv(rows, visible),
        }
    }

    /// Width per visible column: widest content or header, capped at the
    /// column's defined width
    fn calculate_widths(&self, rows: &[ResultRow], visible: &[&str]) -> Vec<usize> {
        COLUMNS
            .iter()
            .filter(|c| visible.contains(&c.key))
            .map(|col| {
                let content = rows
                    .iter()
                    .map(|r| field(r, col.key).chars().count())
                    .max()
                    .unwrap_or(0);
                content.max(col.header.len()).min(col.width)
            })
            .collect()
    }

    fn output_tsv(&self, rows: &[ResultRow], visible: &[&str]) {
        let widths = self.calculate_widths(rows, visible);

        let header: Vec<String> = COLUMNS
            .iter()
            .filter(|c| visible.contains(&c.key))
            .zip(&widths)
            .map(|(col, w)| format!("{:<width$}", style(col.header).bold(), width = w))
            .collect();
        println!("{}", header.join("  "));

        let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        println!("{}", "-".repeat(total));

        for row in rows {
            let cells: Vec<String> = COLUMNS
                .iter()
                .filter(|c| visible.contains(&c.key))
                .zip(&widths)
                .map(|(col, w)| {
                    let text = truncate_str(field(row, col.key), *w);
                    if col.key == "type" {
                        let styled = match row.kind {
                            RowKind::Geometric => style(&text).cyan(),
                            RowKind::Dimensional => style(&text).green(),
                            RowKind::Datum => style(&text).yellow(),
                        };
                        format!("{:<width$}", styled, width = w)
                    } else {
                        format!("{:<width$}", text, width = w)
                    }
                })
                .collect();
            println!("{}", cells.join("  "));
        }

        if self.config.show_summary {
            let geometric = rows.iter().filter(|r| r.kind == RowKind::Geometric).count();
            let dimensional = rows
                .iter()
                .filter(|r| r.kind == RowKind::Dimensional)
                .count();
            let datums = rows.iter().filter(|r| r.kind == RowKind::Datum).count();
            println!();
            println!(
                "{} row(s): {} geometric, {} dimensional, {} datum.",
                style(rows.len()).cyan(),
                geometric,
                dimensional,
                datums
            );
        }
    }

    fn output_csv(&self, rows: &[ResultRow], visible: &[&str]) {
        let headers: Vec<&str> = COLUMNS
            .iter()
            .filter(|c| visible.contains(&c.key))
            .map(|c| c.header)
            .collect();
        println!("{}", headers.join(","));

        for row in rows {
            let cells: Vec<String> = COLUMNS
                .iter()
                .filter(|c| visible.contains(&c.key))
                .map(|col| escape_csv(field(row, col.key)))
                .collect();
            println!("{}", cells.join(","));
        }
    }

    fn output_md(&self, rows: &[ResultRow], visible: &[&str]) {
        let cols: Vec<&ColumnDef> = COLUMNS.iter().filter(|c| visible.contains(&c.key)).collect();

        let header: Vec<&str> = cols.iter().map(|c| c.header).collect();
        println!("| {} |", header.join(" | "));
        let sep: Vec<&str> = cols.iter().map(|_| "---").collect();
        println!("| {} |", sep.join(" | "));

        for row in rows {
            let cells: Vec<String> = cols
                .iter()
                .map(|col| field(row, col.key).replace('|', "\\|"))
                .collect();
            println!("| {} |", cells.join(" | "));
        }
    }

    fn output_json(&self, rows: &[ResultRow], visible: &[&str]) {
        let out: Vec<Value> = rows
            .iter()
            .map(|row| {
                let mut map = Map::new();
                map.insert("kind".to_string(), json!(row.kind));
                for col in COLUMNS.iter().filter(|c| visible.contains(&c.key)) {
                    map.insert(col.key.to_string(), json!(field(row, col.key)));
                }
                Value::Object(map)
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&out).unwrap_or_else(|_| "[]".to_string())
        );
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_columns_preserves_table_order() {
        let requested = vec!["datum".to_string(), "type".to_string()];
        assert_eq!(select_columns(&requested).unwrap(), vec!["type", "datum"]);
    }

    #[test]
    fn test_select_columns_rejects_unknown() {
        let requested = vec!["bogus".to_string()];
        let err = select_columns(&requested).unwrap_err();
        assert!(err.contains("bogus"));
        assert!(err.contains("type"));
    }

    #[test]
    fn test_all_keys_order() {
        assert_eq!(
            all_keys(),
            vec![
                "type",
                "value",
                "datum",
                "location",
                "surface",
                "tolerance",
                "upper",
                "lower"
            ]
        );
    }
}
