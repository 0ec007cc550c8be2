//! Extract command - run the engine and print the result table

use std::fs;
use std::path::PathBuf;

use clap::ValueEnum;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::table::{all_keys, select_columns, TableConfig, TableFormatter};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::extract::row::{ResultRow, RowKind};
use crate::extract::{extract_rows, DatumDisplay, ExtractError, ExtractOptions};

#[derive(clap::Args, Debug)]
pub struct ExtractArgs {
    /// STEP file to extract from
    pub file: PathBuf,

    /// Row categories to include
    #[arg(long, value_enum, default_value_t = KindFilter::All)]
    pub kind: KindFilter,

    /// Comma-separated column subset, e.g. type,value,datum,location,surface
    #[arg(long, value_delimiter = ',')]
    pub columns: Option<Vec<String>>,

    /// How the Location column shows a resolved datum
    #[arg(long, value_enum, default_value_t = DatumStyle::Location)]
    pub datum_style: DatumStyle,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindFilter {
    All,
    Geometric,
    Dimensional,
    Datum,
}

impl KindFilter {
    pub fn matches(&self, kind: RowKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Geometric => kind == RowKind::Geometric,
            KindFilter::Dimensional => kind == RowKind::Dimensional,
            KindFilter::Datum => kind == RowKind::Datum,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatumStyle {
    /// Show the resolved location verbatim
    Location,
    /// Show "at datum X" when a letter was resolved
    AtDatum,
}

impl From<DatumStyle> for DatumDisplay {
    fn from(style: DatumStyle) -> Self {
        match style {
            DatumStyle::Location => DatumDisplay::Location,
            DatumStyle::AtDatum => DatumDisplay::AtDatum,
        }
    }
}

pub fn run(args: ExtractArgs, global: &GlobalOpts) -> Result<()> {
    let text = fs::read_to_string(&args.file)
        .map_err(|source| ExtractError::Io {
            path: args.file.display().to_string(),
            source,
        })
        .into_diagnostic()?;

    let options = ExtractOptions {
        datum_display: args.datum_style.into(),
    };
    let rows: Vec<ResultRow> = extract_rows(&text, &options)
        .into_iter()
        .filter(|r| args.kind.matches(r.kind))
        .collect();

    if global.verbose && !global.quiet {
        eprintln!(
            "{} {} line(s) read, {} row(s) extracted",
            style("gdtx:").dim(),
            text.lines().count(),
            rows.len()
        );
    }

    let visible = match &args.columns {
        Some(requested) => select_columns(requested).map_err(|msg| miette::miette!(msg))?,
        None => all_keys(),
    };

    let summary_format = matches!(global.format, OutputFormat::Auto | OutputFormat::Tsv);
    let formatter = TableFormatter::new().with_config(TableConfig {
        show_summary: summary_format && !global.quiet,
    });
    formatter.output(&rows, global.format, &visible);

    Ok(())
}
