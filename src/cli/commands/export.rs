//! Export command - write the result table to a delimited file

use std::fs;
use std::path::PathBuf;

use clap::ValueEnum;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::GlobalOpts;
use crate::extract::row::HEADERS;
use crate::extract::{extract_rows, ExtractError, ExtractOptions};

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// STEP file to extract from
    pub file: PathBuf,

    /// Destination file
    #[arg(short = 'o', long)]
    pub output: PathBuf,

    /// File format (the global --format applies to terminal output only)
    #[arg(long = "file-format", value_enum, default_value_t = ExportFormat::Csv)]
    pub file_format: ExportFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// RFC 4180 CSV
    Csv,
    /// Tab-separated plain text
    Txt,
}

pub fn run(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let text = fs::read_to_string(&args.file)
        .map_err(|source| ExtractError::Io {
            path: args.file.display().to_string(),
            source,
        })
        .into_diagnostic()?;

    let rows = extract_rows(&text, &ExtractOptions::default());

    match args.file_format {
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_path(&args.output).into_diagnostic()?;
            writer.write_record(HEADERS).into_diagnostic()?;
            for row in &rows {
                writer.write_record(row.fields()).into_diagnostic()?;
            }
            writer.flush().into_diagnostic()?;
        }
        ExportFormat::Txt => {
            let mut out = String::new();
            out.push_str(&HEADERS.join("\t"));
            out.push('\n');
            for row in &rows {
                out.push_str(&row.fields().join("\t"));
                out.push('\n');
            }
            fs::write(&args.output, out).into_diagnostic()?;
        }
    }

    if !global.quiet {
        println!(
            "{} {} row(s) to {}",
            style("Exported").green().bold(),
            rows.len(),
            args.output.display()
        );
    }

    Ok(())
}
