//! `poline check`: validate and group an input file offline.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use poline_core::{input, PoRecord};

/// Arguments for `poline check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Input spreadsheet (.xlsx, .xls, .ods or .csv).
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Worksheet to read from a workbook.
    #[arg(long, value_name = "NAME")]
    pub sheet: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let records = input::load_po_records(&self.input, self.sheet.as_deref())
            .with_context(|| format!("failed to read {}", self.input.display()))?;

        if self.json {
            let out = CheckReportJson {
                pos: records.len(),
                lines: records.iter().map(|r| r.lines.len()).sum(),
                records: &records,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
            return Ok(());
        }

        print_table(&records);
        Ok(())
    }
}

#[derive(Serialize)]
struct CheckReportJson<'a> {
    pos: usize,
    lines: usize,
    records: &'a [PoRecord],
}

#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "po")]
    po: String,
    #[tabled(rename = "lines")]
    lines: usize,
    #[tabled(rename = "line numbers")]
    line_numbers: String,
}

fn print_table(records: &[PoRecord]) {
    if records.is_empty() {
        println!("{}", "No data rows found.".yellow());
        return;
    }

    let rows: Vec<CheckRow> = records
        .iter()
        .map(|record| CheckRow {
            po: record.po_id.to_string(),
            lines: record.lines.len(),
            line_numbers: record
                .lines
                .iter()
                .map(|l| l.line_number.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();
    let line_count: usize = rows.iter().map(|r| r.lines).sum();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!(
        "{} {} PO(s), {} line(s)",
        "✓".green().bold(),
        records.len(),
        line_count
    );
}
