//! `poline run`: reconcile every PO in the input file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use poline_core::{PartialBatchPolicy, RunConfig, Settings};
use poline_workflow::{pipeline, PoOutcome, PoReport, RunSummary};

/// Arguments for `poline run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML settings file; flags override its values.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Target environment: prod, test or dev.
    #[arg(long = "env", value_name = "ENV", conflicts_with = "base_url")]
    pub environment: Option<String>,

    /// Explicit API base URL instead of a named environment.
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Input spreadsheet (.xlsx, .xls, .ods or .csv).
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Worksheet to read from a workbook.
    #[arg(long, value_name = "NAME")]
    pub sheet: Option<String>,

    /// API key sent with every request.
    #[arg(long, env = "POLINE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Audit log, appended to (default: updated_po_lines.csv).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Per-request timeout in seconds (default: 30).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// What to do when a line number is missing from a PO.
    #[arg(long, value_name = "POLICY")]
    pub partial_batch: Option<PartialBatchPolicy>,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let config = self.into_run_config()?;
        tracing::debug!(?config, "configuration resolved");

        let target = match config.environment {
            Some(env) => format!("{env} ({})", config.base_url),
            None => config.base_url.clone(),
        };
        println!(
            "Updating PO lines from {} against {}",
            config.input.display(),
            target.bold()
        );

        let summary = pipeline::run(&config, print_progress).context("run aborted")?;
        print_summary(&summary, &config);
        Ok(())
    }

    fn into_run_config(self) -> Result<RunConfig> {
        let base = match &self.config {
            Some(path) => Settings::load(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => Settings::default(),
        };
        let flags = Settings {
            environment: self.environment,
            base_url: self.base_url,
            api_key: self.api_key,
            input: self.input,
            sheet: self.sheet,
            log_file: self.log_file,
            timeout_secs: self.timeout,
            partial_batch: self.partial_batch,
        };
        base.merge(flags)
            .into_run_config()
            .context("invalid configuration")
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_progress(report: &PoReport) {
    let po = report.po_id;
    match &report.outcome {
        PoOutcome::Updated { lines } => {
            println!("{} PO {po}: {lines} line(s) updated", "✓".green().bold())
        }
        PoOutcome::Rejected { lines, excerpt } => println!(
            "{} PO {po}: update of {lines} line(s) rejected: {excerpt}",
            "✗".red().bold()
        ),
        PoOutcome::FetchFailed { reason } | PoOutcome::Skipped { reason } => {
            println!("{} PO {po}: {reason}", "✗".red().bold())
        }
        PoOutcome::NothingToUpdate => {
            println!("{} PO {po}: nothing to update", "·".bright_black().bold())
        }
    }
    for id in &report.reopen_failures {
        println!("    line {id}: {}", "NOT reopened".yellow());
    }
    for close in &report.closes {
        if close.closed {
            println!("    line {}: closed", close.line_id);
        } else {
            println!(
                "    line {}: {} {}",
                close.line_id,
                "NOT closed".red(),
                close.detail
            );
        }
    }
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "po")]
    po: String,
    #[tabled(rename = "result")]
    result: String,
    #[tabled(rename = "lines")]
    lines: String,
    #[tabled(rename = "reopened")]
    reopened: usize,
    #[tabled(rename = "closed")]
    closed: String,
}

fn outcome_label(outcome: &PoOutcome) -> (&'static str, String) {
    match outcome {
        PoOutcome::Updated { lines } => ("UPDATED", lines.to_string()),
        PoOutcome::Rejected { lines, .. } => ("REJECTED", lines.to_string()),
        PoOutcome::FetchFailed { .. } => ("FETCH FAILED", "-".to_string()),
        PoOutcome::Skipped { .. } => ("SKIPPED", "-".to_string()),
        PoOutcome::NothingToUpdate => ("NOTHING TO UPDATE", "0".to_string()),
    }
}

fn print_summary(summary: &RunSummary, config: &RunConfig) {
    if summary.reports.is_empty() {
        println!("No POs found in {}.", config.input.display());
        return;
    }

    let rows: Vec<SummaryRow> = summary
        .reports
        .iter()
        .map(|report| {
            let (result, lines) = outcome_label(&report.outcome);
            SummaryRow {
                po: report.po_id.to_string(),
                result: result.to_string(),
                lines,
                reopened: report.reopened.len(),
                closed: format!("{}/{}", report.lines_closed(), report.closes.len()),
            }
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let failed = summary.failed();
    let headline = format!(
        "{} PO(s): {} updated, {} not updated, {} line(s) closed",
        summary.po_count(),
        summary.updated(),
        failed,
        summary.lines_closed()
    );
    if failed > 0 || summary.close_failures() > 0 {
        println!("{}", headline.yellow());
    } else {
        println!("{}", headline.green());
    }
    println!("Audit log: {}", config.log_file.display());
}
