//! poline: PO line accounting reconciliation CLI.
//!
//! # Usage
//!
//! ```text
//! poline run --env test --input lines.xlsx --sheet Sheet1 [--api-key KEY]
//! poline run --config poline.yaml [--partial-batch skip|submit-resolved]
//! poline check --input lines.csv [--json]
//! poline envs
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, envs::EnvsArgs, run::RunArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "poline",
    version,
    about = "Update PO line accounting data through the procurement API",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reopen, update and re-close the PO lines listed in an input file.
    Run(RunArgs),

    /// Parse and group an input file without contacting the API.
    Check(CheckArgs),

    /// List the named environments and their base URLs.
    Envs(EnvsArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Check(args) => args.run(),
        Commands::Envs(args) => args.run(),
    }
}
