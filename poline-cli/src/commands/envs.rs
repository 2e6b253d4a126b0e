//! `poline envs`: list the named environments.

use anyhow::Result;
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use poline_core::Environment;

/// Arguments for `poline envs`.
#[derive(Args, Debug)]
pub struct EnvsArgs {}

#[derive(Tabled)]
struct EnvRow {
    #[tabled(rename = "environment")]
    name: String,
    #[tabled(rename = "base url")]
    base_url: &'static str,
}

impl EnvsArgs {
    pub fn run(self) -> Result<()> {
        let rows: Vec<EnvRow> = Environment::all()
            .iter()
            .map(|env| EnvRow {
                name: env.to_string(),
                base_url: env.base_url(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
