//! frbsync CLI — merge extracted FRB localizations into a catalog.
//!
//! Reads the extraction oracle's JSON output, checks every candidate against
//! the catalog, and either reports (dry run) or inserts (commit) new bursts.

mod commands;
mod report;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
