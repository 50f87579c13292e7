//! lead-refresh CLI — one-shot CRM lead enrichment.
//!
//! Reads a list of company profile URLs, resolves each one against the
//! scrapers cache, and pushes the derived fields to the matching CRM lead.

mod commands;

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
