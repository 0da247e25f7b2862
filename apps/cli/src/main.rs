//! PaperAtlas CLI — incremental LLM enrichment for conference paper sets.
//!
//! Reads a scraped paper export, enriches papers and key authors through
//! an annotation service, and checkpoints every result so interrupted
//! runs resume where they left off.

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
