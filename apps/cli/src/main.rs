//! pfsledger CLI: session log keeper for Pathfinder Society play.
//!
//! Loads the scenario catalog, imports sessions exported from RPG Chronicles,
//! and answers "who played what" questions from an interactive menu.

mod commands;
mod menu;
mod prompt;

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
