mod cli;
mod commands;
mod completions;
mod config;
mod error;
mod output;
mod setup;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error::handle_error(err);
    }
}

async fn run() -> Result<()> {
    let mut cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        completions::generate_completions(shell);
        return Ok(());
    }

    let _guard = setup::init_logging(cli.verbose)?;
    let config = config::CliConfig::load();
    let storage = setup::open_storage()?;

    match cli.command.take() {
        Some(Commands::Project { command }) => {
            commands::project::run(&storage, command, cli.format)
        }
        Some(Commands::Chat(args)) => commands::chat::run(&storage, &config, &cli, &args).await,
        Some(Commands::Completions { .. }) => Ok(()),
        // Bare `horizon` opens the interactive chat on the latest project.
        None => commands::chat::run(&storage, &config, &cli, &cli::ChatArgs::default()).await,
    }
}
