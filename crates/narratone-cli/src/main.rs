//! CLI entry point — the composition root.
//!
//! This is the only place where the real adapters (HTTP synthesis, the
//! subprocess effects tool, the rodio output sink) are wired together.

mod cache_commands;
mod commands;
mod paths;
mod preview_command;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use commands::{CacheCommand, Cli, Commands};
use paths::CacheLayout;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let layout = CacheLayout::resolve(cli.cache_dir)?;

    match cli.command {
        Commands::Paths => {
            paths::print_paths(&layout);
        }
        Commands::Cache { command } => match command {
            CacheCommand::List => cache_commands::list(&layout).await?,
            CacheCommand::Path { key } => cache_commands::path(&layout, &key).await?,
            CacheCommand::Delete { key } => cache_commands::delete(&layout, &key).await?,
            CacheCommand::Clear => cache_commands::clear(&layout).await?,
            CacheCommand::Sweep => cache_commands::sweep(&layout).await?,
        },
        Commands::DeriveKey { text, voice, chain } => {
            preview_command::derive_key(&text, &voice, chain.as_deref())?;
        }
        Commands::Preview(args) => {
            preview_command::preview(layout, args).await?;
        }
    }

    Ok(())
}
