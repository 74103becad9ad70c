//! vkbot CLI: run the profile bot over VK Bots Long Poll. Config from env and optional CLI args.

use anyhow::Result;
use clap::Parser;
use vkbot_cli::{load_config, run_bot, Cli, Commands, RunOptions};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            token,
            database,
            allowed_peers,
        } => {
            let config = load_config(token)?;
            run_bot(
                config,
                RunOptions {
                    database,
                    allowed_peers,
                },
            )
            .await
        }
    }
}
