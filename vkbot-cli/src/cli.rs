//! CLI parser and config loading.

use anyhow::Result;
use clap::{Parser, Subcommand};
use vkbot_vk::VkConfig;

#[derive(Parser)]
#[command(name = "vkbot")]
#[command(about = "VK community bot CLI", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the profile bot (config from env; token can override VK_TOKEN).
    Run {
        #[arg(short, long)]
        token: Option<String>,
        /// Keep conversation state in this SQLite file instead of memory.
        #[arg(long)]
        database: Option<String>,
        /// Only answer these peer ids (repeatable). Everyone is answered when omitted.
        #[arg(long = "allow")]
        allowed_peers: Vec<i64>,
    },
}

/// Load VkConfig from environment. If `token` is provided it overrides VK_TOKEN.
pub fn load_config(token: Option<String>) -> Result<VkConfig> {
    let config = VkConfig::from_env(token)?;
    config.validate()?;
    Ok(config)
}
