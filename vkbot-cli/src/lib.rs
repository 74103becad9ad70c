//! # vkbot-cli
//!
//! Argument parsing, config loading, and the profile questionnaire bot the `run` command starts.

pub mod cli;
pub mod profile;
pub mod runner;

pub use cli::{load_config, Cli, Commands};
pub use profile::{profile_routers, profile_states, MessageSender};
pub use runner::{build_dispatcher, run_bot, RunOptions};
pub use vkbot_vk::VkConfig;
