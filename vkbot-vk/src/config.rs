//! Minimal VK bot config: token, community id, API endpoint, polling timings, log path.
//! Loaded from VK_TOKEN, VK_GROUP_ID, VK_API_URL, VK_API_VERSION, VK_POLL_WAIT_SECS,
//! VK_RETRY_DELAY_SECS and LOG_FILE.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.vk.com/method/";
pub const DEFAULT_API_VERSION: &str = "5.131";
pub const DEFAULT_POLL_WAIT_SECS: u64 = 25;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;
pub const DEFAULT_LOG_FILE: &str = "logs/vkbot.log";

/// Longest wait the Bots Long Poll server accepts.
const MAX_POLL_WAIT_SECS: u64 = 90;

#[derive(Debug, Clone)]
pub struct VkConfig {
    /// VK_TOKEN (community access token)
    pub access_token: String,
    /// VK_GROUP_ID
    pub group_id: i64,
    /// VK_API_URL; method name is appended, so keep the trailing slash
    pub api_url: String,
    /// VK_API_VERSION
    pub api_version: String,
    /// VK_POLL_WAIT_SECS: long-poll wait passed to the server
    pub poll_wait_secs: u64,
    /// VK_RETRY_DELAY_SECS: backoff after a transport failure
    pub retry_delay_secs: u64,
    /// LOG_FILE
    pub log_file: String,
}

impl VkConfig {
    /// Loads from environment variables. `token` overrides VK_TOKEN when provided.
    pub fn from_env(token: Option<String>) -> Result<Self> {
        let access_token = match token {
            Some(token) => token,
            None => env::var("VK_TOKEN").map_err(|_| anyhow::anyhow!("VK_TOKEN not set"))?,
        };
        let group_id = env::var("VK_GROUP_ID")
            .map_err(|_| anyhow::anyhow!("VK_GROUP_ID not set"))?
            .parse::<i64>()
            .context("VK_GROUP_ID must be an integer")?;
        let api_url = env::var("VK_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_version =
            env::var("VK_API_VERSION").unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());
        let poll_wait_secs = env::var("VK_POLL_WAIT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_POLL_WAIT_SECS);
        let retry_delay_secs = env::var("VK_RETRY_DELAY_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RETRY_DELAY_SECS);
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());

        Ok(Self {
            access_token,
            group_id,
            api_url,
            api_version,
            poll_wait_secs,
            retry_delay_secs,
            log_file,
        })
    }

    /// Builds a config with the given credentials and defaults for everything else.
    pub fn with_token(access_token: String, group_id: i64) -> Self {
        Self {
            access_token,
            group_id,
            api_url: DEFAULT_API_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            poll_wait_secs: DEFAULT_POLL_WAIT_SECS,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            log_file: DEFAULT_LOG_FILE.to_string(),
        }
    }

    /// Checks the API URL parses and the poll wait is within what the server accepts.
    pub fn validate(&self) -> Result<()> {
        if self.access_token.is_empty() {
            anyhow::bail!("VK_TOKEN is empty");
        }
        if reqwest::Url::parse(&self.api_url).is_err() {
            anyhow::bail!("VK_API_URL is not a valid URL: {}", self.api_url);
        }
        if self.poll_wait_secs == 0 || self.poll_wait_secs > MAX_POLL_WAIT_SECS {
            anyhow::bail!(
                "VK_POLL_WAIT_SECS must be between 1 and {}, got {}",
                MAX_POLL_WAIT_SECS,
                self.poll_wait_secs
            );
        }
        Ok(())
    }

    pub fn poll_wait(&self) -> Duration {
        Duration::from_secs(self.poll_wait_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}
