use std::time::Duration;
use vkbot_vk::VkConfig;

/// Settings for one [`crate::Dispatcher::start_polling`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingOptions {
    /// Long-poll wait sent to the feed.
    pub poll_timeout: Duration,
    /// Delay before polling again after a transport failure.
    pub retry_delay: Duration,
    /// Stop on SIGINT / SIGTERM.
    pub handle_signals: bool,
}

impl PollingOptions {
    pub fn from_config(config: &VkConfig) -> Self {
        Self {
            poll_timeout: config.poll_wait(),
            retry_delay: config.retry_delay(),
            handle_signals: true,
        }
    }

    pub fn handle_signals(mut self, handle_signals: bool) -> Self {
        self.handle_signals = handle_signals;
        self
    }
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(25),
            retry_delay: Duration::from_secs(5),
            handle_signals: true,
        }
    }
}
