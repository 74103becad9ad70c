//! # vkbot-vk
//!
//! VK transport layer: [`VkClient`] (method calls, outbound messages, long-poll fetch),
//! the [`LongPollClient`] cursor state machine over the [`LongPollApi`] trait, and [`VkConfig`].
//! No routing or state logic lives here.

mod client;
mod config;
mod longpoll;

pub use client::{VkClient, VkResponse};
pub use config::VkConfig;
pub use longpoll::{LongPollApi, LongPollClient, PollCursor, PollResponse};
