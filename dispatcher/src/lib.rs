//! # dispatcher
//!
//! Drives a [`vkbot_vk::LongPollClient`] and runs every update through the middleware chain and
//! the registered routers, one event at a time in feed order.
//!
//! - [`Dispatcher`] – builder, `process_update`, `start_polling`
//! - [`PollingOptions`] – poll wait, transport backoff, signal handling
//! - [`Lifecycle`] / [`StopHandle`] – observable run state and cooperative stop

mod dispatcher;
mod lifecycle;
mod options;
mod signal;

pub use dispatcher::Dispatcher;
pub use lifecycle::{Lifecycle, StopHandle};
pub use options::PollingOptions;
