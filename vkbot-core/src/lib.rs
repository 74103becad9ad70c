//! # vkbot-core
//!
//! Core types shared by every vkbot crate: [`Event`], [`RequestContext`], the [`BotError`] taxonomy
//! and tracing initialization. Transport-agnostic; used by fsm, router, middleware and dispatcher.

pub mod error;
pub mod logger;
pub mod types;

pub use error::{BotError, HandlerError, Result};
pub use logger::init_tracing;
pub use types::{ConversationId, Event, RequestContext, StateData, MESSAGE_NEW};
