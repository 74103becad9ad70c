//! # router
//!
//! Filters and routers. A [`Router`] holds [`HandlerEntry`] rules in registration order; for each
//! event the first entry whose kind, filters and required state all match runs its [`Handler`].

mod filter;
mod router;

pub use filter::{Filter, StateFilter, TextFilter};
pub use router::{Handler, HandlerEntry, Params, Router};
