//! # middleware
//!
//! [`Middleware`] hooks and the [`MiddlewareManager`] chain the dispatcher runs around routing,
//! plus stock logging, allowlist and user-tracking middleware.

mod logging_auth;
mod middleware;

#[cfg(test)]
mod test;

pub use logging_auth::{AuthMiddleware, LoggingMiddleware, UserTrackingMiddleware};
pub use middleware::{Middleware, MiddlewareManager};
