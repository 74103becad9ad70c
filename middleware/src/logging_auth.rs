//! Stock middleware: logging, peer allowlist, and sender tracking.

use async_trait::async_trait;
use tracing::{debug, error, info, instrument};
use vkbot_core::{Event, HandlerError, RequestContext, Result};

use crate::middleware::Middleware;

/// Logs each event in before() and the final context size in after(); always continues.
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    #[instrument(skip(self, event, _context))]
    async fn before(&self, event: &Event, _context: &mut RequestContext) -> Result<bool> {
        info!(
            kind = %event.kind(),
            event_id = %event.event_id(),
            peer_id = ?event.conversation_id(),
            text = %event.text().unwrap_or(""),
            "Received event"
        );
        Ok(true)
    }

    #[instrument(skip(self, event, context))]
    async fn after(&self, event: &Event, context: &mut RequestContext) -> Result<()> {
        debug!(
            event_id = %event.event_id(),
            context_keys = context.len(),
            "Processed event"
        );
        Ok(())
    }
}

/// Rejects events whose conversation id is not in the allowlist with [`HandlerError::Unauthorized`].
/// Events without a conversation id pass.
pub struct AuthMiddleware {
    allowed_peers: Vec<i64>,
}

impl AuthMiddleware {
    pub fn new(allowed_peers: Vec<i64>) -> Self {
        Self { allowed_peers }
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    #[instrument(skip(self, event, _context))]
    async fn before(&self, event: &Event, _context: &mut RequestContext) -> Result<bool> {
        let Some(peer_id) = event.conversation_id() else {
            return Ok(true);
        };
        if self.allowed_peers.contains(&peer_id) {
            debug!(peer_id, "Peer authorized");
            Ok(true)
        } else {
            error!(peer_id, "Unauthorized access attempt");
            Err(HandlerError::Unauthorized.into())
        }
    }
}

/// Puts the message sender into the context as `user_id` so handlers can declare it as a parameter.
pub struct UserTrackingMiddleware;

impl UserTrackingMiddleware {
    pub const USER_ID_KEY: &'static str = "user_id";
}

#[async_trait]
impl Middleware for UserTrackingMiddleware {
    async fn before(&self, event: &Event, context: &mut RequestContext) -> Result<bool> {
        if let Some(user_id) = event.from_id() {
            context.insert(Self::USER_ID_KEY, user_id);
            debug!(user_id, "Processing message from user");
        }
        Ok(true)
    }

    async fn after(&self, _event: &Event, context: &mut RequestContext) -> Result<()> {
        debug!(user_id = ?context.get(Self::USER_ID_KEY), "Finished processing update for user");
        Ok(())
    }
}
