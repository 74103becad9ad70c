//! Middleware trait and the ordered chain that runs it around routing.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use vkbot_core::{Event, RequestContext, Result};

/// Hooks around the per-event pipeline. before runs in registration order and may stop the event
/// by returning false; after runs in reverse order once routing was attempted.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn before(&self, _event: &Event, _context: &mut RequestContext) -> Result<bool> {
        Ok(true)
    }

    async fn after(&self, _event: &Event, _context: &mut RequestContext) -> Result<()> {
        Ok(())
    }
}

/// Ordered middleware list plus a shared key/value context merged into every request context.
#[derive(Clone, Default)]
pub struct MiddlewareManager {
    middleware: Vec<Arc<dyn Middleware>>,
    context_data: HashMap<String, Value>,
}

impl MiddlewareManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware.
    pub fn setup(&mut self, middleware: Arc<dyn Middleware>) {
        self.middleware.push(middleware);
    }

    /// Sets a shared value visible to every subsequent event.
    pub fn update_context(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.context_data.insert(key.into(), value.into());
    }

    pub fn get_context_value(&self, key: &str) -> Option<&Value> {
        self.context_data.get(key)
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Merges the shared context, then runs before-hooks in order. Returns false as soon as one
    /// hook returns false; the remaining hooks do not run. Errors are returned unchanged.
    #[instrument(skip(self, event, context), fields(kind = %event.kind()))]
    pub async fn run_before(&self, event: &Event, context: &mut RequestContext) -> Result<bool> {
        context.merge_shared(&self.context_data);

        for mw in &self.middleware {
            let mw_name = std::any::type_name_of_val(mw.as_ref());
            debug!(middleware = %mw_name, "step: middleware before");
            if !mw.before(event, context).await? {
                info!(
                    middleware = %mw_name,
                    event_id = %event.event_id(),
                    "step: middleware before returned false, event dropped"
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Runs after-hooks in reverse registration order.
    #[instrument(skip(self, event, context), fields(kind = %event.kind()))]
    pub async fn run_after(&self, event: &Event, context: &mut RequestContext) -> Result<()> {
        for mw in self.middleware.iter().rev() {
            let mw_name = std::any::type_name_of_val(mw.as_ref());
            debug!(middleware = %mw_name, "step: middleware after");
            mw.after(event, context).await?;
        }
        Ok(())
    }
}
