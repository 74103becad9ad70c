//! Router: an ordered list of handler entries; the first entry that fully matches an event handles it.

use async_trait::async_trait;
use fsm::{FsmContext, IntoState};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use vkbot_core::{Event, RequestContext, Result, MESSAGE_NEW};

use crate::filter::Filter;

/// Context values a handler declared at registration time, keyed by name.
pub type Params = HashMap<String, Value>;

/// Callback invoked for a matched event.
///
/// `fsm` is `None` for events that carry no conversation id. `params` holds the declared keys
/// that were present in the request context.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(
        &self,
        event: &Event,
        context: &mut RequestContext,
        fsm: Option<&FsmContext>,
        params: Params,
    ) -> Result<()>;
}

/// A routing rule: event kind + filters + optional required state + declared params → handler.
#[derive(Clone)]
pub struct HandlerEntry {
    event_kind: String,
    filters: Vec<Arc<dyn Filter>>,
    required_state: Option<String>,
    params: Vec<String>,
    handler: Arc<dyn Handler>,
}

impl HandlerEntry {
    pub fn new(event_kind: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        Self {
            event_kind: event_kind.into(),
            filters: Vec::new(),
            required_state: None,
            params: Vec::new(),
            handler,
        }
    }

    /// Entry for `message_new` events.
    pub fn message(handler: Arc<dyn Handler>) -> Self {
        Self::new(MESSAGE_NEW, handler)
    }

    /// Appends a filter; all filters must pass, checked in order.
    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Requires the live conversation state (re-read from the store) to equal `state`.
    pub fn state(mut self, state: impl IntoState) -> Self {
        self.required_state = state.into_state();
        self
    }

    /// Declares request-context keys passed to the handler in `params`.
    pub fn inject<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn event_kind(&self) -> &str {
        &self.event_kind
    }

    pub fn required_state(&self) -> Option<&str> {
        self.required_state.as_deref()
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    async fn matches(
        &self,
        event: &Event,
        context: &RequestContext,
        fsm: Option<&FsmContext>,
    ) -> Result<bool> {
        if self.event_kind != event.kind() {
            return Ok(false);
        }

        for filter in &self.filters {
            if !filter.check(event, context).await? {
                return Ok(false);
            }
        }

        if let Some(required) = &self.required_state {
            let current = match fsm {
                Some(fsm) => fsm.get_state().await?,
                None => None,
            };
            if current.as_deref() != Some(required.as_str()) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn collect_params(&self, context: &RequestContext) -> Params {
        self.params
            .iter()
            .filter_map(|key| context.get(key).map(|value| (key.clone(), value.clone())))
            .collect()
    }
}

/// Ordered handler entries. Registration order is precedence order.
#[derive(Clone)]
pub struct Router {
    name: String,
    entries: Vec<HandlerEntry>,
}

impl Router {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends an entry.
    pub fn register(mut self, entry: HandlerEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs the first fully matching entry's handler. Returns whether a handler ran.
    #[instrument(skip(self, event, context, fsm), fields(router = %self.name, kind = %event.kind()))]
    pub async fn process_event(
        &self,
        event: &Event,
        context: &mut RequestContext,
        fsm: Option<&FsmContext>,
    ) -> Result<bool> {
        for (index, entry) in self.entries.iter().enumerate() {
            if !entry.matches(event, context, fsm).await? {
                continue;
            }

            let params = entry.collect_params(context);
            let handler_name = std::any::type_name_of_val(entry.handler.as_ref());
            info!(
                router = %self.name,
                entry = index,
                handler = %handler_name,
                params = params.len(),
                "step: handler matched"
            );
            entry.handler.handle(event, context, fsm, params).await?;
            debug!(router = %self.name, entry = index, "step: handler done");
            return Ok(true);
        }

        debug!(router = %self.name, "No handler matched");
        Ok(false)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new("Router")
    }
}
