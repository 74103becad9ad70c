//! The dispatcher: polling loop and per-event pipeline.
//!
//! For every raw update: build an [`Event`], seed a fresh [`RequestContext`] from the store, run
//! middleware before-hooks, offer the event to each router in order until one handles it, then
//! run after-hooks in reverse. A failing event is logged and skipped; the loop keeps going.

use fsm::{FsmContext, MemoryStorage, Storage};
use middleware::{Middleware, MiddlewareManager};
use router::Router;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use vkbot_core::{Event, RequestContext, Result, StateData};
use vkbot_vk::{LongPollApi, LongPollClient};

use crate::lifecycle::{Control, Lifecycle, StopHandle};
use crate::options::PollingOptions;
use crate::signal;

pub struct Dispatcher {
    poller: Mutex<LongPollClient>,
    storage: Arc<dyn Storage>,
    routers: Vec<Router>,
    middleware: MiddlewareManager,
    control: Arc<Control>,
}

impl Dispatcher {
    /// Dispatcher over `api` with an in-memory state store, no routers and no middleware.
    pub fn new(api: Arc<dyn LongPollApi>) -> Self {
        Self {
            poller: Mutex::new(LongPollClient::new(api)),
            storage: Arc::new(MemoryStorage::new()),
            routers: Vec::new(),
            middleware: MiddlewareManager::new(),
            control: Control::new(),
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    /// Appends a router; routers are consulted in the order they were included.
    pub fn include_router(mut self, router: Router) -> Self {
        self.routers.push(router);
        self
    }

    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.setup(middleware);
        self
    }

    /// Value merged into every request context (never over `state` / `data`).
    pub fn with_shared_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.middleware.update_context(key, value);
        self
    }

    pub fn storage(&self) -> Arc<dyn Storage> {
        self.storage.clone()
    }

    pub fn routers(&self) -> &[Router] {
        &self.routers
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.control.lifecycle()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(self.control.clone())
    }

    /// Requests a stop of the running loop. Idempotent; no-op when idle.
    pub fn request_stop(&self) {
        self.control.request_stop();
    }

    /// Runs one raw update through the pipeline. Returns whether a handler fired.
    ///
    /// Returns `Ok(false)` without touching routers or after-hooks when a before-hook aborts.
    /// Errors from hooks, filters, handlers or the store are returned as-is.
    #[instrument(skip(self, raw))]
    pub async fn process_update(&self, raw: Value) -> Result<bool> {
        let event = Event::from_raw(raw);
        let conversation_id = event.conversation_id();
        info!(
            kind = %event.kind(),
            event_id = %event.event_id(),
            peer_id = ?conversation_id,
            "step: process_update started"
        );

        let fsm = conversation_id.map(|id| FsmContext::new(self.storage.clone(), id));
        let (state, data) = match &fsm {
            Some(fsm) => (fsm.get_state().await?, fsm.get_data().await?),
            None => (None, StateData::new()),
        };
        let mut context = RequestContext::seeded(state, data);

        if !self.middleware.run_before(&event, &mut context).await? {
            return Ok(false);
        }

        let mut handled = false;
        for router in &self.routers {
            if router.process_event(&event, &mut context, fsm.as_ref()).await? {
                handled = true;
                break;
            }
        }
        if !handled {
            debug!(kind = %event.kind(), "No router handled the event");
        }

        self.middleware.run_after(&event, &mut context).await?;

        info!(
            event_id = %event.event_id(),
            handled,
            "step: process_update finished"
        );
        Ok(handled)
    }

    /// Polls until stopped, dispatching each batch in order.
    ///
    /// Fails fast with [`vkbot_core::BotError::AlreadyRunning`] when a run is active, and with
    /// the acquire error when the feed rejects the initial acquisition outright. Transport
    /// failures are retried after `retry_delay`. Returns `Ok(())` once a stop was requested.
    pub async fn start_polling(&self, options: PollingOptions) -> Result<()> {
        let token = self.control.begin()?;
        info!(
            routers = self.routers.len(),
            middleware = self.middleware.len(),
            poll_timeout = ?options.poll_timeout,
            "Dispatcher starting"
        );

        let listener = options
            .handle_signals
            .then(|| signal::spawn_listener(self.control.clone()));

        let mut poller = self.poller.lock().await;
        let result = self.run(&mut poller, &token, &options).await;

        if let Some(listener) = listener {
            listener.abort();
        }
        poller.reset();
        drop(poller);
        self.control.finish();

        match &result {
            Ok(()) => info!("Dispatcher stopped"),
            Err(e) => error!(error = %e, "Dispatcher stopped with error"),
        }
        result
    }

    async fn run(
        &self,
        poller: &mut LongPollClient,
        token: &CancellationToken,
        options: &PollingOptions,
    ) -> Result<()> {
        let acquired = tokio::select! {
            _ = token.cancelled() => return Ok(()),
            acquired = poller.acquire() => acquired,
        };
        match acquired {
            Ok(()) => {}
            Err(e) if e.is_transport() => {
                warn!(error = %e, "Initial long-poll acquire failed, will retry while polling");
            }
            Err(e) => return Err(e),
        }

        self.control.mark_running();
        info!("Dispatcher running");

        loop {
            let polled = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                polled = poller.poll(options.poll_timeout) => polled,
            };

            match polled {
                Ok(updates) => {
                    if !updates.is_empty() {
                        debug!(count = updates.len(), "step: dispatching batch");
                    }
                    for raw in updates {
                        self.dispatch(raw).await;
                    }
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        retry_in = ?options.retry_delay,
                        "Long-poll request failed, backing off"
                    );
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(options.retry_delay) => {}
                    }
                }
            }
        }
        Ok(())
    }

    async fn dispatch(&self, raw: Value) {
        let event_id = raw
            .get("event_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if let Err(e) = self.process_update(raw).await {
            error!(event_id = %event_id, error = %e, "Event processing failed, skipping");
        }
    }
}
