//! Test doubles for dispatcher integration tests.
//!
//! - [`ScriptedFeed`]: [`LongPollApi`] that replays scripted responses, then blocks like an idle
//!   long-poll; records acquires and poll instants.
//! - [`Recorder`]: handler / middleware that appends labels to a shared log.
//! - helpers for building raw `message_new` updates.

#![allow(dead_code)]

use async_trait::async_trait;
use fsm::FsmContext;
use middleware::Middleware;
use router::{Handler, Params};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use vkbot_core::{BotError, Event, HandlerError, RequestContext, Result};
use vkbot_vk::{LongPollApi, PollCursor};

#[derive(Default)]
pub struct ScriptedFeed {
    responses: Mutex<VecDeque<Result<Value>>>,
    acquire_count: AtomicUsize,
    poll_times: Mutex<Vec<Instant>>,
}

impl ScriptedFeed {
    pub fn new(responses: Vec<Result<Value>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        })
    }

    pub fn push(&self, response: Result<Value>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn acquire_count(&self) -> usize {
        self.acquire_count.load(Ordering::SeqCst)
    }

    pub fn poll_count(&self) -> usize {
        self.poll_times.lock().unwrap().len()
    }

    pub fn poll_times(&self) -> Vec<Instant> {
        self.poll_times.lock().unwrap().clone()
    }
}

#[async_trait]
impl LongPollApi for ScriptedFeed {
    async fn acquire_poll_target(&self) -> Result<PollCursor> {
        let n = self.acquire_count.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PollCursor {
            server: "https://lp.vk.test/wh1".to_string(),
            key: format!("key-{}", n),
            ts: format!("{}000", n),
        })
    }

    async fn poll(&self, _cursor: &PollCursor, _wait: Duration) -> Result<Value> {
        self.poll_times.lock().unwrap().push(Instant::now());
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(response) => response,
            None => std::future::pending().await,
        }
    }
}

/// `{ts, updates}` batch.
pub fn batch(ts: &str, updates: Vec<Value>) -> Result<Value> {
    Ok(json!({"ts": ts, "updates": updates}))
}

/// Raw `message_new` update.
pub fn message(peer_id: i64, text: &str) -> Value {
    json!({
        "type": "message_new",
        "object": {"message": {"peer_id": peer_id, "from_id": peer_id, "text": text}},
        "group_id": 1,
        "event_id": format!("ev-{}-{}", peer_id, text),
    })
}

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Handler / middleware that records `label` (or `label:before` / `label:after`).
pub struct Recorder {
    pub label: String,
    pub log: Log,
    pub allow: bool,
    pub fail: bool,
}

impl Recorder {
    pub fn new(label: &str, log: &Log) -> Self {
        Self {
            label: label.to_string(),
            log: log.clone(),
            allow: true,
            fail: false,
        }
    }

    pub fn blocking(mut self) -> Self {
        self.allow = false;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl Handler for Recorder {
    async fn handle(
        &self,
        event: &Event,
        _context: &mut RequestContext,
        _fsm: Option<&FsmContext>,
        _params: Params,
    ) -> Result<()> {
        self.log.lock().unwrap().push(format!(
            "{}:{}",
            self.label,
            event.text().unwrap_or_default()
        ));
        if self.fail {
            return Err(BotError::Handler(HandlerError::Other("boom".to_string())));
        }
        Ok(())
    }
}

#[async_trait]
impl Middleware for Recorder {
    async fn before(&self, _event: &Event, _context: &mut RequestContext) -> Result<bool> {
        self.log.lock().unwrap().push(format!("{}:before", self.label));
        Ok(self.allow)
    }

    async fn after(&self, _event: &Event, _context: &mut RequestContext) -> Result<()> {
        self.log.lock().unwrap().push(format!("{}:after", self.label));
        Ok(())
    }
}

/// Polls `condition` until it holds; panics after two seconds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
