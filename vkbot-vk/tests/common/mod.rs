//! Scripted [`vkbot_vk::LongPollApi`] for integration tests.
//!
//! Each acquire hands out `key-N` / ts `N000`; each poll pops the next scripted response and
//! records the cursor it was called with. An empty script blocks like an idle long-poll.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use vkbot_core::Result;
use vkbot_vk::{LongPollApi, PollCursor};

pub const SERVER: &str = "https://lp.vk.test/wh1";

#[derive(Default)]
pub struct ScriptedFeed {
    responses: Mutex<VecDeque<Result<Value>>>,
    acquire_count: AtomicUsize,
    polled_with: Mutex<Vec<PollCursor>>,
}

impl ScriptedFeed {
    pub fn new(responses: Vec<Result<Value>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn acquire_count(&self) -> usize {
        self.acquire_count.load(Ordering::SeqCst)
    }

    /// Cursors passed to each poll call, in order.
    pub fn polled_with(&self) -> Vec<PollCursor> {
        self.polled_with.lock().unwrap().clone()
    }
}

#[async_trait]
impl LongPollApi for ScriptedFeed {
    async fn acquire_poll_target(&self) -> Result<PollCursor> {
        let n = self.acquire_count.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PollCursor {
            server: SERVER.to_string(),
            key: format!("key-{}", n),
            ts: format!("{}000", n),
        })
    }

    async fn poll(&self, cursor: &PollCursor, _wait: Duration) -> Result<Value> {
        self.polled_with.lock().unwrap().push(cursor.clone());
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(response) => response,
            None => std::future::pending().await,
        }
    }
}
