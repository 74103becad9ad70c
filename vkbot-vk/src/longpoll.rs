//! Long-poll cursor state machine.
//!
//! [`LongPollClient`] owns the `{server, key, ts}` cursor and turns raw feed responses into
//! batches, handling the in-protocol failure codes itself:
//!
//! | response              | action                                          |
//! |-----------------------|-------------------------------------------------|
//! | `{updates, ts}`       | advance ts, return batch                        |
//! | `{failed: 1, ts?}`    | advance ts if given, empty batch                |
//! | `{failed: 2}`         | new key (ts kept), poll once more               |
//! | `{failed: 3}`         | new key and ts, poll once more                  |
//! | anything else         | empty batch, cursor untouched                   |
//!
//! Transport failures are returned as errors; delaying the retry is the caller's job.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use vkbot_core::Result;

/// Feed-provided long-poll handle. Opaque to everything but [`LongPollClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollCursor {
    pub server: String,
    pub key: String,
    pub ts: String,
}

/// The two calls the dispatch core needs from the remote feed.
#[async_trait]
pub trait LongPollApi: Send + Sync {
    /// Requests a fresh `{server, key, ts}` triple.
    async fn acquire_poll_target(&self) -> Result<PollCursor>;

    /// Long-polls `cursor` for at most `wait`, returning the raw JSON body.
    async fn poll(&self, cursor: &PollCursor, wait: Duration) -> Result<Value>;
}

/// Classified long-poll response.
#[derive(Debug, Clone, PartialEq)]
pub enum PollResponse {
    Updates { updates: Vec<Value>, ts: String },
    /// `failed: 1`: some events were lost; continue from the given ts.
    HistoryOutdated { ts: Option<String> },
    /// `failed: 2`: the key expired.
    KeyExpired,
    /// `failed: 3`: key and ts are both invalid.
    InfoLost,
    Unknown(Value),
}

/// VK sends `ts` as a string, older servers as a number.
fn ts_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl PollResponse {
    pub fn classify(body: Value) -> Self {
        if let Some(failed) = body.get("failed") {
            return match failed.as_i64() {
                Some(1) => PollResponse::HistoryOutdated {
                    ts: body.get("ts").and_then(ts_string),
                },
                Some(2) => PollResponse::KeyExpired,
                Some(3) => PollResponse::InfoLost,
                _ => PollResponse::Unknown(body),
            };
        }

        let ts = body.get("ts").and_then(ts_string);
        match (body.get("updates").and_then(Value::as_array), ts) {
            (Some(updates), Some(ts)) => PollResponse::Updates {
                updates: updates.clone(),
                ts,
            },
            _ => PollResponse::Unknown(body),
        }
    }
}

enum Step {
    Batch(Vec<Value>),
    Reacquire { keep_ts: bool },
}

pub struct LongPollClient {
    api: Arc<dyn LongPollApi>,
    cursor: Option<PollCursor>,
}

impl LongPollClient {
    pub fn new(api: Arc<dyn LongPollApi>) -> Self {
        Self { api, cursor: None }
    }

    pub fn cursor(&self) -> Option<&PollCursor> {
        self.cursor.as_ref()
    }

    /// Replaces the cursor with a fresh triple from the feed.
    pub async fn acquire(&mut self) -> Result<()> {
        let cursor = self.api.acquire_poll_target().await?;
        info!(server = %cursor.server, ts = %cursor.ts, "Acquired long-poll server");
        self.cursor = Some(cursor);
        Ok(())
    }

    /// Forgets the cursor; the next [`poll`](Self::poll) acquires a new one.
    pub fn reset(&mut self) {
        self.cursor = None;
    }

    /// Fetches one batch. Acquires first when there is no cursor yet.
    pub async fn poll(&mut self, wait: Duration) -> Result<Vec<Value>> {
        if self.cursor.is_none() {
            self.acquire().await?;
        }

        match self.fetch(wait).await? {
            Step::Batch(batch) => Ok(batch),
            Step::Reacquire { keep_ts } => {
                self.reacquire(keep_ts).await?;
                match self.fetch(wait).await? {
                    Step::Batch(batch) => Ok(batch),
                    Step::Reacquire { .. } => {
                        warn!("Long-poll cursor rejected right after re-acquire; will re-acquire on next poll");
                        self.cursor = None;
                        Ok(Vec::new())
                    }
                }
            }
        }
    }

    async fn reacquire(&mut self, keep_ts: bool) -> Result<()> {
        let old_ts = self.cursor.as_ref().map(|c| c.ts.clone());
        self.acquire().await?;
        if keep_ts {
            if let (Some(cursor), Some(ts)) = (self.cursor.as_mut(), old_ts) {
                cursor.ts = ts;
            }
        }
        Ok(())
    }

    async fn fetch(&mut self, wait: Duration) -> Result<Step> {
        let Some(cursor) = self.cursor.as_ref() else {
            return Ok(Step::Reacquire { keep_ts: false });
        };
        let body = self.api.poll(cursor, wait).await?;

        let step = match PollResponse::classify(body) {
            PollResponse::Updates { updates, ts } => {
                debug!(count = updates.len(), ts = %ts, "Long-poll batch received");
                self.set_ts(ts);
                Step::Batch(updates)
            }
            PollResponse::HistoryOutdated { ts } => {
                warn!(ts = ?ts, "Long-poll history outdated (failed=1)");
                if let Some(ts) = ts {
                    self.set_ts(ts);
                }
                Step::Batch(Vec::new())
            }
            PollResponse::KeyExpired => {
                info!("Long-poll key expired (failed=2)");
                Step::Reacquire { keep_ts: true }
            }
            PollResponse::InfoLost => {
                info!("Long-poll information lost (failed=3)");
                Step::Reacquire { keep_ts: false }
            }
            PollResponse::Unknown(body) => {
                warn!(body = %body, "Unrecognized long-poll response, ignoring");
                Step::Batch(Vec::new())
            }
        };
        Ok(step)
    }

    fn set_ts(&mut self, ts: String) {
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.ts = ts;
        }
    }
}
