//! Core types: the incoming event, the per-event request context and the FSM data bag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Key identifying one independent conversation (VK `peer_id`).
pub type ConversationId = i64;

/// Arbitrary key/value data kept per conversation by the state store.
pub type StateData = Map<String, Value>;

/// Event kind of a new incoming message; the only kind that carries a conversation id.
pub const MESSAGE_NEW: &str = "message_new";

/// A single update received from the long-poll feed. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    kind: String,
    payload: Value,
    source_id: String,
    event_id: String,
    raw: Value,
    received_at: DateTime<Utc>,
}

impl Event {
    /// Builds an event from a raw feed object `{type, object, group_id, event_id, ...}`.
    /// Missing fields default to empty values; the whole object is kept in `raw`.
    pub fn from_raw(raw: Value) -> Self {
        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let payload = raw
            .get("object")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        let source_id = match raw.get("group_id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let event_id = raw
            .get("event_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            kind,
            payload,
            source_id,
            event_id,
            raw,
            received_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Community (group) id the event was delivered for.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// The untouched feed object, including fields this crate does not know about.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    fn message(&self) -> Option<&Value> {
        self.payload.get("message")
    }

    /// Conversation id for per-conversation events (`message_new` → `object.message.peer_id`).
    pub fn conversation_id(&self) -> Option<ConversationId> {
        if self.kind != MESSAGE_NEW {
            return None;
        }
        self.message()?.get("peer_id")?.as_i64()
    }

    /// Message text, when the payload carries one.
    pub fn text(&self) -> Option<&str> {
        self.message()?.get("text")?.as_str()
    }

    /// Sender id of a message event.
    pub fn from_id(&self) -> Option<i64> {
        self.message()?.get("from_id")?.as_i64()
    }
}

/// Per-event mutable context: seeded with `state` and `data` from the store, extended by middleware,
/// read by filters and handlers. Dropped once the after-hooks have run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    values: HashMap<String, Value>,
}

impl RequestContext {
    pub const STATE_KEY: &'static str = "state";
    pub const DATA_KEY: &'static str = "data";

    /// Creates a context seeded with the conversation's state and data as read at dispatch time.
    pub fn seeded(state: Option<String>, data: StateData) -> Self {
        let mut values = HashMap::new();
        values.insert(
            Self::STATE_KEY.to_string(),
            state.map(Value::String).unwrap_or(Value::Null),
        );
        values.insert(Self::DATA_KEY.to_string(), Value::Object(data));
        Self { values }
    }

    /// State snapshot taken at dispatch start. `None` when absent.
    pub fn state(&self) -> Option<&str> {
        self.values.get(Self::STATE_KEY).and_then(Value::as_str)
    }

    /// Data snapshot taken at dispatch start.
    pub fn data(&self) -> Option<&StateData> {
        self.values.get(Self::DATA_KEY).and_then(Value::as_object)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Copies shared values into the context. The reserved `state` / `data` seeds are never overwritten.
    pub fn merge_shared(&mut self, shared: &HashMap<String, Value>) {
        for (key, value) in shared {
            if Self::is_reserved(key) {
                continue;
            }
            self.values.insert(key.clone(), value.clone());
        }
    }

    pub fn is_reserved(key: &str) -> bool {
        key == Self::STATE_KEY || key == Self::DATA_KEY
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
