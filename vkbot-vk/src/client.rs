//! VK API client: generic method calls, `groups.getLongPollServer`, `messages.send`, and the
//! Bots Long Poll fetch. Implements [`LongPollApi`] for the dispatcher.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use vkbot_core::{BotError, Result};

use crate::config::{VkConfig, DEFAULT_API_URL, DEFAULT_API_VERSION};
use crate::longpoll::{LongPollApi, PollCursor};

/// Extra time on top of the long-poll wait before the HTTP request is considered timed out.
const POLL_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

fn transport(e: reqwest::Error) -> BotError {
    BotError::Transport(e.to_string())
}

/// Raw API envelope: `{response: ...}` on success, `{error: {error_code, error_msg}}` on failure.
#[derive(Debug, Clone, PartialEq)]
pub struct VkResponse {
    raw: Value,
}

impl VkResponse {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn ok(&self) -> bool {
        self.raw.get("error").is_none()
    }

    pub fn response(&self) -> Option<&Value> {
        self.raw.get("response")
    }

    pub fn error(&self) -> Option<&Value> {
        self.raw.get("error")
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Unwraps `response`, mapping an `error` envelope to [`BotError::Api`].
    pub fn into_result(self) -> Result<Value> {
        if let Some(error) = self.error() {
            return Err(BotError::Api {
                code: error.get("error_code").and_then(Value::as_i64).unwrap_or(0),
                message: error
                    .get("error_msg")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }
        let mut raw = self.raw;
        match raw.get_mut("response") {
            Some(response) => Ok(response.take()),
            None => Err(BotError::Api {
                code: 0,
                message: "response envelope has neither response nor error".to_string(),
            }),
        }
    }
}

#[derive(Clone)]
pub struct VkClient {
    http: reqwest::Client,
    access_token: String,
    group_id: i64,
    api_url: String,
    api_version: String,
}

impl VkClient {
    pub fn new(access_token: String, group_id: i64) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token,
            group_id,
            api_url: DEFAULT_API_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    pub fn from_config(config: &VkConfig) -> Self {
        Self::new(config.access_token.clone(), config.group_id)
            .with_api_url(config.api_url.clone())
            .with_api_version(config.api_version.clone())
    }

    /// Overrides the method endpoint (e.g. a proxy or a test server). Method names are appended.
    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }

    pub fn with_api_version(mut self, api_version: String) -> Self {
        self.api_version = api_version;
        self
    }

    pub fn group_id(&self) -> i64 {
        self.group_id
    }

    /// Calls an API method with form parameters; token and version are added.
    #[instrument(skip(self, params))]
    pub async fn call_method(&self, method: &str, params: &[(&str, String)]) -> Result<VkResponse> {
        let mut form: Vec<(&str, String)> = params.to_vec();
        form.push(("access_token", self.access_token.clone()));
        form.push(("v", self.api_version.clone()));

        let url = format!("{}{}", self.api_url, method);
        let raw: Value = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(transport)?
            .json()
            .await
            .map_err(transport)?;
        debug!(method, ok = raw.get("error").is_none(), "VK method called");
        Ok(VkResponse::new(raw))
    }

    pub async fn get_long_poll_server(&self) -> Result<PollCursor> {
        let response = self
            .call_method(
                "groups.getLongPollServer",
                &[("group_id", self.group_id.to_string())],
            )
            .await?
            .into_result()?;
        Ok(serde_json::from_value(normalize_ts(response))?)
    }

    /// Sends a text message to `peer_id`; returns the new message id.
    pub async fn send_message(&self, peer_id: i64, text: &str) -> Result<i64> {
        let response = self
            .call_method(
                "messages.send",
                &[
                    ("peer_id", peer_id.to_string()),
                    ("message", text.to_string()),
                    ("random_id", "0".to_string()),
                ],
            )
            .await?
            .into_result()?;
        Ok(response.as_i64().unwrap_or_default())
    }
}

/// `ts` may arrive as a number; [`PollCursor`] keeps it as a string.
fn normalize_ts(mut response: Value) -> Value {
    if let Some(Value::Number(n)) = response.get("ts") {
        let ts = n.to_string();
        response["ts"] = Value::String(ts);
    }
    response
}

#[async_trait]
impl LongPollApi for VkClient {
    async fn acquire_poll_target(&self) -> Result<PollCursor> {
        self.get_long_poll_server().await
    }

    async fn poll(&self, cursor: &PollCursor, wait: Duration) -> Result<Value> {
        let wait_secs = wait.as_secs().max(1).to_string();
        self.http
            .get(&cursor.server)
            .query(&[
                ("act", "a_check"),
                ("key", cursor.key.as_str()),
                ("ts", cursor.ts.as_str()),
                ("wait", wait_secs.as_str()),
            ])
            .timeout(wait + POLL_TIMEOUT_MARGIN)
            .send()
            .await
            .map_err(transport)?
            .json()
            .await
            .map_err(transport)
    }
}
