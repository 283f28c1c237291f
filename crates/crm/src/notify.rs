//! Messaging channel used to announce new orders.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::client::endpoint;
use crate::error::NotifyError;

/// Posts pre-formatted messages to a channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post_message(&self, text: &str) -> Result<(), NotifyError>;
}

/// Notifier that discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn post_message(&self, _text: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Notifier posting to a Slack channel through `chat.postMessage`.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    http: reqwest::Client,
    api_url: Url,
    bot_token: String,
    channel_id: String,
}

impl SlackNotifier {
    /// Creates a notifier for the Web API rooted at `api_base`.
    pub fn new(
        api_base: &Url,
        bot_token: impl Into<String>,
        channel_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let api_url = endpoint(api_base, &["chat.postMessage"])
            .ok_or_else(|| NotifyError::Rejected(format!("invalid api url: {api_base}")))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            api_url,
            bot_token: bot_token.into(),
            channel_id: channel_id.into(),
        })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn post_message(&self, text: &str) -> Result<(), NotifyError> {
        let response: PostMessageResponse = self
            .http
            .post(self.api_url.clone())
            .bearer_auth(&self.bot_token)
            .json(&json!({ "channel": self.channel_id, "text": text }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Slack reports most failures with a 200 and `ok: false`
        if !response.ok {
            return Err(NotifyError::Rejected(
                response.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    messages: Vec<String>,
    fail_on_post: bool,
}

/// In-memory notifier for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures posts to fail.
    pub fn set_fail_on_post(&self, fail: bool) {
        self.state.write().unwrap().fail_on_post = fail;
    }

    /// Returns all successfully posted messages.
    pub fn messages(&self) -> Vec<String> {
        self.state.read().unwrap().messages.clone()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn post_message(&self, text: &str) -> Result<(), NotifyError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_post {
            return Err(NotifyError::Rejected("channel_not_found".to_string()));
        }
        state.messages.push(text.to_string());
        Ok(())
    }
}
