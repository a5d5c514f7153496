use crate::formatters::Embed;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const API_BASE: &str = "https://discord.com/api/v10";

// Discord JSON error codes that make retrying an edit pointless.
const CODE_UNKNOWN_MESSAGE: i64 = 10008;
const CODE_MISSING_PERMISSIONS: i64 = 50013;

/// Delivery failures, split so callers can tell terminal conditions
/// (target gone or inaccessible) from everything retryable.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("message not found")]
    NotFound,
    #[error("missing permissions")]
    Forbidden,
    #[error("discord api error: {status} {body}")]
    Api { status: StatusCode, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SinkError {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SinkError::NotFound | SinkError::Forbidden)
    }
}

/// Stable address of a published notification message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub channel_id: String,
    pub message_id: String,
}

/// A message read back from a channel while polling for commands.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelMessage {
    pub id: String,
    #[serde(default)]
    pub content: String,
    pub author: MessageAuthor,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageAuthor {
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Deserialize)]
struct MessageId {
    id: String,
}

#[derive(Serialize)]
struct EmbedPayload<'a> {
    embeds: [&'a Embed; 1],
}

#[derive(Serialize)]
struct TextPayload<'a> {
    content: &'a str,
}

/// Where notifications land and how they are kept fresh.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Publish a new embed message, returning its address.
    async fn publish(&self, channel_id: &str, embed: &Embed) -> Result<MessageRef, SinkError>;
    /// Overwrite a previously published embed in place.
    async fn update(&self, target: &MessageRef, embed: &Embed) -> Result<(), SinkError>;
    /// Check that a persisted address still points at a reachable message.
    async fn resolve(&self, channel_id: &str, message_id: &str) -> Result<MessageRef, SinkError>;
}

pub struct DiscordClient {
    http: Client,
    token: String,
    base_url: String,
}

impl DiscordClient {
    pub fn new(token: String) -> Self {
        Self::with_base_url(token, API_BASE.to_string())
    }

    pub fn with_base_url(token: String, base_url: String) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            token,
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, SinkError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(classify(status, &body))
    }

    /// Post a plain-text message (command replies).
    pub async fn post_text(&self, channel_id: &str, content: &str) -> Result<(), SinkError> {
        let url = self.url(&format!("/channels/{}/messages", channel_id));
        let resp = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .json(&TextPayload { content })
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Messages newer than `after` (oldest unknown id), newest first.
    pub async fn recent_messages(
        &self,
        channel_id: &str,
        after: Option<&str>,
    ) -> Result<Vec<ChannelMessage>, SinkError> {
        let mut url = self.url(&format!("/channels/{}/messages?limit=50", channel_id));
        if let Some(after) = after {
            url.push_str(&format!("&after={}", after));
        }
        let resp = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        Ok(resp.json().await?)
    }

    /// Newest message id in a channel, used to skip history on startup.
    pub async fn latest_message_id(&self, channel_id: &str) -> Result<Option<String>, SinkError> {
        let url = self.url(&format!("/channels/{}/messages?limit=1", channel_id));
        let resp = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let messages: Vec<MessageId> = resp.json().await?;
        Ok(messages.into_iter().next().map(|m| m.id))
    }
}

#[async_trait]
impl NotificationSink for DiscordClient {
    async fn publish(&self, channel_id: &str, embed: &Embed) -> Result<MessageRef, SinkError> {
        let url = self.url(&format!("/channels/{}/messages", channel_id));
        let resp = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .json(&EmbedPayload { embeds: [embed] })
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let created: MessageId = resp.json().await?;
        Ok(MessageRef {
            channel_id: channel_id.to_string(),
            message_id: created.id,
        })
    }

    async fn update(&self, target: &MessageRef, embed: &Embed) -> Result<(), SinkError> {
        let url = self.url(&format!(
            "/channels/{}/messages/{}",
            target.channel_id, target.message_id
        ));
        let resp = self
            .http
            .patch(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .json(&EmbedPayload { embeds: [embed] })
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn resolve(&self, channel_id: &str, message_id: &str) -> Result<MessageRef, SinkError> {
        let url = self.url(&format!("/channels/{}/messages/{}", channel_id, message_id));
        let resp = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let found: MessageId = resp.json().await?;
        Ok(MessageRef {
            channel_id: channel_id.to_string(),
            message_id: found.id,
        })
    }
}

/// Map a non-2xx response to the delivery-failure taxonomy. Discord
/// reports the interesting cases both via HTTP status and via a JSON
/// `code` field, so both are checked.
fn classify(status: StatusCode, body: &str) -> SinkError {
    let code = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("code").and_then(|c| c.as_i64()));

    if status == StatusCode::NOT_FOUND || code == Some(CODE_UNKNOWN_MESSAGE) {
        return SinkError::NotFound;
    }
    if status == StatusCode::FORBIDDEN || code == Some(CODE_MISSING_PERMISSIONS) {
        return SinkError::Forbidden;
    }

    let body: String = body.chars().take(200).collect();
    SinkError::Api { status, body }
}
