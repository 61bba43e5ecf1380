//! Webhook sink: best-effort copy of each delivered exchange to an external log.

use crate::channels::InboundMessage;
use async_trait::async_trait;
use serde::Serialize;

/// Body posted to the webhook for one delivered exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookRecord {
    /// The prompt text.
    pub title: String,
    /// The generated response.
    pub description: String,
    /// Creation time of the originating message, ISO-8601 in UTC with milliseconds.
    pub timestamp: String,
    /// Author display name.
    pub username: String,
    /// Author avatar URL; null for the default avatar.
    pub avatar: Option<String>,
}

impl WebhookRecord {
    pub fn new(prompt: &str, response: &str, message: &InboundMessage) -> Self {
        Self {
            title: prompt.to_string(),
            description: response.to_string(),
            timestamp: message
                .created_at
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            username: message.author.display_name.clone(),
            avatar: message.author.avatar_url.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Destination for exchange records.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn post(&self, record: &WebhookRecord) -> Result<(), WebhookError>;
}

/// Posts records as JSON to a fixed URL.
#[derive(Clone)]
pub struct HttpWebhookSink {
    url: String,
    client: reqwest::Client,
}

impl HttpWebhookSink {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl WebhookSink for HttpWebhookSink {
    async fn post(&self, record: &WebhookRecord) -> Result<(), WebhookError> {
        let res = self.client.post(&self.url).json(record).send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(WebhookError::Status { status, body });
        }
        Ok(())
    }
}
