//! Test doubles shared by the integration tests: recording channel, canned generator,
//! recording webhook sink, and a helper to serve an axum router on an ephemeral port.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use chrono::TimeZone;
use lib::bot::{WebhookError, WebhookRecord, WebhookSink};
use lib::channels::{ChannelHandle, InboundMessage, MessageAuthor};
use lib::llm::{LlmError, TextGenerator};
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// Serve `app` on 127.0.0.1 with an OS-assigned port. The server task is left running when the test ends.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Channel handle that records every send. Sends fail when `fail_sends` is set.
pub struct RecordingChannel {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail_sends: bool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_sends: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_sends: true,
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl ChannelHandle for RecordingChannel {
    fn id(&self) -> &str {
        "discord"
    }

    fn stop(&self) {}

    async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), String> {
        self.sent
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), text.to_string()));
        if self.fail_sends {
            Err("403 Forbidden".to_string())
        } else {
            Ok(())
        }
    }
}

/// Generator with a canned reply; records the prompts it was given.
pub struct FixedGenerator {
    reply: Result<String, (u16, String)>,
    pub prompts: Mutex<Vec<String>>,
}

impl FixedGenerator {
    pub fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16, message: impl Into<String>) -> Self {
        Self {
            reply: Err((status, message.into())),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextGenerator for FixedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err((status, message)) => Err(LlmError::Api {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}

/// Sink that forwards records to a channel so tests can await the detached post.
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<WebhookRecord>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WebhookRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, fail: false }, rx)
    }

    pub fn failing() -> (Self, mpsc::UnboundedReceiver<WebhookRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, fail: true }, rx)
    }
}

#[async_trait]
impl WebhookSink for RecordingSink {
    async fn post(&self, record: &WebhookRecord) -> Result<(), WebhookError> {
        let _ = self.tx.send(record.clone());
        if self.fail {
            Err(WebhookError::Status {
                status: 500,
                body: "boom".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

/// Wait briefly for a detached webhook post.
pub async fn next_record(rx: &mut mpsc::UnboundedReceiver<WebhookRecord>) -> Option<WebhookRecord> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .ok()
        .flatten()
}

/// Assert that no webhook post arrives within a short window.
pub async fn assert_no_record(rx: &mut mpsc::UnboundedReceiver<WebhookRecord>) {
    let got = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(
        !matches!(got, Ok(Some(_))),
        "unexpected webhook post: {:?}",
        got
    );
}

/// Inbound Discord message from a human author in conversation "777".
pub fn inbound(text: &str) -> InboundMessage {
    InboundMessage {
        channel_id: "discord".to_string(),
        conversation_id: "777".to_string(),
        message_id: "1100".to_string(),
        text: text.to_string(),
        author: MessageAuthor {
            id: "55".to_string(),
            display_name: "Ada L.".to_string(),
            avatar_url: Some("https://cdn.discordapp.com/avatars/55/abc123.png".to_string()),
            bot: false,
        },
        created_at: chrono::Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 30, 45)
            .unwrap(),
    }
}

pub fn inbound_from_bot(text: &str) -> InboundMessage {
    let mut msg = inbound(text);
    msg.author.bot = true;
    msg
}
