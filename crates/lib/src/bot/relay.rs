//! Response relay: acknowledge, generate, classify, reply, and mirror delivered exchanges.

use crate::bot::command::CommandInvocation;
use crate::bot::webhook::{WebhookRecord, WebhookSink};
use crate::channels::{ChannelHandle, InboundMessage};
use crate::llm::TextGenerator;
use std::sync::Arc;

pub const PROCESSING_NOTICE: &str = "Processing prompt...";
pub const TOO_LONG_NOTICE: &str = "Sorry, the response is too long to send.";
pub const EMPTY_NOTICE: &str = "Sorry, the response is empty.";
pub const FAILURE_NOTICE: &str = "Sorry, something went wrong while generating a response.";

/// What was sent back to the channel for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered,
    TooLongNoticeSent,
    EmptyNoticeSent,
    /// The generator failed and the failure notice was sent.
    ErrorNoticeSent,
    /// The final send to the channel failed.
    SendFailed,
}

/// Deliverability of a generated response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Empty,
    TooLong,
    Deliverable,
}

/// Classify by length in characters (Unicode scalar values).
pub fn classify(response: &str, max_length: usize) -> Classification {
    let len = response.chars().count();
    if len > max_length {
        Classification::TooLong
    } else if len == 0 {
        Classification::Empty
    } else {
        Classification::Deliverable
    }
}

/// Runs one invocation against the generator and reports back on the channel.
#[derive(Clone)]
pub struct Relay {
    generator: Arc<dyn TextGenerator>,
    sink: Option<Arc<dyn WebhookSink>>,
    max_length: usize,
}

impl Relay {
    /// `sink` None disables the webhook copy.
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        sink: Option<Arc<dyn WebhookSink>>,
        max_length: usize,
    ) -> Self {
        Self {
            generator,
            sink,
            max_length,
        }
    }

    pub async fn relay(
        &self,
        invocation: &CommandInvocation,
        message: &InboundMessage,
        channel: &dyn ChannelHandle,
    ) -> RelayOutcome {
        let conversation = message.conversation_id.as_str();
        if let Err(e) = channel.send_message(conversation, PROCESSING_NOTICE).await {
            log::debug!("relay: acknowledgement send failed: {}", e);
        }

        let response = match self.generator.generate(&invocation.prompt_text).await {
            Ok(r) => r,
            Err(e) => {
                log::warn!("relay: generation failed for message {}: {}", message.message_id, e);
                return send_notice(channel, conversation, FAILURE_NOTICE, RelayOutcome::ErrorNoticeSent)
                    .await;
            }
        };

        match classify(&response, self.max_length) {
            Classification::TooLong => {
                log::info!(
                    "relay: response of {} chars exceeds limit {}",
                    response.chars().count(),
                    self.max_length
                );
                send_notice(channel, conversation, TOO_LONG_NOTICE, RelayOutcome::TooLongNoticeSent).await
            }
            Classification::Empty => {
                send_notice(channel, conversation, EMPTY_NOTICE, RelayOutcome::EmptyNoticeSent).await
            }
            Classification::Deliverable => {
                if let Err(e) = channel.send_message(conversation, &response).await {
                    log::warn!("relay: send_message failed: {}", e);
                    return RelayOutcome::SendFailed;
                }
                if let Some(sink) = &self.sink {
                    let record = WebhookRecord::new(&invocation.prompt_text, &response, message);
                    spawn_webhook_post(sink.clone(), record);
                }
                RelayOutcome::Delivered
            }
        }
    }
}

async fn send_notice(
    channel: &dyn ChannelHandle,
    conversation_id: &str,
    text: &str,
    outcome: RelayOutcome,
) -> RelayOutcome {
    match channel.send_message(conversation_id, text).await {
        Ok(()) => outcome,
        Err(e) => {
            log::warn!("relay: notice send failed: {}", e);
            RelayOutcome::SendFailed
        }
    }
}

/// Detached: the result is only logged.
fn spawn_webhook_post(sink: Arc<dyn WebhookSink>, record: WebhookRecord) {
    tokio::spawn(async move {
        if let Err(e) = sink.post(&record).await {
            log::warn!("webhook post failed: {}", e);
        }
    });
}
