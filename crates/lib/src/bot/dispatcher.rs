//! Command dispatcher: filter inbound messages and hand prompt commands to the relay.

use crate::bot::command::parse_command;
use crate::bot::relay::{Relay, RelayOutcome};
use crate::channels::{ChannelRegistry, InboundMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Stateless per message; safe to share across tasks.
pub struct Dispatcher {
    prefix: String,
    relay: Relay,
    channels: Arc<ChannelRegistry>,
}

impl Dispatcher {
    pub fn new(prefix: impl Into<String>, relay: Relay, channels: Arc<ChannelRegistry>) -> Self {
        Self {
            prefix: prefix.into(),
            relay,
            channels,
        }
    }

    /// Handle one message to completion. None when nothing was relayed (bot author, no prefix, unknown channel).
    pub async fn dispatch(&self, msg: InboundMessage) -> Option<RelayOutcome> {
        if msg.author.bot {
            return None;
        }
        let Some(invocation) = parse_command(&msg.text, &self.prefix) else {
            log::warn!(
                "ignoring message {} without command prefix: {:?}",
                msg.message_id,
                msg.text
            );
            return None;
        };
        let Some(handle) = self.channels.get(&msg.channel_id).await else {
            log::warn!("no channel handle registered for {}", msg.channel_id);
            return None;
        };
        let outcome = self.relay.relay(&invocation, &msg, handle.as_ref()).await;
        log::debug!(
            "message {} from {}: {:?}",
            msg.message_id,
            msg.author.display_name,
            outcome
        );
        Some(outcome)
    }

    /// Receive loop: every message runs on its own task, so replies are not ordered across messages.
    pub fn spawn(self: Arc<Self>, mut inbound_rx: mpsc::Receiver<InboundMessage>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(msg) = inbound_rx.recv().await {
                let dispatcher = self.clone();
                tokio::spawn(async move {
                    dispatcher.dispatch(msg).await;
                });
            }
            log::debug!("dispatcher: inbound channel closed");
        })
    }
}
