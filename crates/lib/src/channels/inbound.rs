//! Inbound message from a channel: delivered to the dispatcher for command handling.

use chrono::{DateTime, Utc};

/// Who wrote an inbound message.
#[derive(Debug, Clone)]
pub struct MessageAuthor {
    pub id: String,
    /// Name shown in the client (global display name, falling back to the username).
    pub display_name: String,
    pub avatar_url: Option<String>,
    /// True for bot and other automated accounts, including this bot itself.
    pub bot: bool,
}

/// A message from a channel, read-only and discarded after dispatch.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Connector id (e.g. "discord"), used to find the handle for replies.
    pub channel_id: String,
    /// Where the message was posted (e.g. Discord channel id); replies go here.
    pub conversation_id: String,
    pub message_id: String,
    pub text: String,
    pub author: MessageAuthor,
    pub created_at: DateTime<Utc>,
}
