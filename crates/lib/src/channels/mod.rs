//! Communication channels (Discord).
//!
//! Channel trait and registry so the bootstrap can start/stop channel connectors
//! and the dispatcher can reply. Inbound messages are sent to the dispatcher over an mpsc channel.

mod discord;
mod inbound;
mod registry;

pub use discord::{DiscordChannel, DiscordMessage, DiscordUser, GatewayPayload};
pub use inbound::{InboundMessage, MessageAuthor};
pub use registry::{ChannelHandle, ChannelRegistry};
