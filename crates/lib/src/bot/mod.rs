//! Prompt commands: recognise them in inbound messages, ask the generator, relay the answer.

mod command;
mod dispatcher;
mod relay;
mod webhook;

pub use command::{parse_command, CommandInvocation};
pub use dispatcher::Dispatcher;
pub use relay::{
    classify, Classification, Relay, RelayOutcome, EMPTY_NOTICE, FAILURE_NOTICE, PROCESSING_NOTICE,
    TOO_LONG_NOTICE,
};
pub use webhook::{HttpWebhookSink, WebhookError, WebhookRecord, WebhookSink};
