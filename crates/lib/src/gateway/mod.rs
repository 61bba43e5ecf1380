//! Gateway: HTTP facade and process wiring.
//!
//! One port serves `POST /gemini` (direct prompt, bypassing the chat platform) and a health probe.
//! `run_gateway` also starts the Discord connector and the command dispatcher.

mod api;
mod server;

pub use api::{ApiError, ErrorResponse, PromptRequest};
pub use server::{router, run_gateway, GatewayState};
