//! gembot core library: config, Gemini client, Discord channel, prompt dispatch/relay,
//! and the HTTP gateway used by the CLI.

pub mod bot;
pub mod channels;
pub mod config;
pub mod gateway;
pub mod init;
pub mod llm;
