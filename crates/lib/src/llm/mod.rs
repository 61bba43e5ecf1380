//! LLM abstraction and Gemini client.
//!
//! The bot and the HTTP facade only need single-shot text generation, so the
//! seam is one async method: prompt in, generated text out.

mod gemini;

use async_trait::async_trait;

pub use gemini::GeminiClient;

/// Errors from a text generation backend. Passed through to callers unmodified.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("gemini request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("gemini api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("gemini blocked the prompt: {0}")]
    Blocked(String),
}

/// Single-shot text generation (one provider call, no retries).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}
