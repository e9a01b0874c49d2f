//! # Completion client
//!
//! Sends a user turn to an OpenAI-compatible completion endpoint and returns the assistant
//! reply, keeping conversational context through a parent-message chain.
//!
//! Per call, [`CompletionClient::send_message`]:
//! 1. stores the user message in the [`message_store::MessageStore`];
//! 2. builds a bounded prompt with [`prompt::PromptBuilder`];
//! 3. POSTs to `{base_url}/v1/completions` (or `/v1/chat/completions`), streaming or not;
//! 4. stores the assistant reply (parent = user message) and returns it.
//!
//! Streaming replies are also available as a pull-based [`CompletionStream`] via
//! [`CompletionClient::stream_message`]; dropping the stream cancels the request.
//!
//! Errors are classified by [`CompletionError`]; nothing is retried here.

mod client;
mod config;
mod error;
pub mod sse;
mod stream;
mod types;

pub use client::CompletionClient;
pub use config::{CompletionApi, CompletionConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::CompletionError;
pub use stream::CompletionStream;
pub use types::{CompletionEvent, CompletionResult, ProgressCallback, SendOptions};

pub use tokio_util::sync::CancellationToken;

/// Masks an API key/token for safe logging: shows first 7 chars + "***" + last 4 chars.
/// If length <= 11, returns "***" to avoid leaking any part of the key.
pub fn mask_token(token: &str) -> String {
    let len = token.len();
    if len <= 11 || !token.is_ascii() {
        "***".to_string()
    } else {
        format!("{}***{}", &token[..7], &token[len - 4..])
    }
}
