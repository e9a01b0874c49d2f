//! # Prompt
//!
//! Assembles the prompt sent to a completion endpoint.
//!
//! - [`TokenCounter`]: deterministic token length of a text ([`BpeTokenCounter`] for GPT-3
//!   BPE, [`EstimateTokenCounter`] as a cheap heuristic).
//! - [`PromptBuilder`]: walks the parent-message chain backward through an injected
//!   [`message_store::MessageLookup`] and keeps the longest suffix of the conversation that
//!   fits `max_model_tokens - max_response_tokens`.
//!
//! ## External interactions
//!
//! - **Completion endpoints**: [`BuiltPrompt::text`] is the `prompt` field of `/v1/completions`;
//!   [`BuiltPrompt::messages`] is the `messages` array of `/v1/chat/completions`.

pub mod builder;
pub mod tokens;

pub use builder::{
    default_prompt_prefix, default_prompt_suffix, BuiltPrompt, PromptBuilder, PromptBuilderConfig,
    PromptOptions, ASSISTANT_LABEL_DEFAULT, END_OF_TURN, USER_LABEL_DEFAULT,
};
pub use tokens::{BpeTokenCounter, EstimateTokenCounter, TokenCounter};

use serde::{Deserialize, Serialize};

/// Role of a message, one-to-one with OpenAI Chat Completions API `role` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction (API `role: "system"`).
    System,
    /// User message (API `role: "user"`).
    User,
    /// Assistant message (API `role: "assistant"`).
    Assistant,
}

/// A single chat message, one-to-one with one element of OpenAI `messages` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&message_store::Message> for ChatMessage {
    fn from(m: &message_store::Message) -> Self {
        match m.role {
            message_store::Role::User => ChatMessage::user(m.text.clone()),
            message_store::Role::Assistant => ChatMessage::assistant(m.text.clone()),
        }
    }
}
