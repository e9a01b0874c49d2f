//! Outbound chat transport. Handlers only talk to Telegram through [`Bot`], so tests can
//! substitute a recording implementation.

use async_trait::async_trait;

use super::error::{DbotError, Result};
use super::types::{Chat, Message};

#[async_trait]
pub trait Bot: Send + Sync {
    /// Sends plain text.
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()>;

    /// Sends plain text and returns the new message id (used for placeholders that are edited later).
    async fn send_message_and_return_id(&self, chat: &Chat, text: &str) -> Result<String>;

    async fn reply_to(&self, message: &Message, text: &str) -> Result<()> {
        self.send_message(&message.chat, text).await
    }

    /// Sends plain text as a reply to `message` and returns the new message id.
    async fn reply_and_return_id(&self, message: &Message, text: &str) -> Result<String> {
        self.send_message_and_return_id(&message.chat, text).await
    }

    /// Replaces the text of a sent message with plain text.
    async fn edit_message(&self, chat: &Chat, message_id: &str, text: &str) -> Result<()>;

    /// Replaces the text of a sent message; `text` must already be escaped MarkdownV2.
    async fn edit_markdown(&self, chat: &Chat, message_id: &str, text: &str) -> Result<()>;

    /// Sends already escaped MarkdownV2.
    async fn send_markdown(&self, chat: &Chat, text: &str) -> Result<()>;

    async fn delete_message(&self, chat: &Chat, message_id: &str) -> Result<()>;

    /// Shows the "typing…" chat action.
    async fn send_typing(&self, chat: &Chat) -> Result<()>;
}

/// Parses a transport message id (Telegram ids are `i32`).
pub fn parse_message_id(message_id: &str) -> Result<i32> {
    message_id
        .parse()
        .map_err(|_| DbotError::Bot(format!("Invalid message_id: {}", message_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_message_id_accepts_numbers_only() {
        assert_eq!(parse_message_id("42").unwrap(), 42);
        assert!(parse_message_id("abc").is_err());
        assert!(parse_message_id("").is_err());
    }
}
