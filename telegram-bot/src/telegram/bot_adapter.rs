//! Wraps teloxide::Bot and implements [`crate::core::Bot`].

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId, MessageId, ParseMode, ReplyParameters};
use tracing::debug;

use crate::core::{parse_message_id, Bot as CoreBot, Chat, DbotError, Message, Result};

/// Telegram rejects edits that would not change the message; that is not a failure for us.
pub fn is_message_not_modified_error(error: &str) -> bool {
    error.contains("message is not modified") || error.contains("exactly the same")
}

fn bot_error(e: teloxide::RequestError) -> DbotError {
    DbotError::Bot(e.to_string())
}

/// Thin wrapper around teloxide::Bot that implements core's Bot trait.
pub struct TelegramBotAdapter {
    bot: teloxide::Bot,
}

impl TelegramBotAdapter {
    pub fn new(bot: teloxide::Bot) -> Self {
        Self { bot }
    }

    /// The underlying teloxide::Bot for direct API use.
    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }

    fn edit_result(
        result: std::result::Result<teloxide::types::Message, teloxide::RequestError>,
    ) -> Result<()> {
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_message_not_modified_error(&e.to_string()) => {
                debug!("Edit skipped: message is not modified");
                Ok(())
            }
            Err(e) => Err(bot_error(e)),
        }
    }
}

#[async_trait]
impl CoreBot for TelegramBotAdapter {
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat.id), text.to_string())
            .await
            .map_err(bot_error)?;
        Ok(())
    }

    async fn send_message_and_return_id(&self, chat: &Chat, text: &str) -> Result<String> {
        let sent = self
            .bot
            .send_message(ChatId(chat.id), text.to_string())
            .await
            .map_err(bot_error)?;
        Ok(sent.id.to_string())
    }

    async fn reply_and_return_id(&self, message: &Message, text: &str) -> Result<String> {
        let reply_to = parse_message_id(&message.id)?;
        let sent = self
            .bot
            .send_message(ChatId(message.chat.id), text.to_string())
            .reply_parameters(ReplyParameters::new(MessageId(reply_to)))
            .await
            .map_err(bot_error)?;
        Ok(sent.id.to_string())
    }

    async fn edit_message(&self, chat: &Chat, message_id: &str, text: &str) -> Result<()> {
        let id = parse_message_id(message_id)?;
        let result = self
            .bot
            .edit_message_text(ChatId(chat.id), MessageId(id), text.to_string())
            .await;
        Self::edit_result(result)
    }

    async fn edit_markdown(&self, chat: &Chat, message_id: &str, text: &str) -> Result<()> {
        let id = parse_message_id(message_id)?;
        let result = self
            .bot
            .edit_message_text(ChatId(chat.id), MessageId(id), text.to_string())
            .parse_mode(ParseMode::MarkdownV2)
            .await;
        Self::edit_result(result)
    }

    async fn send_markdown(&self, chat: &Chat, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat.id), text.to_string())
            .parse_mode(ParseMode::MarkdownV2)
            .await
            .map_err(bot_error)?;
        Ok(())
    }

    async fn delete_message(&self, chat: &Chat, message_id: &str) -> Result<()> {
        let id = parse_message_id(message_id)?;
        self.bot
            .delete_message(ChatId(chat.id), MessageId(id))
            .await
            .map_err(bot_error)?;
        Ok(())
    }

    async fn send_typing(&self, chat: &Chat) -> Result<()> {
        self.bot
            .send_chat_action(ChatId(chat.id), ChatAction::Typing)
            .await
            .map_err(bot_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_modified_errors_are_recognized() {
        assert!(is_message_not_modified_error(
            "Bad Request: message is not modified: specified new message content and reply markup are exactly the same"
        ));
        assert!(!is_message_not_modified_error("Bad Request: message to edit not found"));
    }
}
