//! Group prefix filter and built-in commands.

use std::sync::Arc;

use async_trait::async_trait;
use message_store::MessageStore;
use tracing::{debug, info, instrument};

use crate::core::{Bot, Handler, HandlerError, HandlerResponse, Message, Result};
use crate::session::SessionStore;

pub const MSG_START: &str = "hi!";
pub const MSG_WHAT: &str = "what?";
pub const MSG_RESET: &str = "🧹 Conversation cleared. Let's start over.";

/// Prefix that group messages must start with (`/gpt` or `/{GROUP_NAME}`).
#[derive(Debug, Clone)]
pub struct CommandPrefix(String);

impl CommandPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text the bot should act on, without the prefix. `None` for group messages without the
    /// prefix and for messages without text.
    pub fn strip<'a>(&self, message: &'a Message) -> Option<&'a str> {
        let text = message.content.trim();
        if text.is_empty() {
            return None;
        }
        match text.strip_prefix(self.0.as_str()) {
            Some(rest) => Some(rest.trim_start()),
            None if message.chat.is_group() => None,
            None => Some(text),
        }
    }
}

/// Ignores unprefixed group chatter and answers `/start`, `/reset` and too-short input.
pub struct CommandHandler {
    bot: Arc<dyn Bot>,
    prefix: CommandPrefix,
    sessions: Arc<dyn SessionStore>,
    store: Arc<dyn MessageStore>,
}

impl CommandHandler {
    pub fn new(
        bot: Arc<dyn Bot>,
        prefix: CommandPrefix,
        sessions: Arc<dyn SessionStore>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            bot,
            prefix,
            sessions,
            store,
        }
    }

    async fn reset(&self, message: &Message) -> Result<()> {
        let previous = self
            .sessions
            .reset(message.chat.id)
            .await
            .map_err(|e| HandlerError::Session(e.to_string()))?;
        if let Some(conversation_id) = previous.and_then(|s| s.conversation_id) {
            let removed = self
                .store
                .clear_conversation(&conversation_id)
                .await
                .map_err(|e| HandlerError::Store(e.to_string()))?;
            info!(chat_id = message.chat.id, conversation_id = %conversation_id, removed, "Conversation reset");
        }
        Ok(())
    }

    async fn reply(&self, message: &Message, text: &str) -> Result<HandlerResponse> {
        self.bot.reply_to(message, text).await?;
        Ok(HandlerResponse::Reply(text.to_string()))
    }
}

#[async_trait]
impl Handler for CommandHandler {
    async fn before(&self, message: &Message) -> Result<bool> {
        if self.prefix.strip(message).is_none() {
            debug!(
                chat_id = message.chat.id,
                prefix = %self.prefix.as_str(),
                "Ignoring message without text or group prefix"
            );
            return Ok(false);
        }
        Ok(true)
    }

    #[instrument(skip(self, message), fields(chat_id = message.chat.id))]
    async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        let Some(text) = self.prefix.strip(message) else {
            return Ok(HandlerResponse::Stop);
        };

        if text.starts_with("/start") {
            return self.reply(message, MSG_START).await;
        }
        if text.starts_with("/reset") {
            self.reset(message).await?;
            return self.reply(message, MSG_RESET).await;
        }
        if text.chars().count() < 2 {
            return self.reply(message, MSG_WHAT).await;
        }
        Ok(HandlerResponse::Continue)
    }
}
