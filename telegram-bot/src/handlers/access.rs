//! Allow-list check by chat id.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::core::{Bot, Handler, Message, Result};

pub const MSG_NO_ACCESS: &str = "You have no access. Sorry...";

/// Stops the chain for chats outside the allow-list after telling them so.
/// With no allow-list every chat is allowed.
pub struct AccessHandler {
    bot: Arc<dyn Bot>,
    allowed: Option<HashSet<i64>>,
}

impl AccessHandler {
    pub fn new(bot: Arc<dyn Bot>, allowed: Option<HashSet<i64>>) -> Self {
        Self { bot, allowed }
    }

    pub fn is_allowed(&self, chat_id: i64) -> bool {
        self.allowed
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&chat_id))
    }
}

#[async_trait]
impl Handler for AccessHandler {
    #[instrument(skip(self, message), fields(chat_id = message.chat.id))]
    async fn before(&self, message: &Message) -> Result<bool> {
        if self.is_allowed(message.chat.id) {
            return Ok(true);
        }
        info!(user_id = message.user.id, "Chat not in ALLOWED_USERS; access denied");
        self.bot.send_message(&message.chat, MSG_NO_ACCESS).await?;
        Ok(false)
    }
}
