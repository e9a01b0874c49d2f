//! Message type for the core model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{chat::Chat, user::User};

/// A single incoming chat message as seen by handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub user: User,
    pub chat: Chat,
    pub content: String,
    /// When the transport received the message.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Incoming text message received now; used by tests and non-Telegram callers.
    pub fn incoming(id: impl Into<String>, user: User, chat: Chat, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user,
            chat,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
