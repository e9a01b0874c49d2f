//! Core types for stored conversation messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message identifier. Locally created ids are UUID v4 strings; replies may carry the
/// completion endpoint's own id (e.g. `cmpl-...`).
pub type MessageId = String;

/// Returns a fresh UUID v4 message id.
pub fn new_message_id() -> MessageId {
    Uuid::new_v4().to_string()
}

/// Author of a message in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single turn of a conversation. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    /// The turn this message answers or follows; `None` for the first turn.
    pub parent_message_id: Option<MessageId>,
    pub conversation_id: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(
        id: impl Into<MessageId>,
        text: impl Into<String>,
        parent_message_id: Option<MessageId>,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
            text: text.into(),
            parent_message_id,
            conversation_id: conversation_id.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(
        id: impl Into<MessageId>,
        text: impl Into<String>,
        parent_message_id: Option<MessageId>,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            ..Self::user(id, text, parent_message_id, conversation_id)
        }
    }
}
