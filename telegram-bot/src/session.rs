//! Per-chat conversation bookkeeping.
//!
//! A [`Session`] remembers which conversation a chat is in and the id of the last assistant
//! reply, which becomes the parent of the next user turn. The store is an explicit dependency
//! of the handlers that need it.

use std::collections::HashMap;

use async_trait::async_trait;
use message_store::MessageId;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub conversation_id: Option<String>,
    pub parent_message_id: Option<MessageId>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Session of `chat_id`; empty when the chat has none.
    async fn get(&self, chat_id: i64) -> anyhow::Result<Session>;
    async fn set(&self, chat_id: i64, session: Session) -> anyhow::Result<()>;
    /// Forgets the chat's session and returns what was stored.
    async fn reset(&self, chat_id: i64) -> anyhow::Result<Option<Session>>;
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<i64, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, chat_id: i64) -> anyhow::Result<Session> {
        Ok(self
            .sessions
            .read()
            .await
            .get(&chat_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set(&self, chat_id: i64, session: Session) -> anyhow::Result<()> {
        debug!(chat_id, parent_message_id = ?session.parent_message_id, "Session updated");
        self.sessions.write().await.insert(chat_id, session);
        Ok(())
    }

    async fn reset(&self, chat_id: i64) -> anyhow::Result<Option<Session>> {
        Ok(self.sessions.write().await.remove(&chat_id))
    }
}
