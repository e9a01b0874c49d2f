//! Message lookup and storage traits.

use async_trait::async_trait;

use super::types::Message;

/// Read-only lookup by id. Injected into the prompt builder so tests can supply a fake.
///
/// An unknown or evicted id yields `Ok(None)`; `Err` is reserved for backend failures.
#[async_trait]
pub trait MessageLookup: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Message>, anyhow::Error>;
}

/// Full message store used by the completion client and session reset.
#[async_trait]
pub trait MessageStore: MessageLookup {
    /// Inserts or overwrites by `message.id`.
    async fn put(&self, message: Message) -> Result<(), anyhow::Error>;
    /// Removes every message of the given conversation. Returns the number removed.
    async fn clear_conversation(&self, conversation_id: &str) -> Result<usize, anyhow::Error>;
    /// Removes every message.
    async fn clear(&self) -> Result<(), anyhow::Error>;
}
