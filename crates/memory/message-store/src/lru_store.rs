//! In-memory, capacity-bounded implementation of [`MessageStore`] with least-recently-used eviction.

use super::{Message, MessageLookup, MessageStore};
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Default number of messages kept before the least recently used one is evicted.
pub const DEFAULT_CAPACITY: usize = 10_000;

type MessageCache = LruCache<String, Message>;

/// LRU message store shared between chats. A single async mutex guards the cache; entries
/// never interact across ids, so contention is the only cost.
#[derive(Debug, Clone)]
pub struct LruMessageStore {
    entries: Arc<Mutex<MessageCache>>,
    capacity: usize,
}

impl LruMessageStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
            capacity: capacity.get(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for LruMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageLookup for LruMessageStore {
    async fn get(&self, id: &str) -> Result<Option<Message>, anyhow::Error> {
        let mut entries = self.entries.lock().await;
        let found = entries.get(id).cloned();
        debug!(id = %id, found = found.is_some(), "Message store get");
        Ok(found)
    }
}

#[async_trait]
impl MessageStore for LruMessageStore {
    async fn put(&self, message: Message) -> Result<(), anyhow::Error> {
        let id = message.id.clone();
        let role = message.role;
        let mut entries = self.entries.lock().await;
        if let Some((evicted_id, _)) = entries.push(id.clone(), message) {
            if evicted_id != id {
                debug!(evicted_id = %evicted_id, "Message store full, evicted least recently used");
            }
        }
        debug!(id = %id, role = ?role, size = entries.len(), "Message store put");
        Ok(())
    }

    async fn clear_conversation(&self, conversation_id: &str) -> Result<usize, anyhow::Error> {
        let mut entries = self.entries.lock().await;
        let ids: Vec<String> = entries
            .iter()
            .filter(|(_, m)| m.conversation_id == conversation_id)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ids {
            entries.pop(id);
        }
        info!(conversation_id = %conversation_id, removed = ids.len(), "Cleared conversation from message store");
        Ok(ids.len())
    }

    async fn clear(&self) -> Result<(), anyhow::Error> {
        self.entries.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_message(id: &str, conversation_id: &str) -> Message {
        Message::user(id, format!("text of {}", id), None, conversation_id)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = LruMessageStore::new();
        let m = user_message("m1", "c1");
        store.put(m.clone()).await.unwrap();
        assert_eq!(store.get("m1").await.unwrap(), Some(m));
    }

    #[tokio::test]
    async fn test_get_unknown_returns_none() {
        let store = LruMessageStore::new();
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_same_id() {
        let store = LruMessageStore::new();
        store.put(user_message("m1", "c1")).await.unwrap();
        let replacement = Message::assistant("m1", "new text", None, "c1");
        store.put(replacement.clone()).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("m1").await.unwrap(), Some(replacement));
    }

    #[tokio::test]
    async fn test_evicts_least_recently_used() {
        let store = LruMessageStore::with_capacity(2);
        store.put(user_message("a", "c")).await.unwrap();
        store.put(user_message("b", "c")).await.unwrap();
        // touch "a" so "b" becomes the least recently used
        assert!(store.get("a").await.unwrap().is_some());
        store.put(user_message("c", "c")).await.unwrap();

        assert_eq!(store.len().await, 2);
        assert!(store.get("a").await.unwrap().is_some());
        assert!(store.get("b").await.unwrap().is_none());
        assert!(store.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_zero_capacity_is_raised_to_one() {
        let store = LruMessageStore::with_capacity(0);
        assert_eq!(store.capacity(), 1);
        store.put(user_message("a", "c")).await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_clear_conversation_only_removes_that_conversation() {
        let store = LruMessageStore::new();
        store.put(user_message("a", "chat-1")).await.unwrap();
        store.put(user_message("b", "chat-1")).await.unwrap();
        store.put(user_message("c", "chat-2")).await.unwrap();

        let removed = store.clear_conversation("chat-1").await.unwrap();

        assert_eq!(removed, 2);
        assert!(store.get("a").await.unwrap().is_none());
        assert!(store.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let store = LruMessageStore::new();
        store.put(user_message("a", "c")).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_puts_from_independent_chats() {
        let store = LruMessageStore::new();
        let mut handles = Vec::new();
        for chat in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    let id = format!("{}-{}", chat, i);
                    store.put(user_message(&id, &chat.to_string())).await.unwrap();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.len().await, 400);
        let m = store.get("3-17").await.unwrap().unwrap();
        assert_eq!(m.conversation_id, "3");
    }
}
