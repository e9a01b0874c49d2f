//! # message-store
//!
//! Conversation messages keyed by id: the [`Message`] record, the [`MessageLookup`] /
//! [`MessageStore`] traits and the capacity-bounded [`LruMessageStore`].
//!
//! The prompt builder only needs [`MessageLookup`] to walk a parent chain; the completion
//! client needs the full [`MessageStore`] to persist user and assistant turns.

pub mod lru_store;
pub mod store;
pub mod types;

pub use lru_store::{LruMessageStore, DEFAULT_CAPACITY};
pub use store::{MessageLookup, MessageStore};
pub use types::{new_message_id, Message, MessageId, Role};
