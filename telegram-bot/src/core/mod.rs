//! Core types and traits: Handler, Bot, Message, HandlerResponse, error, logger.
//! Transport-agnostic; the Telegram adapter lives in [`crate::telegram`].

pub mod bot;
pub mod error;
pub mod logger;
pub mod types;

pub use bot::{parse_message_id, Bot};
pub use error::{DbotError, HandlerError, Result};
pub use logger::init_tracing;
pub use types::{
    Chat, ChatKind, Handler, HandlerResponse, Message, ToCoreMessage, ToCoreUser, User,
};
