//! # GPT Telegram bot
//!
//! Relays chat messages to an OpenAI-compatible completion endpoint and answers with the
//! reply, keeping per-chat context through a parent-message chain.
//!
//! - [`core`]: transport-agnostic types (Handler, Bot, Message, errors, logger).
//! - [`chain`]: [`HandlerChain`] running before → handle → after.
//! - [`handlers`]: command filter, allow-list, completion.
//! - [`queue`]: per-chat serial processing.
//! - [`telegram`]: teloxide adapter and REPL.

pub mod chain;
pub mod cli;
pub mod components;
pub mod config;
pub mod core;
pub mod handlers;
pub mod markdown;
pub mod queue;
pub mod retry;
pub mod runner;
pub mod session;
pub mod setup;
pub mod telegram;

pub use cli::{config_summary, load_config, Cli, Commands};

pub use core::{
    init_tracing, parse_message_id, Bot, Chat, ChatKind, DbotError, Handler, HandlerError,
    HandlerResponse, Message, Result, ToCoreMessage, ToCoreUser, User,
};

pub use chain::HandlerChain;

pub use telegram::{run_repl, TelegramBotAdapter, TelegramMessageWrapper, TelegramUserWrapper};

pub use config::{BaseConfig, BotConfig, CompletionSettings};
pub use runner::{build_chain, run_bot};

pub use components::{build_bot_components, build_handler_chain, BotComponents};
pub use handlers::{AccessHandler, CommandHandler, CommandPrefix, CompletionHandler};
pub use queue::ChatQueues;
pub use retry::{with_retry, FailureKind, RetryPolicy};
pub use session::{InMemorySessionStore, Session, SessionStore};
