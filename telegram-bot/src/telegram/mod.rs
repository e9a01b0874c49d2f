//! Telegram transport: teloxide adapters, [`crate::core::Bot`] implementation, REPL runner.

mod adapters;
mod bot_adapter;
mod runner;

pub use adapters::{TelegramMessageWrapper, TelegramUserWrapper};
pub use bot_adapter::{is_message_not_modified_error, TelegramBotAdapter};
pub use runner::run_repl;
