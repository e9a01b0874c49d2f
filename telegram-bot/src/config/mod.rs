//! Bot configuration: BaseConfig (Telegram, chat policy, logging) + CompletionSettings (endpoint, model, retry).

mod base;
mod bot_config;
mod completion;


pub use base::{
    parse_allowed_users, BaseConfig, DEFAULT_LOG_FILE, DEFAULT_PREFIX, DEFAULT_THINKING_MESSAGE,
};
pub use bot_config::BotConfig;
pub use completion::CompletionSettings;
