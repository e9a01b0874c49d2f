//! Component factory: builds the stores, completion client and handler chain from config.
//! Isolates assembly from the runner so tests can inject their own [`Bot`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use completion_client::{mask_token, CompletionClient};
use message_store::{LruMessageStore, MessageStore};
use prompt::{BpeTokenCounter, EstimateTokenCounter, TokenCounter};
use tracing::{error, info, instrument, warn};

use crate::chain::HandlerChain;
use crate::config::{BotConfig, CompletionSettings};
use crate::core::Bot;
use crate::handlers::{AccessHandler, CommandHandler, CommandPrefix, CompletionHandler};
use crate::session::{InMemorySessionStore, SessionStore};

/// Shared dependencies of the handlers.
#[derive(Clone)]
pub struct BotComponents {
    pub bot: Arc<dyn Bot>,
    pub store: Arc<dyn MessageStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub client: CompletionClient,
}

/// teloxide Bot with TELEGRAM_API_URL applied when it parses.
pub fn create_teloxide_bot(config: &BotConfig) -> teloxide::Bot {
    let bot = teloxide::Bot::new(config.bot_token());
    match config.telegram_api_url() {
        Some(url_str) => match reqwest::Url::parse(url_str) {
            Ok(url) => bot.set_api_url(url),
            Err(e) => {
                error!(error = %e, url = %url_str, "Invalid TELEGRAM_API_URL, using default");
                bot
            }
        },
        None => bot,
    }
}

/// GPT-3 BPE counter, or the chars/4 estimate when the BPE tables cannot be loaded.
pub fn create_token_counter() -> Arc<dyn TokenCounter> {
    match BpeTokenCounter::new() {
        Ok(counter) => Arc::new(counter),
        Err(e) => {
            warn!(error = %e, "BPE tokenizer unavailable; estimating tokens");
            Arc::new(EstimateTokenCounter)
        }
    }
}

#[instrument(skip(settings, store))]
pub fn create_completion_client(
    settings: &CompletionSettings,
    store: Arc<dyn MessageStore>,
) -> Result<CompletionClient> {
    info!(
        base_url = %settings.base_url,
        model = %settings.model,
        api_key = %mask_token(&settings.api_key),
        "Creating completion client"
    );
    let client =
        CompletionClient::new(settings.client_config(), store, create_token_counter())?;
    Ok(client)
}

/// Builds components around `bot` (the Telegram adapter in production, a mock in tests).
#[instrument(skip(config, bot))]
pub fn build_bot_components(config: &BotConfig, bot: Arc<dyn Bot>) -> Result<BotComponents> {
    let store: Arc<dyn MessageStore> = Arc::new(LruMessageStore::new());
    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    let client = create_completion_client(config.completion(), store.clone())?;
    Ok(BotComponents {
        bot,
        store,
        sessions,
        client,
    })
}

/// Builds the handler chain (command → access → completion).
pub fn build_handler_chain(config: &BotConfig, components: &BotComponents) -> HandlerChain {
    let base = config.base();
    let completion = config.completion();
    let prefix = CommandPrefix::new(base.prefix());

    let command = CommandHandler::new(
        components.bot.clone(),
        prefix.clone(),
        components.sessions.clone(),
        components.store.clone(),
    );
    let access = AccessHandler::new(components.bot.clone(), base.allowed_users.clone());
    let completion_handler = CompletionHandler::new(
        components.bot.clone(),
        components.client.clone(),
        components.sessions.clone(),
        prefix,
    )
    .with_retry_policy(completion.retry_policy())
    .with_thinking_message(base.thinking_message.clone())
    .with_streaming(
        completion.use_streaming,
        Duration::from_secs(base.telegram_edit_interval_secs),
    );

    HandlerChain::new()
        .add_handler(Arc::new(command))
        .add_handler(Arc::new(access))
        .add_handler(Arc::new(completion_handler))
}
