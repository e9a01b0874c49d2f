//! Main entry: validate config, init logging, build components, then run the REPL.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, instrument};

use crate::chain::HandlerChain;
use crate::components::{build_bot_components, build_handler_chain, create_teloxide_bot};
use crate::config::BotConfig;
use crate::core::{init_tracing, Bot};
use crate::queue::ChatQueues;
use crate::telegram::{run_repl, TelegramBotAdapter};

/// Runs the bot until the REPL stops.
#[instrument(skip(config))]
pub async fn run_bot(config: BotConfig) -> Result<()> {
    config.validate()?;
    init_tracing(config.log_file())?;

    info!(
        prefix = %config.base().prefix(),
        model = %config.completion().model,
        streaming = config.completion().use_streaming,
        allow_list = config.base().allowed_users.is_some(),
        "Initializing bot"
    );

    let teloxide_bot = create_teloxide_bot(&config);
    let bot: Arc<dyn Bot> = Arc::new(TelegramBotAdapter::new(teloxide_bot.clone()));
    let chain = build_chain(&config, bot.clone())?;
    let queues = ChatQueues::new(chain, bot);

    info!("Bot started successfully");
    run_repl(teloxide_bot, queues).await
}

/// Builds the handler chain around `bot` without starting the REPL. Used by integration tests
/// that inject a mock bot and drive the chain with fake messages.
pub fn build_chain(config: &BotConfig, bot: Arc<dyn Bot>) -> Result<HandlerChain> {
    let components = build_bot_components(config, bot)?;
    Ok(build_handler_chain(config, &components))
}
