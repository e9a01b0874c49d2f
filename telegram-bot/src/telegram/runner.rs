//! REPL runner: converts teloxide messages to core messages and queues them per chat.

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, info, instrument};

use super::adapters::TelegramMessageWrapper;
use crate::core::ToCoreMessage;
use crate::queue::ChatQueues;

/// Starts the long-polling REPL. Text messages are handed to `queues`; everything else is
/// ignored. Returns when the REPL stops (Ctrl+C).
#[instrument(skip(bot, queues))]
pub async fn run_repl(bot: teloxide::Bot, queues: ChatQueues) -> Result<()> {
    if let Ok(me) = bot.get_me().await {
        info!(username = ?me.user.username, "Connected to Telegram");
    }

    teloxide::repl(bot, move |_bot: Bot, msg: teloxide::types::Message| {
        let queues = queues.clone();
        async move {
            let core_msg = TelegramMessageWrapper(&msg).to_core();
            match msg.text() {
                Some(text) => {
                    info!(
                        user_id = core_msg.user.id,
                        chat_id = core_msg.chat.id,
                        message_content = %text,
                        "Received message"
                    );
                    queues.dispatch(core_msg);
                }
                None => {
                    debug!(
                        user_id = core_msg.user.id,
                        chat_id = core_msg.chat.id,
                        "Ignoring non-text message"
                    );
                }
            }
            respond(())
        }
    })
    .await;

    Ok(())
}
