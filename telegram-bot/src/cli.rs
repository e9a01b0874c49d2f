//! CLI parser and config loading.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use completion_client::mask_token;

use crate::config::BotConfig;

#[derive(Parser)]
#[command(name = "gpt-telegram-bot")]
#[command(about = "Telegram bot backed by an OpenAI-compatible completion API", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the Telegram bot (config from env; token can override BOT_TOKEN).
    Run {
        #[arg(short, long)]
        token: Option<String>,
    },
    /// Load and validate the configuration, print a summary with secrets masked, and exit.
    CheckConfig {
        #[arg(short, long)]
        token: Option<String>,
    },
    /// Ask for the token, API key and optional settings, and write them to a .env file.
    Init {
        #[arg(short, long, default_value = ".env")]
        path: PathBuf,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Load BotConfig from environment. If `token` is provided it overrides BOT_TOKEN.
pub fn load_config(token: Option<String>) -> Result<BotConfig> {
    BotConfig::load(token)
}

/// Human-readable config summary; tokens and keys are masked.
pub fn config_summary(config: &BotConfig) -> String {
    let base = config.base();
    let completion = config.completion();
    let allowed = match &base.allowed_users {
        Some(ids) => format!("{} chat(s)", ids.len()),
        None => "everyone".to_string(),
    };
    let timeout = match completion.request_timeout() {
        Some(t) => format!("{} ms", t.as_millis()),
        None => "none".to_string(),
    };
    [
        format!("BOT_TOKEN            {}", mask_token(&base.bot_token)),
        format!(
            "TELEGRAM_API_URL     {}",
            base.telegram_api_url.as_deref().unwrap_or("(default)")
        ),
        format!("OPENAI_API_KEY       {}", mask_token(&completion.api_key)),
        format!("OPENAI_BASE_URL      {}", completion.base_url),
        format!("COMPLETION_API       {:?}", completion.api),
        format!("MODEL                {}", completion.model),
        format!(
            "TOKENS               model {} / response {}",
            completion.max_model_tokens, completion.max_response_tokens
        ),
        format!("USE_STREAMING        {}", completion.use_streaming),
        format!("REQUEST_TIMEOUT      {}", timeout),
        format!(
            "RETRY                {} attempt(s), delays {:?} ms, fallback {} ms",
            completion.retry_max_attempts,
            completion.retry_delays_ms,
            completion.retry_fallback_delay_ms
        ),
        format!("GROUP PREFIX         {}", base.prefix()),
        format!("ALLOWED_USERS        {}", allowed),
        format!("LOG_FILE             {}", base.log_file),
    ]
    .join("\n")
}
