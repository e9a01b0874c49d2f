//! Base config: Telegram connection, chat policy and logging. Loaded from env.

use std::collections::HashSet;
use std::env;

use anyhow::{Context, Result};

pub const DEFAULT_PREFIX: &str = "/gpt";
pub const DEFAULT_THINKING_MESSAGE: &str = "🤔Please wait...";
pub const DEFAULT_LOG_FILE: &str = "logs/gpt-telegram-bot.log";

#[derive(Debug, Clone)]
pub struct BaseConfig {
    /// BOT_TOKEN
    pub bot_token: String,
    /// TELEGRAM_API_URL or TELOXIDE_API_URL
    pub telegram_api_url: Option<String>,
    /// Min interval (sec) between placeholder edits when streaming; limits Telegram API rate
    pub telegram_edit_interval_secs: u64,
    /// LOG_FILE
    pub log_file: String,
    /// GROUP_NAME; group messages must start with `/{group_name}` (default `/gpt`)
    pub group_name: Option<String>,
    /// ALLOWED_USERS; `None` allows every chat
    pub allowed_users: Option<HashSet<i64>>,
    /// THINKING_MESSAGE; placeholder shown while the reply is generated
    pub thinking_message: String,
}

impl BaseConfig {
    /// Load from environment variables. `token` overrides BOT_TOKEN if provided.
    pub fn load(token: Option<String>) -> Result<Self> {
        let bot_token = match token {
            Some(t) => t,
            None => env::var("BOT_TOKEN").context("BOT_TOKEN not set")?,
        };
        let telegram_api_url = env::var("TELEGRAM_API_URL")
            .or_else(|_| env::var("TELOXIDE_API_URL"))
            .ok();
        let telegram_edit_interval_secs = env::var("TELEGRAM_EDIT_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
        let group_name = env::var("GROUP_NAME")
            .ok()
            .map(|s| s.trim().trim_start_matches('/').to_string())
            .filter(|s| !s.is_empty());
        let allowed_users = match env::var("ALLOWED_USERS") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_allowed_users(&raw)?),
            _ => None,
        };
        let thinking_message = env::var("THINKING_MESSAGE")
            .unwrap_or_else(|_| DEFAULT_THINKING_MESSAGE.to_string());

        Ok(Self {
            bot_token,
            telegram_api_url,
            telegram_edit_interval_secs,
            log_file,
            group_name,
            allowed_users,
            thinking_message,
        })
    }

    /// Command prefix required in group chats.
    pub fn prefix(&self) -> String {
        match &self.group_name {
            Some(name) => format!("/{}", name),
            None => DEFAULT_PREFIX.to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            anyhow::bail!("BOT_TOKEN is empty");
        }
        if let Some(ref url_str) = self.telegram_api_url {
            if reqwest::Url::parse(url_str).is_err() {
                anyhow::bail!(
                    "TELEGRAM_API_URL (or TELOXIDE_API_URL) is set but not a valid URL: {}",
                    url_str
                );
            }
        }
        Ok(())
    }
}

/// Parses ALLOWED_USERS: a JSON object keyed by chat id (`{"123": true}`) or a JSON array of
/// ids (`[123, "-456"]`).
pub fn parse_allowed_users(raw: &str) -> Result<HashSet<i64>> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("ALLOWED_USERS is not valid JSON")?;

    let parse_id = |s: &str| -> Result<i64> {
        s.trim()
            .parse::<i64>()
            .with_context(|| format!("ALLOWED_USERS contains a non-numeric chat id: {}", s))
    };

    match value {
        serde_json::Value::Object(map) => map.keys().map(|k| parse_id(k)).collect(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::Number(n) => n
                    .as_i64()
                    .with_context(|| format!("ALLOWED_USERS contains a non-integer id: {}", n)),
                serde_json::Value::String(s) => parse_id(s),
                other => anyhow::bail!("ALLOWED_USERS contains an unsupported entry: {}", other),
            })
            .collect(),
        _ => anyhow::bail!("ALLOWED_USERS must be a JSON object or array"),
    }
}
