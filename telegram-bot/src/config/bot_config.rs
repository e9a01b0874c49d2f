//! BotConfig: BaseConfig + CompletionSettings. Use load() for env-based loading.

use anyhow::Result;

use super::{BaseConfig, CompletionSettings};

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub base: BaseConfig,
    pub completion: CompletionSettings,
}

impl BotConfig {
    /// Load full config from environment variables. If `token` is provided it overrides BOT_TOKEN.
    /// Call validate() after load to check config before init.
    pub fn load(token: Option<String>) -> Result<Self> {
        let base = BaseConfig::load(token)?;
        let completion = CompletionSettings::load()?;
        Ok(Self { base, completion })
    }

    /// Fails fast on values that would only break at the first message.
    pub fn validate(&self) -> Result<()> {
        self.base.validate()?;
        self.completion.validate()
    }

    pub fn base(&self) -> &BaseConfig {
        &self.base
    }
    pub fn completion(&self) -> &CompletionSettings {
        &self.completion
    }

    pub fn bot_token(&self) -> &str {
        &self.base.bot_token
    }
    pub fn log_file(&self) -> &str {
        &self.base.log_file
    }
    pub fn telegram_api_url(&self) -> Option<&str> {
        self.base.telegram_api_url.as_deref()
    }
    pub fn telegram_edit_interval_secs(&self) -> u64 {
        self.base.telegram_edit_interval_secs
    }
}
