//! Completion endpoint, model and retry settings. Loaded from env.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use completion_client::{CompletionApi, CompletionConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use prompt::PromptBuilderConfig;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct CompletionSettings {
    /// OPENAI_API_KEY
    pub api_key: String,
    /// OPENAI_BASE_URL
    pub base_url: String,
    /// COMPLETION_API: `completions` | `chat`
    pub api: CompletionApi,
    /// MODEL
    pub model: String,
    /// MODEL_TEMPERATURE
    pub temperature: f32,
    /// MAX_MODEL_TOKENS
    pub max_model_tokens: usize,
    /// MAX_RESPONSE_TOKENS
    pub max_response_tokens: usize,
    /// USE_STREAMING
    pub use_streaming: bool,
    /// REQUEST_TIMEOUT_MS; 0 disables the timeout
    pub request_timeout_ms: u64,
    /// RETRY_MAX_ATTEMPTS
    pub retry_max_attempts: u32,
    /// RETRY_DELAYS_MS, comma separated
    pub retry_delays_ms: Vec<u64>,
    /// RETRY_FALLBACK_DELAY_MS
    pub retry_fallback_delay_ms: u64,
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        _ => Ok(default),
    }
}

fn parse_delays(raw: &str) -> Result<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .with_context(|| format!("RETRY_DELAYS_MS has an invalid entry: {}", s))
        })
        .collect()
}

impl CompletionSettings {
    pub fn load() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?;
        let base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let api = env_parse("COMPLETION_API", CompletionApi::Completions)?;
        let model = env::var("MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let temperature = env_parse("MODEL_TEMPERATURE", 0.7f32)?;
        let max_model_tokens = env_parse("MAX_MODEL_TOKENS", 4096usize)?;
        let max_response_tokens = env_parse("MAX_RESPONSE_TOKENS", 1000usize)?;
        let use_streaming = env_parse("USE_STREAMING", false)?;
        let request_timeout_ms = env_parse("REQUEST_TIMEOUT_MS", 120_000u64)?;
        let retry_max_attempts = env_parse("RETRY_MAX_ATTEMPTS", 3u32)?;
        let retry_delays_ms = match env::var("RETRY_DELAYS_MS") {
            Ok(raw) if !raw.trim().is_empty() => parse_delays(&raw)?,
            _ => vec![1000, 2000, 5000],
        };
        let retry_fallback_delay_ms = env_parse("RETRY_FALLBACK_DELAY_MS", 10_000u64)?;

        Ok(Self {
            api_key,
            base_url,
            api,
            model,
            temperature,
            max_model_tokens,
            max_response_tokens,
            use_streaming,
            request_timeout_ms,
            retry_max_attempts,
            retry_delays_ms,
            retry_fallback_delay_ms,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            anyhow::bail!("OPENAI_API_KEY is empty");
        }
        if reqwest::Url::parse(&self.base_url).is_err() {
            anyhow::bail!("OPENAI_BASE_URL is not a valid URL: {}", self.base_url);
        }
        if self.retry_max_attempts == 0 {
            anyhow::bail!("RETRY_MAX_ATTEMPTS must be at least 1");
        }
        if self.max_response_tokens >= self.max_model_tokens {
            anyhow::bail!(
                "MAX_RESPONSE_TOKENS ({}) must be below MAX_MODEL_TOKENS ({})",
                self.max_response_tokens,
                self.max_model_tokens
            );
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    /// Client config: endpoint and model from env, remaining parameters at their defaults.
    pub fn client_config(&self) -> CompletionConfig {
        let mut config = CompletionConfig::new(self.api_key.clone())
            .with_base_url(self.base_url.clone())
            .with_api(self.api);
        config.model = self.model.clone();
        config.temperature = self.temperature;
        config.prompt = PromptBuilderConfig {
            max_model_tokens: self.max_model_tokens,
            max_response_tokens: self.max_response_tokens,
            ..Default::default()
        };
        config.default_timeout = self.request_timeout();
        config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            delays: self
                .retry_delays_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            fallback_delay: Duration::from_millis(self.retry_fallback_delay_ms),
        }
    }
}
