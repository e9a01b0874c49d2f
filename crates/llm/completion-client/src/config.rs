//! Client configuration.

use std::time::Duration;

use prompt::{PromptBuilderConfig, END_OF_TURN};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "text-chat-davinci-002-20221122";

/// Which endpoint shape to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionApi {
    /// `POST /v1/completions` with a flat `prompt` string.
    #[default]
    Completions,
    /// `POST /v1/chat/completions` with a `messages` array.
    Chat,
}

impl CompletionApi {
    pub fn path(self) -> &'static str {
        match self {
            CompletionApi::Completions => "/v1/completions",
            CompletionApi::Chat => "/v1/chat/completions",
        }
    }
}

impl std::str::FromStr for CompletionApi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "completions" | "completion" => Ok(CompletionApi::Completions),
            "chat" | "chat_completions" => Ok(CompletionApi::Chat),
            other => Err(format!("unknown completion api: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    /// Origin of the API; `/v1/...` is appended. A trailing `/v1` is tolerated.
    pub base_url: String,
    pub api: CompletionApi,
    pub model: String,
    pub temperature: f32,
    pub presence_penalty: f32,
    pub stop: Vec<String>,
    pub prompt: PromptBuilderConfig,
    /// Applied when a call does not set its own timeout.
    pub default_timeout: Option<Duration>,
}

impl CompletionConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api: CompletionApi::default(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            presence_penalty: 0.6,
            stop: vec![END_OF_TURN.to_string()],
            prompt: PromptBuilderConfig::default(),
            default_timeout: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api(mut self, api: CompletionApi) -> Self {
        self.api = api;
        self
    }

    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let base = base.strip_suffix("/v1").unwrap_or(base);
        format!("{}{}", base, self.api.path())
    }
}
