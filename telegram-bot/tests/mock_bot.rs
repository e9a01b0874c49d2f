//! Recording [`Bot`] and config helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use completion_client::CompletionApi;
use telegram_bot::{
    BaseConfig, Bot, BotConfig, Chat, CompletionSettings, Message, Result, User,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCall {
    Send { chat_id: i64, text: String },
    Reply { chat_id: i64, reply_to: String, text: String },
    SendMarkdown { chat_id: i64, text: String },
    Edit { message_id: String, text: String },
    EditMarkdown { message_id: String, text: String },
    Delete { message_id: String },
    Typing { chat_id: i64 },
}

/// Records every outbound call; placeholder ids count up from 100.
#[derive(Default)]
pub struct RecordingBot {
    calls: Mutex<Vec<BotCall>>,
    next_id: AtomicU64,
}

impl RecordingBot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BotCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Texts of plain `send_message` calls, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                BotCall::Send { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn next_message_id(&self) -> String {
        (100 + self.next_id.fetch_add(1, Ordering::SeqCst)).to_string()
    }

    fn record(&self, call: BotCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Bot for RecordingBot {
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()> {
        self.record(BotCall::Send {
            chat_id: chat.id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_message_and_return_id(&self, chat: &Chat, text: &str) -> Result<String> {
        self.send_message(chat, text).await?;
        Ok(self.next_message_id())
    }

    async fn reply_and_return_id(&self, message: &Message, text: &str) -> Result<String> {
        self.record(BotCall::Reply {
            chat_id: message.chat.id,
            reply_to: message.id.clone(),
            text: text.to_string(),
        });
        Ok(self.next_message_id())
    }

    async fn edit_message(&self, _chat: &Chat, message_id: &str, text: &str) -> Result<()> {
        self.record(BotCall::Edit {
            message_id: message_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn edit_markdown(&self, _chat: &Chat, message_id: &str, text: &str) -> Result<()> {
        self.record(BotCall::EditMarkdown {
            message_id: message_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_markdown(&self, chat: &Chat, text: &str) -> Result<()> {
        self.record(BotCall::SendMarkdown {
            chat_id: chat.id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, _chat: &Chat, message_id: &str) -> Result<()> {
        self.record(BotCall::Delete {
            message_id: message_id.to_string(),
        });
        Ok(())
    }

    async fn send_typing(&self, chat: &Chat) -> Result<()> {
        self.record(BotCall::Typing { chat_id: chat.id });
        Ok(())
    }
}

pub fn user(id: i64) -> User {
    User {
        id,
        username: Some(format!("user{}", id)),
        first_name: Some("Test".to_string()),
        last_name: None,
    }
}

pub fn private_message(chat_id: i64, text: &str) -> Message {
    Message::incoming("1", user(chat_id), Chat::private(chat_id), text)
}

pub fn group_message(chat_id: i64, text: &str) -> Message {
    Message::incoming("1", user(7), Chat::group(chat_id), text)
}

/// Config pointing at `base_url`, without streaming, retries or delays.
pub fn test_config(base_url: &str) -> BotConfig {
    BotConfig {
        base: BaseConfig {
            bot_token: "123456:test".to_string(),
            telegram_api_url: None,
            telegram_edit_interval_secs: 0,
            log_file: "logs/test.log".to_string(),
            group_name: None,
            allowed_users: None,
            thinking_message: "🤔Please wait...".to_string(),
        },
        completion: CompletionSettings {
            api_key: "sk-test-key-1234567890".to_string(),
            base_url: base_url.to_string(),
            api: CompletionApi::Completions,
            model: "text-davinci-003".to_string(),
            temperature: 0.7,
            max_model_tokens: 4096,
            max_response_tokens: 1000,
            use_streaming: false,
            request_timeout_ms: 5_000,
            retry_max_attempts: 1,
            retry_delays_ms: vec![0],
            retry_fallback_delay_ms: 0,
        },
    }
}
