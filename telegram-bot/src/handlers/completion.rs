//! Completion handler: sends the user's text to the completion API and renders the reply in
//! place of a "thinking" placeholder.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use completion_client::{CompletionClient, CompletionResult, ProgressCallback, SendOptions};
use message_store::new_message_id;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::config::DEFAULT_THINKING_MESSAGE;
use crate::core::{Bot, Chat, Handler, HandlerError, HandlerResponse, Message, Result};
use crate::handlers::CommandPrefix;
use crate::markdown::{split_markdown, to_markdown_v2, TELEGRAM_MESSAGE_MAX_LENGTH};
use crate::retry::{with_retry, RetryPolicy};
use crate::session::{Session, SessionStore};

pub const MSG_EMPTY_REPLY: &str = "🤷 The AI returned an empty reply.";

fn log_error_chain(e: &(dyn std::error::Error + 'static), first_msg: &str) {
    error!(cause = %e, "{}", first_msg);
    let mut source = e.source();
    while let Some(cause) = source {
        error!(cause = %cause, "Caused by");
        source = cause.source();
    }
}

/// Forwards every message that reaches it to the completion API and answers with the reply.
///
/// **External interactions:** Bot (placeholder, typing, edits, chunks), SessionStore (parent
/// id per chat), CompletionClient (prompt, HTTP, message store).
pub struct CompletionHandler {
    bot: Arc<dyn Bot>,
    client: CompletionClient,
    sessions: Arc<dyn SessionStore>,
    prefix: CommandPrefix,
    retry: RetryPolicy,
    thinking_message: String,
    use_streaming: bool,
    /// Min interval between placeholder edits while streaming.
    edit_interval: Duration,
}

impl CompletionHandler {
    pub fn new(
        bot: Arc<dyn Bot>,
        client: CompletionClient,
        sessions: Arc<dyn SessionStore>,
        prefix: CommandPrefix,
    ) -> Self {
        Self {
            bot,
            client,
            sessions,
            prefix,
            retry: RetryPolicy::default(),
            thinking_message: DEFAULT_THINKING_MESSAGE.to_string(),
            use_streaming: false,
            edit_interval: Duration::from_secs(5),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_thinking_message(mut self, thinking_message: impl Into<String>) -> Self {
        self.thinking_message = thinking_message.into();
        self
    }

    /// Streams the reply into the placeholder, editing it at most once per `edit_interval`.
    pub fn with_streaming(mut self, use_streaming: bool, edit_interval: Duration) -> Self {
        self.use_streaming = use_streaming;
        self.edit_interval = edit_interval;
        self
    }

    /// Replaces the placeholder with the reply rendered as MarkdownV2, or sends it in chunks
    /// when it does not fit one Telegram message.
    async fn render_reply(&self, chat: &Chat, placeholder_id: &str, text: &str) -> Result<()> {
        let text = if text.trim().is_empty() {
            MSG_EMPTY_REPLY
        } else {
            text
        };
        let rendered = to_markdown_v2(text);

        if rendered.chars().count() <= TELEGRAM_MESSAGE_MAX_LENGTH {
            if let Err(e) = self.bot.edit_markdown(chat, placeholder_id, &rendered).await {
                warn!(error = %e, "MarkdownV2 edit rejected; falling back to plain text");
                self.bot.edit_message(chat, placeholder_id, text).await?;
            }
            return Ok(());
        }

        if let Err(e) = self.bot.delete_message(chat, placeholder_id).await {
            warn!(error = %e, "Failed to delete placeholder");
        }
        let chunks = split_markdown(text, TELEGRAM_MESSAGE_MAX_LENGTH);
        info!(chunk_count = chunks.len(), "step: sending long reply in chunks");
        for chunk in chunks {
            let rendered = to_markdown_v2(&chunk);
            if let Err(e) = self.bot.send_markdown(chat, &rendered).await {
                warn!(error = %e, "MarkdownV2 chunk rejected; sending plain text");
                self.bot.send_message(chat, &chunk).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Handler for CompletionHandler {
    #[instrument(skip(self, message), fields(chat_id = message.chat.id, message_id = %message.id))]
    async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        let Some(text) = self.prefix.strip(message) else {
            return Ok(HandlerResponse::Continue);
        };
        let chat = &message.chat;

        debug!("step: sending placeholder");
        let placeholder_id = self
            .bot
            .reply_and_return_id(message, &self.thinking_message)
            .await?;
        if let Err(e) = self.bot.send_typing(chat).await {
            warn!(error = %e, "Failed to send typing action");
        }

        let session = self
            .sessions
            .get(chat.id)
            .await
            .map_err(|e| HandlerError::Session(e.to_string()))?;
        // Same id on every attempt: a retry overwrites the stored user turn.
        let user_message_id = new_message_id();

        let editor = self.use_streaming.then(|| {
            ProgressEditor::spawn(
                self.bot.clone(),
                chat.clone(),
                placeholder_id.clone(),
                self.edit_interval,
            )
        });

        let client = &self.client;
        let session_ref = &session;
        let user_message_id = user_message_id.as_str();
        let on_progress = editor.as_ref().map(ProgressEditor::callback);
        let use_streaming = self.use_streaming;

        info!(parent_message_id = ?session.parent_message_id, "step: requesting completion");
        let outcome = with_retry(self.bot.as_ref(), chat, &self.retry, "completion", move || {
            let options = SendOptions {
                conversation_id: session_ref.conversation_id.clone(),
                parent_message_id: session_ref.parent_message_id.clone(),
                message_id: Some(user_message_id.to_string()),
                stream: Some(use_streaming),
                on_progress: on_progress.clone(),
                ..Default::default()
            };
            client.send_message(text, options)
        })
        .await;

        if let Some(editor) = editor {
            editor.stop().await;
        }

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                log_error_chain(&e, "Completion failed");
                if let Err(e) = self.bot.delete_message(chat, &placeholder_id).await {
                    warn!(error = %e, "Failed to delete placeholder");
                }
                return Ok(HandlerResponse::Stop);
            }
        };

        self.sessions
            .set(
                chat.id,
                Session {
                    conversation_id: Some(result.conversation_id.clone()),
                    parent_message_id: Some(result.id.clone()),
                },
            )
            .await
            .map_err(|e| HandlerError::Session(e.to_string()))?;

        info!(reply_id = %result.id, reply_len = result.text.len(), "step: rendering reply");
        self.render_reply(chat, &placeholder_id, &result.text).await?;
        Ok(HandlerResponse::Reply(result.text))
    }
}

/// Background task that mirrors the partial reply into the placeholder while streaming.
struct ProgressEditor {
    sender: Arc<watch::Sender<String>>,
    task: JoinHandle<()>,
}

impl ProgressEditor {
    fn spawn(bot: Arc<dyn Bot>, chat: Chat, message_id: String, interval: Duration) -> Self {
        let (sender, mut receiver) = watch::channel(String::new());
        let task = tokio::spawn(async move {
            let mut last_sent = String::new();
            while receiver.changed().await.is_ok() {
                let text = receiver.borrow_and_update().clone();
                if text.trim().is_empty()
                    || text == last_sent
                    || text.chars().count() > TELEGRAM_MESSAGE_MAX_LENGTH
                {
                    continue;
                }
                if let Err(e) = bot.edit_message(&chat, &message_id, &text).await {
                    warn!(error = %e, "Failed to edit placeholder with partial reply");
                }
                last_sent = text;
                if !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
            }
        });
        Self {
            sender: Arc::new(sender),
            task,
        }
    }

    fn callback(&self) -> ProgressCallback {
        let sender = self.sender.clone();
        Arc::new(move |partial: &CompletionResult| {
            sender.send_replace(partial.text.clone());
        })
    }

    async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}
