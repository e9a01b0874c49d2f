//! Per-call options, results and wire shapes.

use std::sync::Arc;
use std::time::Duration;

use message_store::{MessageId, Role};
use prompt::ChatMessage;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::CompletionError;

/// Called with the accumulated reply after every streamed chunk.
pub type ProgressCallback = Arc<dyn Fn(&CompletionResult) + Send + Sync>;

/// The assistant reply of one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub id: MessageId,
    pub role: Role,
    /// Id of the user message this reply answers.
    pub parent_message_id: MessageId,
    pub conversation_id: String,
    pub text: String,
}

/// Item of a [`crate::CompletionStream`].
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionEvent {
    /// Accumulated text so far; not trimmed.
    Progress(CompletionResult),
    /// Final reply, trimmed and stored.
    Done(CompletionResult),
}

#[derive(Clone, Default)]
pub struct SendOptions {
    /// Defaults to a fresh id (new conversation).
    pub conversation_id: Option<String>,
    pub parent_message_id: Option<MessageId>,
    /// Id for the stored user message; defaults to a fresh id.
    pub message_id: Option<MessageId>,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
    /// Defaults to `true` iff `on_progress` is set.
    pub stream: Option<bool>,
    pub on_progress: Option<ProgressCallback>,
    pub prompt_prefix: Option<String>,
    pub prompt_suffix: Option<String>,
}

impl SendOptions {
    pub fn streaming(&self) -> bool {
        self.stream.unwrap_or(self.on_progress.is_some())
    }
}

impl std::fmt::Debug for SendOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendOptions")
            .field("conversation_id", &self.conversation_id)
            .field("parent_message_id", &self.parent_message_id)
            .field("message_id", &self.message_id)
            .field("timeout", &self.timeout)
            .field("stream", &self.stream)
            .field("on_progress", &self.on_progress.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CompletionRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ChatMessage>>,
    pub max_tokens: usize,
    pub temperature: f32,
    pub presence_penalty: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    message: Option<ChoiceContent>,
    #[serde(default)]
    delta: Option<ChoiceContent>,
}

#[derive(Debug, Deserialize)]
struct ChoiceContent {
    #[serde(default)]
    content: Option<String>,
}

impl Choice {
    /// `text` for completions, `message`/`delta` content for chat.
    pub fn content(&self) -> &str {
        self.text
            .as_deref()
            .or_else(|| self.message.as_ref().and_then(|m| m.content.as_deref()))
            .or_else(|| self.delta.as_ref().and_then(|d| d.content.as_deref()))
            .unwrap_or("")
    }
}

pub(crate) const DONE_SENTINEL: &str = "[DONE]";

pub(crate) enum StreamStep {
    Progress,
    Done,
    Skip,
}

/// Folds streamed event payloads into a [`CompletionResult`].
pub(crate) struct StreamAccumulator {
    pub result: CompletionResult,
}

impl StreamAccumulator {
    pub fn new(result: CompletionResult) -> Self {
        Self { result }
    }

    pub fn apply(&mut self, data: &str) -> Result<StreamStep, CompletionError> {
        if data.trim() == DONE_SENTINEL {
            self.finish();
            return Ok(StreamStep::Done);
        }
        let chunk: CompletionResponse =
            serde_json::from_str(data).map_err(|source| CompletionError::StreamParse {
                payload: data.to_string(),
                source,
            })?;
        match (chunk.id, chunk.choices.first()) {
            (Some(id), Some(choice)) => {
                self.result.id = id;
                self.result.text.push_str(choice.content());
                Ok(StreamStep::Progress)
            }
            _ => Ok(StreamStep::Skip),
        }
    }

    pub fn finish(&mut self) {
        self.result.text = self.result.text.trim().to_string();
    }
}
