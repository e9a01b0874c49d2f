//! HTTP client for `/v1/completions` and `/v1/chat/completions`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use message_store::{new_message_id, Message, MessageLookup, MessageStore, Role};
use prompt::{BuiltPrompt, PromptBuilder, PromptOptions, TokenCounter};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::{CompletionApi, CompletionConfig};
use crate::error::CompletionError;
use crate::mask_token;
use crate::sse::SseParser;
use crate::stream::CompletionStream;
use crate::types::{
    CompletionEvent, CompletionRequest, CompletionResponse, CompletionResult, SendOptions,
    StreamAccumulator, StreamStep,
};

const EVENT_BUFFER: usize = 32;

/// Exposes a shared [`MessageStore`] to the prompt builder as a plain lookup.
struct StoreLookup(Arc<dyn MessageStore>);

#[async_trait]
impl MessageLookup for StoreLookup {
    async fn get(&self, id: &str) -> Result<Option<Message>, anyhow::Error> {
        self.0.get(id).await
    }
}

/// Request body plus the reply skeleton, after the user turn is stored.
struct Prepared {
    request: CompletionRequest,
    result: CompletionResult,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    config: Arc<CompletionConfig>,
    store: Arc<dyn MessageStore>,
    prompt_builder: PromptBuilder,
}

impl CompletionClient {
    pub fn new(
        config: CompletionConfig,
        store: Arc<dyn MessageStore>,
        counter: Arc<dyn TokenCounter>,
    ) -> Result<Self, CompletionError> {
        Self::with_http_client(reqwest::Client::new(), config, store, counter)
    }

    /// Same as [`CompletionClient::new`] with a caller-provided `reqwest::Client`
    /// (proxies, custom TLS, connection pools shared with other code).
    pub fn with_http_client(
        http: reqwest::Client,
        config: CompletionConfig,
        store: Arc<dyn MessageStore>,
        counter: Arc<dyn TokenCounter>,
    ) -> Result<Self, CompletionError> {
        if config.api_key.trim().is_empty() {
            return Err(CompletionError::Authentication(
                "API key is missing".to_string(),
            ));
        }
        info!(
            endpoint = %config.endpoint(),
            model = %config.model,
            api_key = %mask_token(&config.api_key),
            "Completion client created"
        );
        let prompt_builder = PromptBuilder::new(
            config.prompt.clone(),
            counter,
            Arc::new(StoreLookup(store.clone())),
        );
        Ok(Self {
            http,
            config: Arc::new(config),
            store,
            prompt_builder,
        })
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    /// Sends `text` as a new user turn and returns the assistant reply.
    ///
    /// Streams when `options.stream` (or, when unset, `options.on_progress`) asks for it;
    /// `on_progress` then sees the accumulated text after every chunk. The user message is
    /// stored before the request; the reply is stored only on success.
    #[instrument(skip(self, text, options), fields(conversation_id = ?options.conversation_id, stream = options.streaming()))]
    pub async fn send_message(
        &self,
        text: &str,
        options: SendOptions,
    ) -> Result<CompletionResult, CompletionError> {
        if options.streaming() {
            let on_progress = options.on_progress.clone();
            let mut events = self.stream_message(text, options).await?;
            while let Some(event) = events.next().await {
                match event? {
                    CompletionEvent::Progress(partial) => {
                        if let Some(callback) = &on_progress {
                            callback(&partial);
                        }
                    }
                    CompletionEvent::Done(result) => return Ok(result),
                }
            }
            return Err(CompletionError::InvalidResponse(
                "stream closed without a result".to_string(),
            ));
        }

        let Prepared {
            request,
            result,
            timeout,
            cancel,
        } = self.prepare(text, &options, false).await?;
        with_deadline(timeout, cancel, self.complete(request, result)).await
    }

    /// Streams the reply to `text` as [`CompletionEvent`]s.
    ///
    /// The user message is stored and the prompt built before this returns; the HTTP request
    /// runs in the background and is aborted when the returned stream is dropped.
    #[instrument(skip(self, text, options), fields(conversation_id = ?options.conversation_id))]
    pub async fn stream_message(
        &self,
        text: &str,
        options: SendOptions,
    ) -> Result<CompletionStream, CompletionError> {
        let Prepared {
            request,
            result,
            timeout,
            cancel,
        } = self.prepare(text, &options, true).await?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let client = self.clone();
        let task = tokio::spawn(async move {
            let outcome = with_deadline(
                timeout,
                cancel,
                client.stream_completion(request, result, tx.clone()),
            )
            .await;
            let last = outcome.map(CompletionEvent::Done);
            let _ = tx.send(last).await;
        });
        Ok(CompletionStream::new(rx, task))
    }

    async fn prepare(
        &self,
        text: &str,
        options: &SendOptions,
        stream: bool,
    ) -> Result<Prepared, CompletionError> {
        let conversation_id = options
            .conversation_id
            .clone()
            .unwrap_or_else(new_message_id);
        let message_id = options.message_id.clone().unwrap_or_else(new_message_id);

        debug!(message_id = %message_id, "step: storing user message");
        self.store
            .put(Message::user(
                message_id.clone(),
                text,
                options.parent_message_id.clone(),
                conversation_id.clone(),
            ))
            .await
            .map_err(CompletionError::Store)?;

        let prompt = self
            .prompt_builder
            .build(
                text,
                &PromptOptions {
                    parent_message_id: options.parent_message_id.clone(),
                    prompt_prefix: options.prompt_prefix.clone(),
                    prompt_suffix: options.prompt_suffix.clone(),
                },
            )
            .await
            .map_err(CompletionError::Store)?;
        debug!(
            num_tokens = prompt.num_tokens,
            max_tokens = prompt.max_tokens,
            "step: prompt built"
        );

        Ok(Prepared {
            request: self.request_body(prompt, stream),
            result: CompletionResult {
                id: new_message_id(),
                role: Role::Assistant,
                parent_message_id: message_id,
                conversation_id,
                text: String::new(),
            },
            timeout: options.timeout.or(self.config.default_timeout),
            cancel: options.cancel.clone(),
        })
    }

    fn request_body(&self, prompt: BuiltPrompt, stream: bool) -> CompletionRequest {
        let (prompt_text, messages) = match self.config.api {
            CompletionApi::Completions => (Some(prompt.text), None),
            CompletionApi::Chat => (None, Some(prompt.messages)),
        };
        CompletionRequest {
            model: self.config.model.clone(),
            prompt: prompt_text,
            messages,
            max_tokens: prompt.max_tokens,
            temperature: self.config.temperature,
            presence_penalty: self.config.presence_penalty,
            stop: self.config.stop.clone(),
            stream,
        }
    }

    async fn post(&self, request: &CompletionRequest) -> Result<reqwest::Response, CompletionError> {
        let url = self.config.endpoint();
        if let Ok(body) = serde_json::to_string(request) {
            debug!(url = %url, request = %body, "step: sending completion request");
        }

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Completion endpoint returned error status");
            return Err(CompletionError::Http {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }
        Ok(response)
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        mut result: CompletionResult,
    ) -> Result<CompletionResult, CompletionError> {
        let response = self.post(&request).await?;
        let body = response.text().await?;
        let parsed: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| CompletionError::InvalidResponse(format!("{e}: {body}")))?;
        let Some(choice) = parsed.choices.first() else {
            return Err(CompletionError::InvalidResponse(
                "response has no choices".to_string(),
            ));
        };
        result.text = choice.content().trim().to_string();
        if let Some(id) = parsed.id {
            result.id = id;
        }

        self.persist_reply(&result).await?;
        Ok(result)
    }

    async fn stream_completion(
        &self,
        request: CompletionRequest,
        result: CompletionResult,
        events: mpsc::Sender<Result<CompletionEvent, CompletionError>>,
    ) -> Result<CompletionResult, CompletionError> {
        let response = self.post(&request).await?;
        let mut parser = SseParser::new();
        let mut acc = StreamAccumulator::new(result);
        let mut bytes = response.bytes_stream();

        let mut done = false;
        let mut ended = false;
        while !done && !ended {
            let batch = match bytes.next().await {
                Some(chunk) => parser.feed(&chunk?),
                None => {
                    ended = true;
                    parser.finish().into_iter().collect()
                }
            };
            for data in batch {
                match acc.apply(&data)? {
                    StreamStep::Progress => {
                        let partial = CompletionEvent::Progress(acc.result.clone());
                        if events.send(Ok(partial)).await.is_err() {
                            return Err(CompletionError::Cancelled);
                        }
                    }
                    StreamStep::Done => {
                        done = true;
                        break;
                    }
                    StreamStep::Skip => {}
                }
            }
        }

        if !done {
            warn!(
                text_len = acc.result.text.len(),
                "Stream ended without [DONE]; using accumulated text"
            );
            acc.finish();
        }

        self.persist_reply(&acc.result).await?;
        Ok(acc.result)
    }

    async fn persist_reply(&self, result: &CompletionResult) -> Result<(), CompletionError> {
        debug!(id = %result.id, "step: storing assistant message");
        self.store
            .put(Message::assistant(
                result.id.clone(),
                result.text.clone(),
                Some(result.parent_message_id.clone()),
                result.conversation_id.clone(),
            ))
            .await
            .map_err(CompletionError::Store)
    }
}

/// Runs `work` until it finishes, `timeout` elapses or `cancel` fires, whichever is first.
/// `work` is dropped on timeout or cancellation, so nothing after its last await point runs.
async fn with_deadline<T, F>(
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
    work: F,
) -> Result<T, CompletionError>
where
    F: Future<Output = Result<T, CompletionError>>,
{
    let cancel = cancel.unwrap_or_else(CancellationToken::new);
    let expired = async move {
        match timeout {
            Some(limit) => {
                tokio::time::sleep(limit).await;
                limit
            }
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = work => result,
        _ = cancel.cancelled() => {
            warn!("Completion cancelled by caller");
            Err(CompletionError::Cancelled)
        }
        limit = expired => {
            warn!(timeout_ms = limit.as_millis() as u64, "Completion timed out");
            Err(CompletionError::Timeout(limit))
        }
    }
}
