//! Prompt builder: the longest suffix of a conversation chain that fits the token budget.

use std::collections::HashSet;
use std::sync::Arc;

use message_store::{MessageId, MessageLookup, Role, DEFAULT_CAPACITY};
use tracing::{debug, instrument, warn};

use crate::tokens::TokenCounter;
use crate::ChatMessage;

/// End-of-turn sentinel appended to every labeled turn.
pub const END_OF_TURN: &str = "<|im_end|>";
pub const USER_LABEL_DEFAULT: &str = "User";
pub const ASSISTANT_LABEL_DEFAULT: &str = "ChatGPT";

/// Upper bound on parent hops; a chain can never be longer than the store holds.
const MAX_WALK_BACK: usize = DEFAULT_CAPACITY;

/// Instruction block placed before the conversation, dated today (UTC).
pub fn default_prompt_prefix(assistant_label: &str) -> String {
    let current_date = chrono::Utc::now().format("%Y-%m-%d");
    format!(
        "You are {assistant_label}, a large language model trained by OpenAI. You answer as concisely as possible for each response (e.g. don\u{2019}t be verbose). It is very important that you answer as concisely as possible, so please remember this. If you are generating a list, do not have too many items. Keep the number of items short.\nCurrent date: {current_date}\n\n"
    )
}

/// Cue for the model to answer as the assistant.
pub fn default_prompt_suffix(assistant_label: &str) -> String {
    format!("\n\n{assistant_label}:\n")
}

/// Token limits and role labels.
#[derive(Debug, Clone)]
pub struct PromptBuilderConfig {
    pub max_model_tokens: usize,
    pub max_response_tokens: usize,
    pub user_label: String,
    pub assistant_label: String,
}

impl Default for PromptBuilderConfig {
    fn default() -> Self {
        Self {
            max_model_tokens: 4096,
            max_response_tokens: 1000,
            user_label: USER_LABEL_DEFAULT.to_string(),
            assistant_label: ASSISTANT_LABEL_DEFAULT.to_string(),
        }
    }
}

/// Per-call inputs besides the new text.
#[derive(Debug, Clone, Default)]
pub struct PromptOptions {
    pub parent_message_id: Option<MessageId>,
    pub prompt_prefix: Option<String>,
    pub prompt_suffix: Option<String>,
}

/// Result of [`PromptBuilder::build`].
#[derive(Debug, Clone)]
pub struct BuiltPrompt {
    /// `prefix + labeled turns + suffix`, for the completions endpoint.
    pub text: String,
    /// The same turns for the chat-completions endpoint: system prefix, then oldest first.
    pub messages: Vec<ChatMessage>,
    /// Token count of `text`.
    pub num_tokens: usize,
    /// `max_tokens` to request; always at least 1.
    pub max_tokens: usize,
}

/// Builds bounded prompts from a parent chain.
#[derive(Clone)]
pub struct PromptBuilder {
    config: PromptBuilderConfig,
    counter: Arc<dyn TokenCounter>,
    lookup: Arc<dyn MessageLookup>,
}

impl PromptBuilder {
    pub fn new(
        config: PromptBuilderConfig,
        counter: Arc<dyn TokenCounter>,
        lookup: Arc<dyn MessageLookup>,
    ) -> Self {
        Self {
            config,
            counter,
            lookup,
        }
    }

    pub fn config(&self) -> &PromptBuilderConfig {
        &self.config
    }

    fn label(&self, role: Role) -> &str {
        match role {
            Role::User => &self.config.user_label,
            Role::Assistant => &self.config.assistant_label,
        }
    }

    /// Returns the longest chain suffix ending in `text` that fits
    /// `max_model_tokens - max_response_tokens`.
    ///
    /// The current turn is always included, even when it alone exceeds the budget. The walk
    /// stops at the first ancestor that would not fit, at a missing parent id or message, or
    /// when an id repeats. Only lookup backend failures are errors.
    #[instrument(skip(self, text, options), fields(parent_message_id = ?options.parent_message_id))]
    pub async fn build(
        &self,
        text: &str,
        options: &PromptOptions,
    ) -> Result<BuiltPrompt, anyhow::Error> {
        let prefix = options
            .prompt_prefix
            .clone()
            .unwrap_or_else(|| default_prompt_prefix(&self.config.assistant_label));
        let suffix = options
            .prompt_suffix
            .clone()
            .unwrap_or_else(|| default_prompt_suffix(&self.config.assistant_label));
        let budget = self
            .config
            .max_model_tokens
            .saturating_sub(self.config.max_response_tokens);

        let mut body = format!("{}:\n\n{}{}", self.config.user_label, text, END_OF_TURN);
        let mut prompt = format!("{prefix}{body}{suffix}");
        let mut num_tokens = self.counter.count(&prompt);
        // newest first
        let mut turns = vec![ChatMessage::user(text)];

        if num_tokens > budget {
            warn!(num_tokens, budget, "Current turn alone exceeds prompt budget; sending it anyway");
        } else {
            let mut parent_id = options.parent_message_id.clone();
            let mut visited: HashSet<MessageId> = HashSet::new();

            while let Some(id) = parent_id.take() {
                if !visited.insert(id.clone()) {
                    warn!(id = %id, "Parent chain cycles back; stopping walk-back");
                    break;
                }
                if visited.len() > MAX_WALK_BACK {
                    warn!(hops = visited.len(), "Parent chain too long; stopping walk-back");
                    break;
                }
                let Some(parent) = self.lookup.get(&id).await? else {
                    debug!(id = %id, "Parent message not found; stopping walk-back");
                    break;
                };

                let next_body = format!(
                    "{}:\n\n{}{}\n\n{}",
                    self.label(parent.role),
                    parent.text,
                    END_OF_TURN,
                    body
                );
                let next_prompt = format!("{prefix}{next_body}{suffix}");
                let next_tokens = self.counter.count(&next_prompt);
                if next_tokens > budget {
                    debug!(next_tokens, budget, "Next ancestor would exceed budget");
                    break;
                }

                body = next_body;
                prompt = next_prompt;
                num_tokens = next_tokens;
                turns.push(ChatMessage::from(&parent));
                parent_id = parent.parent_message_id;
            }
        }

        let max_tokens = self
            .config
            .max_model_tokens
            .saturating_sub(num_tokens)
            .min(self.config.max_response_tokens)
            .max(1);

        let mut messages = Vec::with_capacity(turns.len() + 1);
        let system = prefix.trim();
        if !system.is_empty() {
            messages.push(ChatMessage::system(system));
        }
        messages.extend(turns.into_iter().rev());

        debug!(
            num_tokens,
            max_tokens,
            turn_count = messages.len(),
            "Prompt built"
        );

        Ok(BuiltPrompt {
            text: prompt,
            messages,
            num_tokens,
            max_tokens,
        })
    }
}
