//! Integration tests for `prompt::PromptBuilder`.
//!
//! Uses an in-test `MessageLookup` backed by a HashMap and `EstimateTokenCounter` (4 chars per
//! token) so budgets are easy to reason about. No network, no timing.

use async_trait::async_trait;
use message_store::{Message, MessageLookup};
use prompt::{
    BuiltPrompt, EstimateTokenCounter, MessageRole, PromptBuilder, PromptBuilderConfig,
    PromptOptions, END_OF_TURN,
};
use std::collections::HashMap;
use std::sync::Arc;

struct FakeLookup {
    messages: HashMap<String, Message>,
}

impl FakeLookup {
    fn new(messages: Vec<Message>) -> Self {
        Self {
            messages: messages.into_iter().map(|m| (m.id.clone(), m)).collect(),
        }
    }
}

#[async_trait]
impl MessageLookup for FakeLookup {
    async fn get(&self, id: &str) -> Result<Option<Message>, anyhow::Error> {
        Ok(self.messages.get(id).cloned())
    }
}

struct FailingLookup;

#[async_trait]
impl MessageLookup for FailingLookup {
    async fn get(&self, _id: &str) -> Result<Option<Message>, anyhow::Error> {
        anyhow::bail!("backend unavailable")
    }
}

fn builder(config: PromptBuilderConfig, messages: Vec<Message>) -> PromptBuilder {
    PromptBuilder::new(
        config,
        Arc::new(EstimateTokenCounter),
        Arc::new(FakeLookup::new(messages)),
    )
}

/// No prefix/suffix, so token counts only depend on the labeled turns.
fn bare_options(parent: Option<&str>) -> PromptOptions {
    PromptOptions {
        parent_message_id: parent.map(String::from),
        prompt_prefix: Some(String::new()),
        prompt_suffix: Some(String::new()),
    }
}

fn roles(p: &BuiltPrompt) -> Vec<MessageRole> {
    p.messages.iter().map(|m| m.role).collect()
}

/// **Test: Without a parent the prompt is the current turn wrapped in prefix and suffix.**
#[tokio::test]
async fn build_without_parent_contains_current_turn() {
    let b = builder(PromptBuilderConfig::default(), vec![]);

    let p = b.build("What is Rust?", &PromptOptions::default()).await.unwrap();

    assert!(p.text.contains("User:\n\nWhat is Rust?<|im_end|>"));
    assert!(p.text.starts_with("You are ChatGPT"));
    assert!(p.text.ends_with("\n\nChatGPT:\n"));
    assert_eq!(roles(&p), vec![MessageRole::System, MessageRole::User]);
    assert_eq!(p.messages[1].content, "What is Rust?");
    assert_eq!(p.max_tokens, 1000);
}

/// **Test: A chain that fits is included completely, oldest turn first.**
#[tokio::test]
async fn build_includes_whole_chain_when_it_fits() {
    let messages = vec![
        Message::user("u1", "first question", None, "c"),
        Message::assistant("a1", "first answer", Some("u1".into()), "c"),
    ];
    let b = builder(PromptBuilderConfig::default(), messages);

    let p = b.build("second question", &bare_options(Some("a1"))).await.unwrap();

    let expected = format!(
        "User:\n\nfirst question{eot}\n\nChatGPT:\n\nfirst answer{eot}\n\nUser:\n\nsecond question{eot}",
        eot = END_OF_TURN
    );
    assert_eq!(p.text, expected);
    assert_eq!(
        roles(&p),
        vec![MessageRole::User, MessageRole::Assistant, MessageRole::User]
    );
    assert_eq!(p.messages[0].content, "first question");
}

/// **Test: Walk-back stops at the first ancestor that would exceed the budget.**
#[tokio::test]
async fn build_stops_at_budget() {
    let text = "a".repeat(40);
    let messages = vec![
        Message::user("u1", text.clone(), None, "c"),
        Message::assistant("a1", text.clone(), Some("u1".into()), "c"),
    ];
    let config = PromptBuilderConfig {
        max_model_tokens: 40,
        max_response_tokens: 10,
        ..Default::default()
    };
    let b = builder(config, messages);

    let p = b.build(&text, &bare_options(Some("a1"))).await.unwrap();

    assert_eq!(roles(&p), vec![MessageRole::Assistant, MessageRole::User]);
    assert_eq!(p.num_tokens, 30);
    assert_eq!(p.max_tokens, 10);
    assert!(p.text.ends_with(&format!("User:\n\n{}{}", text, END_OF_TURN)));
}

/// **Test: An oversized current turn is still used, and max_tokens is floored at 1.**
#[tokio::test]
async fn build_accepts_oversized_first_turn() {
    let config = PromptBuilderConfig {
        max_model_tokens: 10,
        max_response_tokens: 5,
        ..Default::default()
    };
    let messages = vec![Message::user("u1", "old", None, "c")];
    let b = builder(config, messages);
    let text = "x".repeat(100);

    let p = b.build(&text, &bare_options(Some("u1"))).await.unwrap();

    assert!(p.text.contains(&text));
    assert_eq!(roles(&p), vec![MessageRole::User]);
    assert_eq!(p.max_tokens, 1);
}

/// **Test: A parent id pointing at nothing ends the walk-back without error.**
#[tokio::test]
async fn build_stops_at_missing_parent() {
    let messages = vec![Message::assistant("a1", "answer", Some("gone".into()), "c")];
    let b = builder(PromptBuilderConfig::default(), messages);

    let p = b.build("next", &bare_options(Some("a1"))).await.unwrap();

    assert_eq!(roles(&p), vec![MessageRole::Assistant, MessageRole::User]);
}

/// **Test: An unknown direct parent yields just the current turn.**
#[tokio::test]
async fn build_with_unknown_parent_is_current_turn_only() {
    let b = builder(PromptBuilderConfig::default(), vec![]);

    let p = b.build("hello", &bare_options(Some("nope"))).await.unwrap();

    assert_eq!(p.text, format!("User:\n\nhello{}", END_OF_TURN));
}

/// **Test: A cyclic chain terminates and includes each message once.**
#[tokio::test]
async fn build_terminates_on_cycle() {
    let messages = vec![
        Message::user("u1", "", Some("a1".into()), "c"),
        Message::assistant("a1", "", Some("u1".into()), "c"),
    ];
    let b = builder(PromptBuilderConfig::default(), messages);

    let p = b.build("loop?", &bare_options(Some("a1"))).await.unwrap();

    assert_eq!(
        roles(&p),
        vec![MessageRole::User, MessageRole::Assistant, MessageRole::User]
    );
}

/// **Test: Custom labels are used for both roles.**
#[tokio::test]
async fn build_uses_configured_labels() {
    let config = PromptBuilderConfig {
        user_label: "Human".into(),
        assistant_label: "Bot".into(),
        ..Default::default()
    };
    let messages = vec![Message::assistant("a1", "hi", None, "c")];
    let b = builder(config, messages);

    let p = b
        .build("hey", &PromptOptions {
            parent_message_id: Some("a1".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(p.text.contains("Bot:\n\nhi"));
    assert!(p.text.contains("Human:\n\nhey"));
    assert!(p.text.starts_with("You are Bot"));
}

/// **Test: Lookup backend failures propagate.**
#[tokio::test]
async fn build_propagates_lookup_errors() {
    let b = PromptBuilder::new(
        PromptBuilderConfig::default(),
        Arc::new(EstimateTokenCounter),
        Arc::new(FailingLookup),
    );

    let result = b.build("hi", &bare_options(Some("a1"))).await;

    assert!(result.is_err());
}
