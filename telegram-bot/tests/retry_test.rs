//! `with_retry` against a recording Bot.

mod mock_bot;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use completion_client::CompletionError;
use telegram_bot::retry::{MSG_GENERIC_FAILURE, MSG_INVALID_CREDENTIALS, MSG_RATE_LIMITED};
use telegram_bot::{with_retry, Chat, RetryPolicy};

use mock_bot::RecordingBot;

fn http_error(status: u16) -> CompletionError {
    CompletionError::Http {
        status,
        status_text: "error".to_string(),
        body: String::new(),
    }
}

/// **Test: A persistent 429 is tried max_attempts times, notified once, then re-raised.**
#[tokio::test]
async fn rate_limit_notifies_once_and_reraises() {
    let bot = Arc::new(RecordingBot::new());
    let chat = Chat::private(1);
    let attempts = AtomicU32::new(0);

    let result: Result<(), CompletionError> = with_retry(
        bot.as_ref(),
        &chat,
        &RetryPolicy::immediate(3),
        "completion",
        || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(http_error(429)) }
        },
    )
    .await;

    assert!(matches!(result, Err(CompletionError::Http { status: 429, .. })));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(bot.sent_texts(), vec![MSG_RATE_LIMITED.to_string()]);
}

/// **Test: Success after a transient failure sends no notice.**
#[tokio::test]
async fn success_after_retry_is_silent() {
    let bot = Arc::new(RecordingBot::new());
    let chat = Chat::private(1);
    let attempts = AtomicU32::new(0);

    let result = with_retry(
        bot.as_ref(),
        &chat,
        &RetryPolicy::immediate(3),
        "completion",
        || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(http_error(500))
                } else {
                    Ok("ok")
                }
            }
        },
    )
    .await;

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert!(bot.calls().is_empty());
}

/// **Test: Each failure class maps to its own notice.**
#[tokio::test]
async fn notice_depends_on_failure_class() {
    let cases = [
        (CompletionError::Authentication("bad key".into()), MSG_INVALID_CREDENTIALS),
        (http_error(401), MSG_INVALID_CREDENTIALS),
        (CompletionError::InvalidResponse("empty".into()), MSG_GENERIC_FAILURE),
    ];

    for (error, expected) in cases {
        let bot = Arc::new(RecordingBot::new());
        let chat = Chat::private(1);
        let mut error = Some(error);

        let result: Result<(), CompletionError> = with_retry(
            bot.as_ref(),
            &chat,
            &RetryPolicy::immediate(1),
            "completion",
            || {
                let e = error.take().expect("single attempt");
                async move { Err(e) }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(bot.sent_texts(), vec![expected.to_string()]);
    }
}
