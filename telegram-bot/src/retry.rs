//! Retry wrapper with failure classification.
//!
//! [`with_retry`] runs an operation up to `max_attempts` times, sleeping per the policy's delay
//! schedule between attempts. When the last attempt fails, the error is classified into a
//! [`FailureKind`], exactly one matching notice is sent to the chat, the raw error is logged and
//! then returned to the caller unchanged.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use completion_client::CompletionError;
use tracing::{error, info, warn};

use crate::core::{Bot, Chat, DbotError};

pub const MSG_RATE_LIMITED: &str =
    "⏳ Too many requests to the AI service. Please wait a minute and try again.";
pub const MSG_INVALID_CREDENTIALS: &str =
    "🔑 The AI service rejected the API key. Please ask the bot owner to check it.";
pub const MSG_ACCESS_DENIED: &str = "🚫 The AI service denied access to this request.";
pub const MSG_NETWORK_UNREACHABLE: &str =
    "📡 Cannot reach the AI service right now. Please try again later.";
pub const MSG_GENERIC_FAILURE: &str = "😭 Exception";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before retry `n` (0-based); retries beyond the list use `fallback_delay`.
    pub delays: Vec<Duration>,
    pub fallback_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delays: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(5),
            ],
            fallback_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Policy without sleeps, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delays: Vec::new(),
            fallback_delay: Duration::ZERO,
        }
    }

    pub fn delay_for(&self, retry: usize) -> Duration {
        self.delays.get(retry).copied().unwrap_or(self.fallback_delay)
    }
}

/// User-facing category of a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// HTTP 429
    RateLimited,
    /// HTTP 401 or a missing key
    InvalidCredentials,
    /// HTTP 403
    AccessDenied,
    /// Connection-level failure, no HTTP status
    NetworkUnreachable,
    Other,
}

impl FailureKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => FailureKind::RateLimited,
            401 => FailureKind::InvalidCredentials,
            403 => FailureKind::AccessDenied,
            _ => FailureKind::Other,
        }
    }

    pub fn user_message(self) -> &'static str {
        match self {
            FailureKind::RateLimited => MSG_RATE_LIMITED,
            FailureKind::InvalidCredentials => MSG_INVALID_CREDENTIALS,
            FailureKind::AccessDenied => MSG_ACCESS_DENIED,
            FailureKind::NetworkUnreachable => MSG_NETWORK_UNREACHABLE,
            FailureKind::Other => MSG_GENERIC_FAILURE,
        }
    }
}

/// Errors that can be mapped to a [`FailureKind`].
pub trait Classify {
    fn failure_kind(&self) -> FailureKind;
}

impl Classify for CompletionError {
    fn failure_kind(&self) -> FailureKind {
        match self.status_code() {
            Some(status) => FailureKind::from_status(status),
            None if self.is_network() => FailureKind::NetworkUnreachable,
            None => FailureKind::Other,
        }
    }
}

impl Classify for DbotError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            DbotError::Completion(e) => e.failure_kind(),
            _ => FailureKind::Other,
        }
    }
}

/// Runs `f` until it succeeds or `policy.max_attempts` attempts have failed.
///
/// Every error class is retried. After the final failure the chat receives
/// `failure_kind().user_message()` once and the last error is returned.
pub async fn with_retry<T, E, F, Fut>(
    bot: &dyn Bot,
    chat: &Chat,
    policy: &RetryPolicy,
    operation: &str,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match f().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation, attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt < max_attempts => {
                let delay = policy.delay_for((attempt - 1) as usize);
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(e) => {
                let kind = e.failure_kind();
                error!(
                    operation,
                    attempts = attempt,
                    kind = ?kind,
                    error = %e,
                    "Operation failed after all attempts"
                );
                if let Err(send_err) = bot.send_message(chat, kind.user_message()).await {
                    error!(error = %send_err, chat_id = chat.id, "Failed to send failure notice");
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_fall_back_after_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(5));
        assert_eq!(policy.delay_for(3), Duration::from_secs(10));
    }

    #[test]
    fn completion_errors_are_classified_by_status() {
        let http = |status| CompletionError::Http {
            status,
            status_text: String::new(),
            body: String::new(),
        };
        assert_eq!(http(429).failure_kind(), FailureKind::RateLimited);
        assert_eq!(http(401).failure_kind(), FailureKind::InvalidCredentials);
        assert_eq!(http(403).failure_kind(), FailureKind::AccessDenied);
        assert_eq!(http(500).failure_kind(), FailureKind::Other);
        assert_eq!(
            CompletionError::Authentication("missing".into()).failure_kind(),
            FailureKind::InvalidCredentials
        );
        assert_eq!(
            CompletionError::Timeout(Duration::from_millis(5)).failure_kind(),
            FailureKind::Other
        );
    }

    #[test]
    fn dbot_error_delegates_to_completion_error() {
        let e = DbotError::Completion(CompletionError::Http {
            status: 429,
            status_text: "Too Many Requests".into(),
            body: String::new(),
        });
        assert_eq!(e.failure_kind(), FailureKind::RateLimited);
        assert_eq!(DbotError::Bot("x".into()).failure_kind(), FailureKind::Other);
    }
}
