//! Error taxonomy of a completion call.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Non-2xx response from the completion endpoint.
    #[error("Completion error {status}: {status_text}")]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },

    /// A streamed event payload that is neither `[DONE]` nor valid JSON.
    #[error("Malformed stream payload: {source}")]
    StreamParse {
        payload: String,
        #[source]
        source: serde_json::Error,
    },

    /// A non-streamed body that cannot be read as a completion.
    #[error("Invalid completion response: {0}")]
    InvalidResponse(String),

    #[error("Completion timed out waiting for response after {0:?}")]
    Timeout(Duration),

    #[error("Completion request cancelled")]
    Cancelled,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Message store error: {0}")]
    Store(anyhow::Error),
}

impl CompletionError {
    /// HTTP status carried by the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CompletionError::Http { status, .. } => Some(*status),
            CompletionError::Authentication(_) => Some(401),
            CompletionError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the request never got an HTTP answer (connect, DNS, send, timeout).
    /// Failures reading or decoding a response body are not network errors.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            CompletionError::Network(e)
                if e.status().is_none() && (e.is_connect() || e.is_timeout() || e.is_request())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_exposes_status() {
        let e = CompletionError::Http {
            status: 500,
            status_text: "Internal Server Error".into(),
            body: "boom".into(),
        };
        assert_eq!(e.status_code(), Some(500));
        assert_eq!(e.to_string(), "Completion error 500: Internal Server Error");
        assert!(!e.is_network());
    }

    #[test]
    fn timeout_and_cancel_have_no_status() {
        assert_eq!(
            CompletionError::Timeout(Duration::from_millis(50)).status_code(),
            None
        );
        assert_eq!(CompletionError::Cancelled.status_code(), None);
    }
}
