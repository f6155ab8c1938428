use chatline_core::provider::{Failure, FailureKind};
use reqwest::StatusCode;

use crate::api_v1::ErrorResponse;

/// High-level error type covering every failure mode the client can hit.
#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("couldn’t parse response body: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("OpenAI returned non-success status {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("API key cannot be sent as an HTTP header")]
    InvalidApiKey,
}

impl OpenAiError {
    /// Classify the error and attach the text decoded so far.
    pub fn into_failure(self, partial_text: impl Into<String>) -> Failure {
        let (kind, message) = match self {
            OpenAiError::Http(err) => (FailureKind::Transport, err.to_string()),
            OpenAiError::Serde(err) => (FailureKind::Server, format!("invalid JSON response: {err}")),
            OpenAiError::Api { status, body } => (FailureKind::Server, server_message(status, &body)),
            OpenAiError::InvalidApiKey => (FailureKind::Auth, OpenAiError::InvalidApiKey.to_string()),
        };
        Failure::new(kind, message, partial_text)
    }
}

/// Human readable message for a non-success response.
///
/// Uses `error.message` from a structured body when present, otherwise the
/// raw body, otherwise the status line.
pub(crate) fn server_message(status: StatusCode, body: &str) -> String {
    let fallback = format!("API Error: {status}");

    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => parsed
            .error
            .message
            .filter(|message| !message.is_empty())
            .unwrap_or(fallback),
        Err(_) if !body.trim().is_empty() => body.trim().to_owned(),
        Err(_) => fallback,
    }
}
