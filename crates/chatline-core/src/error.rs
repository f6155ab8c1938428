//! Unified error type exposed by **`chatline-core`**.
//!
//! Request-level failures (auth, transport, server) are not errors in this
//! sense: they travel as [`crate::provider::Failure`] values inside the reply
//! stream so partial text is never lost. This type covers the remaining
//! programming and data errors: malformed transcripts, unknown settings
//! values and JSON (de)serialisation.

use thiserror::Error;

/// Convenient alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ChatlineError>;

#[derive(Debug, Error)]
pub enum ChatlineError {
    /// A transcript violated the "at most one system message, at index 0"
    /// rule.
    #[error("invalid transcript: {0}")]
    InvalidTranscript(String),

    /// A settings value (model name, effort level, …) could not be parsed.
    #[error("invalid setting `{name}`: {value}")]
    InvalidSetting { name: &'static str, value: String },

    /// Failure while serialising or deserialising JSON payloads.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
