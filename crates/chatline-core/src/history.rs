//! The append-only chat history contract.
//!
//! A [`ChatStore`] keeps immutable snapshots of finished conversations. It
//! has no update or delete operation: once appended, a [`ChatRecord`] lives
//! as long as the store does.
//!
//! Methods return boxed futures so the trait stays object-safe; sessions hold
//! an `Arc<dyn ChatStore>` that several sessions may share. Implementations
//! serialise concurrent appends themselves.
use std::{fmt::Display, future::Future, pin::Pin, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    message::{Content, Role, Transcript},
    model::Model,
};

/// Longest preview shown in a history listing, in characters.
pub const PREVIEW_CHARS: usize = 60;

/// Future returned by every [`ChatStore`] method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store cannot be reached. History is lost for this call
    /// but the conversation itself can carry on.
    #[error("chat history is unavailable: {0}")]
    StorageUnavailable(String),

    #[error("chat record {0} not found")]
    NotFound(RecordId),
}

/// Opaque, strictly increasing record identifier assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(RecordId)
    }
}

/// Snapshot handed to [`ChatStore::append`]; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatRecord {
    pub timestamp: DateTime<Utc>,
    pub model: Model,
    pub messages: Transcript,
}

impl NewChatRecord {
    /// Snapshot `messages` as of now.
    pub fn snapshot(model: Model, messages: Transcript) -> Self {
        Self {
            timestamp: Utc::now(),
            model,
            messages,
        }
    }

    pub fn with_id(self, id: RecordId) -> ChatRecord {
        ChatRecord {
            id,
            timestamp: self.timestamp,
            model: self.model,
            messages: self.messages,
        }
    }
}

/// A persisted, immutable conversation snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: RecordId,
    pub timestamp: DateTime<Utc>,
    pub model: Model,
    pub messages: Transcript,
}

impl ChatRecord {
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            id: self.id,
            timestamp: self.timestamp,
            model: self.model.clone(),
            message_count: self.messages.len(),
            preview: preview(&self.messages),
        }
    }
}

/// One line of a history listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub id: RecordId,
    pub timestamp: DateTime<Utc>,
    pub model: Model,
    pub message_count: usize,
    /// First user message, shortened to [`PREVIEW_CHARS`].
    pub preview: String,
}

/// Text of the first user message, or `"Image"` when it only carries images.
pub fn preview(messages: &Transcript) -> String {
    let Some(first_user) = messages.iter().find(|m| m.role == Role::User) else {
        return String::new();
    };

    let text = match &first_user.content {
        Content::Text(text) => text.as_str(),
        content => match content.first_text() {
            Some(text) if !text.trim().is_empty() => text,
            _ if content.has_images() => "Image",
            _ => "",
        },
    };

    let text = text.trim();
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}…")
    } else {
        text.to_owned()
    }
}

/// Durable, append-only log of finished conversations.
pub trait ChatStore: Send + Sync {
    /// Persist `record` and return its newly assigned id.
    ///
    /// # Errors
    ///
    /// [`StoreError::StorageUnavailable`] when the backend cannot be written.
    fn append(&self, record: NewChatRecord) -> StoreFuture<'_, RecordId>;

    /// At most `limit` summaries, newest first: descending by
    /// `(timestamp, id)`.
    fn list(&self, limit: usize) -> StoreFuture<'_, Vec<RecordSummary>>;

    /// Fetch one record.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for unknown ids.
    fn get(&self, id: RecordId) -> StoreFuture<'_, ChatRecord>;
}
