//! Message, role and transcript types shared by every chatline crate.
//!
//! They mirror the concepts exposed by chat-completion APIs ("system",
//! "user", "assistant") but stay independent of any specific wire format:
//! the OpenAI adapter converts them into its own request structs, and the
//! history store serialises them as they are.
//!
//! ## Serialised shape
//!
//! ```json
//! { "role": "user", "content": "Hi" }
//! { "role": "user", "content": [ { "kind": "text",  "value": "What is this?" },
//!                                { "kind": "image", "value": "data:image/png;base64,…" } ] }
//! ```
use std::{fmt::Display, ops::Deref};

use serde::{Deserialize, Serialize};

use crate::error::{ChatlineError, Result};

/// Chat roles understood by the completion endpoint.
///
/// The `Display` implementation renders the canonical lowercase name.
#[derive(Debug, Clone, Serialize, Deserialize, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Global behaviour and style guidelines. At most one per transcript.
    System,
    /// Messages originating from the human user.
    User,
    /// Messages produced by the model.
    Assistant,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One element of a multi-part message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ContentPart {
    Text(String),
    /// Image reference, usually a `data:` URL.
    Image(String),
}

/// Message body: plain text, or an ordered list of text/image parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Content {
    /// First textual piece of the content, if any.
    pub fn first_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Parts(parts) => parts.iter().find_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::Image(_) => None,
            }),
        }
    }

    pub fn has_images(&self) -> bool {
        match self {
            Content::Text(_) => false,
            Content::Parts(parts) => parts.iter().any(|p| matches!(p, ContentPart::Image(_))),
        }
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::Text(value)
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Content::Text(value.to_owned())
    }
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: Content,
}

impl Message {
    pub fn new(role: Role, content: impl Into<Content>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, Content::Text(text.into()))
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Content::Text(text.into()))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Content::Text(text.into()))
    }

    /// Build a user message from typed text plus attached images.
    ///
    /// Without images this is a plain text message; with images the text
    /// becomes the first part followed by one part per image, in order.
    pub fn user_with_images(text: impl Into<String>, images: Vec<String>) -> Self {
        let text = text.into();
        if images.is_empty() {
            return Self::user(text);
        }

        let mut parts = Vec::with_capacity(images.len() + 1);
        parts.push(ContentPart::Text(text));
        parts.extend(images.into_iter().map(ContentPart::Image));
        Self::new(Role::User, Content::Parts(parts))
    }
}

/// Ordered list of messages making up one conversation.
///
/// Invariant: at most one [`Role::System`] message, and if present it sits at
/// index 0. Every constructor and mutator keeps this true, including
/// deserialisation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Message>", into = "Vec<Message>")]
pub struct Transcript(Vec<Message>);

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and wrap an existing message list.
    ///
    /// # Errors
    ///
    /// [`ChatlineError::InvalidTranscript`] if a system message appears
    /// anywhere but index 0, or more than once.
    pub fn from_messages(messages: Vec<Message>) -> Result<Self> {
        if let Some(pos) = messages
            .iter()
            .skip(1)
            .position(|m| m.role == Role::System)
        {
            return Err(ChatlineError::InvalidTranscript(format!(
                "system message at index {} (only index 0 is allowed)",
                pos + 1
            )));
        }
        Ok(Self(messages))
    }

    pub fn messages(&self) -> &[Message] {
        &self.0
    }

    pub fn has_system(&self) -> bool {
        self.0.first().is_some_and(|m| m.role == Role::System)
    }

    pub fn last_role(&self) -> Option<Role> {
        self.0.last().map(|m| m.role)
    }

    /// Insert `message` as the system prompt at index 0.
    ///
    /// Returns `false` (and leaves the transcript untouched) when a system
    /// message is already present.
    pub fn insert_system(&mut self, text: impl Into<String>) -> bool {
        if self.has_system() {
            return false;
        }
        self.0.insert(0, Message::system(text));
        true
    }

    /// Append a user or assistant message.
    ///
    /// # Errors
    ///
    /// System messages must go through [`Self::insert_system`].
    pub fn push(&mut self, message: Message) -> Result<()> {
        if message.role == Role::System {
            return Err(ChatlineError::InvalidTranscript(
                "system messages can only be inserted at index 0".into(),
            ));
        }
        self.0.push(message);
        Ok(())
    }

    /// Remove the trailing message if, and only if, it is an assistant
    /// message.
    pub fn pop_assistant(&mut self) -> Option<Message> {
        if self.last_role() == Some(Role::Assistant) {
            self.0.pop()
        } else {
            None
        }
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.0
    }
}

impl Deref for Transcript {
    type Target = [Message];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<Vec<Message>> for Transcript {
    type Error = ChatlineError;

    fn try_from(value: Vec<Message>) -> Result<Self> {
        Self::from_messages(value)
    }
}

impl From<Transcript> for Vec<Message> {
    fn from(value: Transcript) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_system_is_idempotent() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("Hi")).unwrap();

        assert!(transcript.insert_system("Be brief."));
        assert!(!transcript.insert_system("Be verbose."));

        let systems = transcript.iter().filter(|m| m.role == Role::System).count();
        assert_eq!(systems, 1);
        assert_eq!(transcript[0], Message::system("Be brief."));
    }

    #[test]
    fn push_rejects_system_messages() {
        let mut transcript = Transcript::new();
        assert!(transcript.push(Message::system("nope")).is_err());
        assert!(transcript.is_empty());
    }

    #[test]
    fn from_messages_rejects_late_system_message() {
        let err = Transcript::from_messages(vec![
            Message::user("Hi"),
            Message::system("late"),
        ])
        .unwrap_err();
        assert!(matches!(err, ChatlineError::InvalidTranscript(_)));
    }

    #[test]
    fn pop_assistant_only_removes_trailing_assistant() {
        let mut transcript =
            Transcript::from_messages(vec![Message::user("Hi"), Message::assistant("Hello")])
                .unwrap();

        assert_eq!(transcript.pop_assistant(), Some(Message::assistant("Hello")));
        assert_eq!(transcript.pop_assistant(), None);
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn user_with_images_builds_parts() {
        let plain = Message::user_with_images("Hi", vec![]);
        assert_eq!(plain.content, Content::Text("Hi".into()));

        let with_image = Message::user_with_images("What is this?", vec!["data:x".into()]);
        assert_eq!(
            with_image.content,
            Content::Parts(vec![
                ContentPart::Text("What is this?".into()),
                ContentPart::Image("data:x".into()),
            ])
        );
        assert!(with_image.content.has_images());
        assert_eq!(with_image.content.first_text(), Some("What is this?"));
    }

    #[test]
    fn deserialising_validates_the_system_invariant() {
        let json = r#"[{"role":"user","content":"Hi"},{"role":"system","content":"x"}]"#;
        assert!(serde_json::from_str::<Transcript>(json).is_err());

        let json = r#"[{"role":"system","content":"x"},{"role":"user","content":[{"kind":"text","value":"Hi"}]}]"#;
        let transcript: Transcript = serde_json::from_str(json).unwrap();
        assert!(transcript.has_system());
        assert_eq!(transcript[1].content.first_text(), Some("Hi"));
    }
}
