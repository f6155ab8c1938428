use chatline_core::message::{Content as CoreContent, ContentPart as CorePart, Message, Role};
use chatline_core::model::Effort;
use chatline_core::settings::Settings;
use serde::{Deserialize, Serialize};

use crate::model_map::{Tuning, map_model};

use super::common::{self, impl_builder_methods};

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatCompletionMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<Effort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

impl ChatCompletionRequest {
    pub fn new(model: String, messages: Vec<ChatCompletionMessage>) -> Self {
        Self {
            model,
            messages,
            stream: None,
            reasoning_effort: None,
            temperature: None,
            top_p: None,
        }
    }

    /// Build the request body for `messages` under `settings`.
    ///
    /// The effort level becomes `reasoning_effort` for reasoning models and
    /// `temperature`/`top_p` for the others.
    pub fn for_transcript(messages: &[Message], settings: &Settings) -> Self {
        let (model, tuning) = map_model(&settings.model, settings.effort);
        let request = Self::new(model, messages.iter().map(Into::into).collect());

        match tuning {
            Tuning::Reasoning(effort) => request.reasoning_effort(effort),
            Tuning::Sampling { temperature, top_p } => request.temperature(temperature).top_p(top_p),
        }
    }

    /// Same payload with streaming disabled.
    pub fn non_streaming(&self) -> Self {
        self.clone().stream(false)
    }
}

impl_builder_methods!(
    ChatCompletionRequest,
    stream: bool,
    reasoning_effort: Effort,
    temperature: f64,
    top_p: f64
);

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    System,
    Assistant,
}

impl From<Role> for MessageRole {
    fn from(value: Role) -> Self {
        match value {
            Role::System => MessageRole::System,
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChatCompletionMessage {
    pub role: MessageRole,
    pub content: Content,
}

impl From<&Message> for ChatCompletionMessage {
    fn from(value: &Message) -> Self {
        let content = match &value.content {
            CoreContent::Text(text) => Content::Text(text.clone()),
            CoreContent::Parts(parts) => Content::Parts(
                parts
                    .iter()
                    .map(|part| match part {
                        CorePart::Text(text) => ContentPart::Text { text: text.clone() },
                        CorePart::Image(url) => ContentPart::ImageUrl {
                            image_url: ImageUrl { url: url.clone() },
                        },
                    })
                    .collect(),
            ),
        };

        Self {
            role: value.role.into(),
            content,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatCompletionMessageForResponse {
    #[serde(default)]
    pub role: Option<MessageRole>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionChoice {
    #[serde(default)]
    pub index: i64,
    pub message: ChatCompletionMessageForResponse,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    pub usage: Option<common::Usage>,
}

impl ChatCompletionResponse {
    /// `choices[0].message.content`, empty when absent.
    pub fn into_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    #[serde(other)]
    Other,
}
