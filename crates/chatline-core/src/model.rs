//! Model identifiers and the reasoning-effort knob.
//!
//! The enum hierarchy keeps application code free of literal strings such as
//! `"gpt-5-mini"` while still letting self-hosted or brand-new models through
//! [`Model::Custom`]. Provider crates decide how a model maps onto request
//! parameters (see `chatline-openai::model_map`).
//!
//! # Example
//!
//! ```rust
//! use chatline_core::model::{Model, OpenAiModel};
//!
//! assert_eq!(Model::from(OpenAiModel::Gpt5Mini), Model::default());
//! assert_eq!("gpt-4".parse::<Model>().unwrap(), Model::OpenAi(OpenAiModel::Gpt4));
//! assert_eq!(Model::default().to_string(), "gpt-5-mini");
//! ```
use std::{
    fmt::Display,
    hash::{Hash, Hasher},
    str::FromStr,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ChatlineError;

/// Universal identifier for a chat model.
///
/// Serialised as its plain model id, e.g. `"gpt-5"` or `"my-local-llama"`.
/// Two models are equal when their ids are, so `Custom("gpt-4")` and
/// `OpenAi(Gpt4)` compare (and hash) the same.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Model {
    /// Built-in OpenAI models.
    OpenAi(OpenAiModel),
    /// Any other model id understood by the configured endpoint.
    Custom(String),
}

/// Models the client knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenAiModel {
    Gpt5Mini,
    Gpt5,
    Gpt4Turbo,
    Gpt4,
    Gpt35Turbo,
}

impl OpenAiModel {
    pub const ALL: [OpenAiModel; 5] = [
        OpenAiModel::Gpt5Mini,
        OpenAiModel::Gpt5,
        OpenAiModel::Gpt4Turbo,
        OpenAiModel::Gpt4,
        OpenAiModel::Gpt35Turbo,
    ];

    /// Wire id sent as `model`.
    pub fn id(self) -> &'static str {
        match self {
            OpenAiModel::Gpt5Mini => "gpt-5-mini",
            OpenAiModel::Gpt5 => "gpt-5",
            OpenAiModel::Gpt4Turbo => "gpt-4-turbo-preview",
            OpenAiModel::Gpt4 => "gpt-4",
            OpenAiModel::Gpt35Turbo => "gpt-3.5-turbo",
        }
    }

    /// Human readable label for pickers.
    pub fn display_name(self) -> &'static str {
        match self {
            OpenAiModel::Gpt5Mini => "GPT-5 Mini",
            OpenAiModel::Gpt5 => "GPT-5",
            OpenAiModel::Gpt4Turbo => "GPT-4 Turbo",
            OpenAiModel::Gpt4 => "GPT-4",
            OpenAiModel::Gpt35Turbo => "GPT-3.5 Turbo",
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::OpenAi(OpenAiModel::Gpt5Mini)
    }
}

impl Model {
    /// Canonical model for `id`: catalog ids map to [`Model::OpenAi`],
    /// anything else is kept verbatim as [`Model::Custom`].
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        OpenAiModel::ALL
            .into_iter()
            .find(|m| m.id() == id)
            .map(Model::OpenAi)
            .unwrap_or(Model::Custom(id))
    }

    pub fn id(&self) -> &str {
        match self {
            Model::OpenAi(model) => model.id(),
            Model::Custom(id) => id,
        }
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Model {}

impl Hash for Model {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl From<OpenAiModel> for Model {
    fn from(val: OpenAiModel) -> Self {
        Model::OpenAi(val)
    }
}

impl Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Model {
    type Err = ChatlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ChatlineError::InvalidSetting {
                name: "model",
                value: s.to_owned(),
            });
        }

        Ok(Model::from_id(s))
    }
}

impl TryFrom<String> for Model {
    type Error = ChatlineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Model> for String {
    fn from(value: Model) -> Self {
        match value {
            Model::OpenAi(model) => model.id().to_owned(),
            Model::Custom(id) => id,
        }
    }
}

/// Quality/latency trade-off sent with every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Low,
    #[default]
    Medium,
    High,
}

impl Effort {
    pub fn as_str(self) -> &'static str {
        match self {
            Effort::Low => "low",
            Effort::Medium => "medium",
            Effort::High => "high",
        }
    }
}

impl Display for Effort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effort {
    type Err = ChatlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Effort::Low),
            "medium" => Ok(Effort::Medium),
            "high" => Ok(Effort::High),
            other => Err(ChatlineError::InvalidSetting {
                name: "effort",
                value: other.to_owned(),
            }),
        }
    }
}
