//! On-disk configuration.
//!
//! Stored as TOML at `<config dir>/chatline/config.toml`:
//!
//! ```toml
//! api_key = "sk-…"
//! model = "gpt-5-mini"
//! effort = "medium"
//! endpoint = "https://api.openai.com/v1"
//! system_prompt = "You are a helpful, concise assistant. Keep answers clear and useful."
//!
//! [history]
//! enabled = true
//! list_limit = 30
//! ```
//!
//! Every field is optional. A missing file yields the defaults, and an empty
//! `api_key` is filled from `OPENAI_API_KEY`.
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use chatline_core::{
    history::ChatStore,
    model::{Effort, Model},
    settings::Settings,
};
use chatline_openai::{StreamingClient, error::OpenAiError};
use chatline_store::{DisabledChatStore, open_or_disabled};
use schemars::{JsonSchema, schema::RootSchema, schema_for};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::session::SessionState;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful, concise assistant. Keep answers clear and useful.";
pub const DEFAULT_LIST_LIMIT: usize = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Decode(#[from] toml::de::Error),

    #[error("cannot encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("no configuration directory on this platform")]
    NoConfigDir,

    #[error(transparent)]
    Client(#[from] OpenAiError),
}

#[derive(Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ChatlineConfig {
    /// Bearer token sent to the endpoint. Falls back to `OPENAI_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model id, e.g. `gpt-5-mini` or any id the endpoint understands.
    #[schemars(with = "String")]
    pub model: Model,

    pub effort: Effort,

    /// Base URL up to and including the API version.
    pub endpoint: String,

    /// Inserted once at the start of every new conversation. Empty disables it.
    pub system_prompt: String,

    pub history: HistoryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,

    /// SQLite file. Defaults to `<data dir>/chatline/history.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// How many conversations `/history` lists.
    pub list_limit: usize,
}

impl Default for ChatlineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: Model::default(),
            effort: Effort::default(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            history: HistoryConfig::default(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl fmt::Debug for ChatlineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatlineConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("model", &self.model)
            .field("effort", &self.effort)
            .field("endpoint", &self.endpoint)
            .field("system_prompt", &self.system_prompt)
            .field("history", &self.history)
            .finish()
    }
}

impl ChatlineConfig {
    /// `<config dir>/chatline/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("chatline").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(Self::default_path()?)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_owned(),
                source,
            })?;
            toml::from_str(&content)?
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };

        Ok(config.with_key_fallback(std::env::var(API_KEY_ENV).ok()))
    }

    /// Write to `path`, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io = |source| ConfigError::Io {
            path: path.to_owned(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?).map_err(io)
    }

    /// Use `key` when no usable key is configured.
    pub fn with_key_fallback(mut self, key: Option<String>) -> Self {
        let configured = self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty());
        if !configured {
            self.api_key = key.filter(|k| !k.trim().is_empty());
        }
        self
    }

    pub fn to_settings(&self) -> Settings {
        Settings {
            api_key: self.api_key.clone().unwrap_or_default(),
            model: self.model.clone(),
            effort: self.effort,
        }
    }

    /// Resolved history file, `None` when history is off or no data
    /// directory exists.
    pub fn history_path(&self) -> Option<PathBuf> {
        if !self.history.enabled {
            return None;
        }
        self.history
            .path
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("chatline").join("history.db")))
    }

    /// The configured history store, or a disabled one.
    pub fn open_store(&self) -> Arc<dyn ChatStore> {
        match self.history_path() {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if let Err(err) = std::fs::create_dir_all(parent) {
                        warn!(path = %parent.display(), error = %err, "cannot create history directory");
                    }
                }
                open_or_disabled(path)
            }
            None => Arc::new(DisabledChatStore::default()),
        }
    }

    pub fn build_client(&self) -> Result<StreamingClient, ConfigError> {
        Ok(StreamingClient::builder()
            .with_base_url(self.endpoint.clone())
            .build()?)
    }

    /// Session wired to the configured endpoint, store and system prompt.
    pub fn build_session(&self) -> Result<SessionState<StreamingClient>, ConfigError> {
        Ok(SessionState::new(
            self.build_client()?,
            self.open_store(),
            self.to_settings(),
            self.system_prompt.clone(),
        ))
    }
}

/// JSON Schema of the config file, for editor validation.
pub fn config_schema() -> RootSchema {
    schema_for!(ChatlineConfig)
}
