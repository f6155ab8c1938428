//! Per-request settings.
//!
//! A [`Settings`] value is cloned into every request when it starts, so
//! changing the session's settings while a reply is streaming only affects
//! the *next* request.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Effort, Model};

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Opaque bearer token. Never logged.
    pub api_key: String,
    pub model: Model,
    pub effort: Effort,
}

impl Settings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<Model>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_effort(mut self, effort: Effort) -> Self {
        self.effort = effort;
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &if self.has_api_key() { "<set>" } else { "<empty>" })
            .field("model", &self.model)
            .field("effort", &self.effort)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_the_key() {
        let settings = Settings::new("sk-secret");
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<set>"));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        assert!(!Settings::new("   ").has_api_key());
        assert!(Settings::new("sk-1").has_api_key());
    }
}
