//! Playground configuration.

use crate::error::PlaygroundError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings shared by the panes and the persistence layer.
///
/// Every field has a default, so a partial JSON object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaygroundConfig {
    /// Prepended to the pane name to form the storage key.
    pub storage_prefix: String,
    /// Spaces inserted by Tab.
    pub indent_unit: usize,
    /// Delay between a hint-triggering keystroke and the hint request.
    pub hint_delay_ms: u64,
    pub auto_close_tags: bool,
    pub auto_close_brackets: bool,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        PlaygroundConfig {
            storage_prefix: "xsltui.".to_string(),
            indent_unit: 2,
            hint_delay_ms: 100,
            auto_close_tags: true,
            auto_close_brackets: true,
        }
    }
}

impl PlaygroundConfig {
    pub fn from_json(json: &str) -> Result<Self, PlaygroundError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage_prefix = prefix.into();
        self
    }

    pub fn hint_delay(&self) -> Duration {
        Duration::from_millis(self.hint_delay_ms)
    }
}
