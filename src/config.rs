//! Screen configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config: {0}")]
    Invalid(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Dataset name used until the user chooses one.
    pub default_dataset: String,
    /// Store key holding the active dataset name.
    pub active_dataset_key: String,
    /// Prefix of the store keys holding dataset documents.
    pub dataset_prefix: String,
    pub title_prefix: String,
    pub block: BlockDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockDefaults {
    pub width: String,
    pub height: String,
    pub heading: String,
    pub placeholder_text: String,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            default_dataset: "unspecified".to_string(),
            active_dataset_key: "dataset".to_string(),
            dataset_prefix: "dataset-".to_string(),
            title_prefix: "GM Screen".to_string(),
            block: BlockDefaults::default(),
        }
    }
}

impl Default for BlockDefaults {
    fn default() -> Self {
        Self {
            width: "30em".to_string(),
            height: "30ex".to_string(),
            heading: "Title".to_string(),
            placeholder_text: "...text...".to_string(),
        }
    }
}

impl ScreenConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn dataset_key(&self, name: &str) -> String {
        format!("{}{}", self.dataset_prefix, name)
    }

    /// Dataset name for a store key, if the key holds a dataset.
    pub fn dataset_name<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.dataset_prefix.as_str())
    }

    pub fn is_unnamed(&self, name: &str) -> bool {
        name == self.default_dataset
    }
}
