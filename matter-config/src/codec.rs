use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// What the reader does when a container is exited while elements remain unread.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrailingElements {
    /// Exiting with unread elements is an error.
    #[default]
    Reject,
    /// Remaining elements are skipped up to the matching end of container.
    Skip,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ReaderConfig {
    /// Maximum number of simultaneously open containers.
    pub max_depth: usize,
    pub trailing_elements: TrailingElements,
    /// Upper bound for the length prefix of string and byte string elements.
    pub max_element_len: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            trailing_elements: TrailingElements::Reject,
            max_element_len: 1024 * 1024,
        }
    }
}

impl ReaderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "reader.max_depth must be at least 1".to_string(),
            ));
        }
        if self.max_element_len == 0 {
            return Err(ConfigError::Invalid(
                "reader.max_element_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct WriterConfig {
    /// Maximum number of simultaneously open containers.
    pub max_depth: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self { max_depth: 32 }
    }
}

impl WriterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "writer.max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
