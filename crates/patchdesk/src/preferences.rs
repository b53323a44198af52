//! Locally stored user preferences.

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("preferences io: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid preferences: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to encode preferences: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Free-form context passed along with repair requests.
    pub knowledge_base: String,
}

impl Preferences {
    /// Load from `path`. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreferencesError> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.as_ref().display(), "no preferences file, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PreferencesError> {
        let text = toml::to_string(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// The knowledge base, or `None` when blank.
    pub fn knowledge_base(&self) -> Option<&str> {
        Some(self.knowledge_base.as_str()).filter(|kb| !kb.trim().is_empty())
    }
}
