//! TOML configuration.
//!
//! ```toml
//! [preview]
//! indent = 4
//!
//! [editor]
//! json_languages = ["json"]
//!
//! [diagnostics]
//! field_name_pattern = "^[a-z_]+$"
//!
//! [credential]
//! refresh_buffer_secs = 120
//!
//! [preferences]
//! path = "prefs.toml"
//! ```

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::credential::CredentialCache;
use crate::diagnostics::{SchemaDiagnoser, DEFAULT_FIELD_NAME_PATTERN};
use crate::document::DEFAULT_INDENT;
use crate::editor::Language;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid field name pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSection {
    pub indent: usize,
}

impl Default for PreviewSection {
    fn default() -> Self {
        Self { indent: DEFAULT_INDENT }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSection {
    /// Languages the patch tools accept.
    pub json_languages: Vec<Language>,
}

impl Default for EditorSection {
    fn default() -> Self {
        Self { json_languages: vec![Language::Json, Language::Jsonc] }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsSection {
    pub field_name_pattern: String,
}

impl Default for DiagnosticsSection {
    fn default() -> Self {
        Self { field_name_pattern: DEFAULT_FIELD_NAME_PATTERN.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSection {
    pub refresh_buffer_secs: u64,
}

impl Default for CredentialSection {
    fn default() -> Self {
        Self { refresh_buffer_secs: 300 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesSection {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub preview: PreviewSection,
    pub editor: EditorSection,
    pub diagnostics: DiagnosticsSection,
    pub credential: CredentialSection,
    pub preferences: PreferencesSection,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.field_name_regex()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text)
    }

    pub fn field_name_regex(&self) -> Result<Regex, ConfigError> {
        let pattern = &self.diagnostics.field_name_pattern;
        Regex::new(pattern).map_err(|err| ConfigError::InvalidPattern {
            pattern: pattern.clone(),
            message: err.to_string(),
        })
    }

    pub fn credential_cache(&self) -> CredentialCache {
        CredentialCache::from_config(&self.credential)
    }

    pub fn diagnoser(&self) -> Result<SchemaDiagnoser, ConfigError> {
        let regex = self.field_name_regex()?;
        SchemaDiagnoser::new(regex).map_err(|err| ConfigError::InvalidPattern {
            pattern: self.diagnostics.field_name_pattern.clone(),
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.preview.indent, 2);
        assert_eq!(config.editor.json_languages, vec![Language::Json, Language::Jsonc]);
        assert_eq!(config.credential.refresh_buffer_secs, 300);
        assert!(config.preferences.path.is_none());
    }

    #[test]
    fn partial_sections() {
        let config = Config::from_toml_str("[preview]\nindent = 4\n[editor]\njson_languages = [\"json\"]\n").unwrap();
        assert_eq!(config.preview.indent, 4);
        assert_eq!(config.editor.json_languages, vec![Language::Json]);
        assert_eq!(config.diagnostics.field_name_pattern, DEFAULT_FIELD_NAME_PATTERN);
    }

    #[test]
    fn bad_pattern_rejected() {
        let err = Config::from_toml_str("[diagnostics]\nfield_name_pattern = \"([\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }), "{err}");
    }

    #[test]
    fn unknown_language_is_parse_error() {
        let err = Config::from_toml_str("[editor]\njson_languages = [\"yaml\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[credential]\nrefresh_buffer_secs = 60").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.credential.refresh_buffer_secs, 60);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
