//! Parsed snapshots of editor text and fixed-indent serialization.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use thiserror::Error;

/// Indentation used when no configuration overrides it.
pub const DEFAULT_INDENT: usize = 2;

pub const NOT_VALID_JSON: &str = "Original content is not valid JSON";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("{}: {message} (line {line}, column {column})", NOT_VALID_JSON)]
    NotJson { message: String, line: usize, column: usize },
}

impl DocumentError {
    fn from_serde(err: &serde_json::Error) -> Self {
        let full = err.to_string();
        let suffix = format!(" at line {} column {}", err.line(), err.column());
        let message = full.strip_suffix(&suffix).unwrap_or(&full).to_string();
        DocumentError::NotJson { message, line: err.line(), column: err.column() }
    }
}

/// Immutable snapshot of a document's text and its parsed value.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonDocument {
    text: String,
    value: Value,
}

impl JsonDocument {
    pub fn parse(text: impl Into<String>) -> Result<Self, DocumentError> {
        let text = text.into();
        let value = serde_json::from_str(&text).map_err(|e| DocumentError::from_serde(&e))?;
        Ok(Self { text, value })
    }

    /// The text exactly as it was parsed.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Serialize with a fixed number of spaces per level.
///
/// ```
/// use patchdesk::document::to_pretty_string;
/// use serde_json::json;
///
/// let text = to_pretty_string(&json!({"a": [1]}), 4).unwrap();
/// assert_eq!(text, "{\n    \"a\": [\n        1\n    ]\n}");
/// ```
pub fn to_pretty_string(value: &Value, indent: usize) -> Result<String, serde_json::Error> {
    let indent = " ".repeat(indent);
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Outcome of [`validate_json`], shaped for the JSON repair surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonValidation {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// Check whether `text` is JSON, reporting where parsing stopped.
pub fn validate_json(text: &str) -> JsonValidation {
    if text.trim().is_empty() {
        return JsonValidation { is_valid: false, error: Some("Empty content".into()), position: None };
    }
    match serde_json::from_str::<Value>(text) {
        Ok(_) => JsonValidation { is_valid: true, error: None, position: None },
        Err(err) => JsonValidation {
            is_valid: false,
            error: Some(err.to_string()),
            position: Some(Position { line: err.line(), column: err.column() }),
        },
    }
}
