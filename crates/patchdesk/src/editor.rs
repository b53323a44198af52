//! In-editor files and the state seam the review session commits through.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("File \"{0}\" is not currently open in the editor")]
    FileNotOpen(String),
    #[error("{0}")]
    InvalidFileName(String),
}

/// Errors shared by the assistant-facing tools before any JSON work starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("File \"{0}\" is not currently open in the editor")]
    FileNotOpen(String),
    #[error("File \"{path}\" is not a JSON file (detected: {language})")]
    WrongFileType { path: String, language: Language },
}

// ── Language ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Json,
    Jsonc,
    JavaScript,
    TypeScript,
    Html,
    Css,
    Markdown,
    Python,
    PlainText,
}

impl Language {
    pub const ALL: [Language; 9] = [
        Language::Json,
        Language::Jsonc,
        Language::JavaScript,
        Language::TypeScript,
        Language::Html,
        Language::Css,
        Language::Markdown,
        Language::Python,
        Language::PlainText,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Language::Json => "json",
            Language::Jsonc => "jsonc",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Html => "html",
            Language::Css => "css",
            Language::Markdown => "markdown",
            Language::Python => "python",
            Language::PlainText => "plaintext",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.tag() == tag)
    }

    /// File extension including the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Language::Json => ".json",
            Language::Jsonc => ".jsonc",
            Language::JavaScript => ".js",
            Language::TypeScript => ".ts",
            Language::Html => ".html",
            Language::Css => ".css",
            Language::Markdown => ".md",
            Language::Python => ".py",
            Language::PlainText => ".txt",
        }
    }

    /// Detect from the last extension of `file_name`, case-insensitively.
    /// Unknown or missing extensions are plain text.
    pub fn detect(file_name: &str) -> Self {
        let Some((_, ext)) = file_name.rsplit_once('.') else {
            return Language::PlainText;
        };
        let ext = format!(".{}", ext.to_lowercase());
        Self::ALL
            .into_iter()
            .find(|l| l.extension() == ext)
            .unwrap_or(Language::PlainText)
    }

    /// Starter text for a newly created file.
    pub fn default_content(&self) -> &'static str {
        match self {
            Language::Json | Language::Jsonc => "{\n  \n}",
            Language::JavaScript => "// JavaScript file\n",
            Language::TypeScript => "// TypeScript file\n",
            Language::Html => {
                "<!DOCTYPE html>\n<html>\n<head>\n  <title>Document</title>\n</head>\n<body>\n  \n</body>\n</html>"
            }
            Language::Css => "/* CSS file */\n",
            Language::Markdown => "# Markdown Document\n\n",
            Language::Python => "# Python file\n",
            Language::PlainText => "",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Append the language's extension when `name` has none.
pub fn normalize_file_name(name: &str, language: Language) -> String {
    if name.contains('.') {
        name.to_string()
    } else {
        format!("{name}{}", language.extension())
    }
}

// ── Files ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorFile {
    pub name: String,
    pub path: String,
    pub language: Language,
    pub content: String,
    pub is_dirty: bool,
}

/// Read access to open files plus the single write path for content.
pub trait EditorState {
    fn file(&self, path: &str) -> Option<&EditorFile>;

    fn file_content(&self, path: &str) -> Option<&str> {
        self.file(path).map(|f| f.content.as_str())
    }

    fn set_file_content(&mut self, path: &str, text: String) -> Result<(), EditorError>;
}

/// Resolve `path` to an open file whose language is in `allowed`.
pub fn require_json_file<'e, E: EditorState + ?Sized>(
    editor: &'e E,
    path: &str,
    allowed: &[Language],
) -> Result<&'e EditorFile, ToolError> {
    let file = editor.file(path).ok_or_else(|| ToolError::FileNotOpen(path.to_string()))?;
    if !allowed.contains(&file.language) {
        return Err(ToolError::WrongFileType { path: path.to_string(), language: file.language });
    }
    Ok(file)
}

/// In-memory editor: open files keyed by path, in opening order.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    files: IndexMap<String, EditorFile>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or reopen) a file, detecting its language from the path.
    pub fn open_file(&mut self, path: impl Into<String>, content: impl Into<String>) -> &EditorFile {
        let path = path.into();
        let name = path.rsplit(['/', '\\']).next().unwrap_or(&path).to_string();
        let file = EditorFile {
            language: Language::detect(&name),
            name,
            path: path.clone(),
            content: content.into(),
            is_dirty: false,
        };
        debug!(path = %file.path, language = %file.language, "opened file");
        let (index, _) = self.files.insert_full(path, file);
        &self.files[index]
    }

    /// Create a new, unsaved file. The name gets the language's extension
    /// when it has none; content defaults to the language's starter text.
    pub fn create_new_file(
        &mut self,
        name: &str,
        language: Language,
        content: Option<String>,
    ) -> Result<&EditorFile, EditorError> {
        let name = normalize_file_name(name.trim(), language);
        self.validate_file_name(&name)?;
        let file = EditorFile {
            name: name.clone(),
            path: name.clone(),
            language,
            content: content.unwrap_or_else(|| language.default_content().to_string()),
            is_dirty: true,
        };
        let (index, _) = self.files.insert_full(name, file);
        Ok(&self.files[index])
    }

    pub fn validate_file_name(&self, name: &str) -> Result<(), EditorError> {
        if name.trim().is_empty() {
            return Err(EditorError::InvalidFileName("File name cannot be empty".into()));
        }
        if self.files.values().any(|f| f.name == name || f.path == name) {
            return Err(EditorError::InvalidFileName(format!("File \"{name}\" already exists")));
        }
        if name.contains(['<', '>', ':', '"', '/', '\\', '|', '?', '*']) {
            return Err(EditorError::InvalidFileName("File name contains invalid characters".into()));
        }
        Ok(())
    }

    pub fn remove_file(&mut self, path: &str) -> Option<EditorFile> {
        self.files.shift_remove(path)
    }

    pub fn mark_saved(&mut self, path: &str) -> Result<(), EditorError> {
        let file = self.files.get_mut(path).ok_or_else(|| EditorError::FileNotOpen(path.to_string()))?;
        file.is_dirty = false;
        Ok(())
    }

    pub fn files(&self) -> impl Iterator<Item = &EditorFile> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl EditorState for Workspace {
    fn file(&self, path: &str) -> Option<&EditorFile> {
        self.files.get(path)
    }

    fn set_file_content(&mut self, path: &str, text: String) -> Result<(), EditorError> {
        let file = self.files.get_mut(path).ok_or_else(|| EditorError::FileNotOpen(path.to_string()))?;
        if file.content != text {
            file.content = text;
            file.is_dirty = true;
        }
        debug!(path, bytes = file.content.len(), "file content set");
        Ok(())
    }
}
