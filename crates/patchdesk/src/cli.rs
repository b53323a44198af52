//! Command implementations behind the `patchdesk` binary.
//!
//! Each command works on files read from disk, routes them through an
//! in-memory [`Workspace`] and returns a serializable report. Argument
//! parsing and output live in the binary.

use std::path::{Path, PathBuf};

use patchdesk_json_pointer::{get, parse_checked, JsonPointerError};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::config::{Config, ConfigError};
use crate::diagnostics::DiagnosticOutcome;
use crate::document::{DocumentError, JsonDocument};
use crate::editor::{EditorState, Workspace};
use crate::json_patch::{from_json, OperationBatch, PatchOperation, RawOperation};
use crate::preferences::{Preferences, PreferencesError};
use crate::preview::{preview, PreviewError};
use crate::query::{JsonPathResult, QuerySpec};
use crate::repair::{repair_document, RepairError, RepairOutcome, RepairRequest};
use crate::review::{OperationStatus, ReviewError, ReviewSession};
use crate::tool::{diagnose_form_schema, query_json_path, QueryArgs};
use crate::validate::validate_batch;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("{path} is not a JSON patch: {message}")]
    PatchFile { path: PathBuf, message: String },
    #[error("operation {} is malformed: {message}", .index + 1)]
    Malformed { index: usize, message: String },
    #[error("operation index {0} is out of range")]
    IndexOutOfRange(usize),
    #[error("pointer {pointer:?} does not resolve")]
    Unresolved { pointer: String },
    #[error(transparent)]
    Pointer(#[from] JsonPointerError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Preview(#[from] PreviewError),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Preferences(#[from] PreferencesError),
    #[error(transparent)]
    Repair(#[from] RepairError),
}

/// Encoding of a patch file on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PatchFormat {
    /// Standard RFC 6902 array with JSON values.
    #[default]
    Rfc6902,
    /// Assistant wire format: values are strings decoded on read.
    Wire,
}

pub fn read_text(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_path_buf(), source })
}

pub fn write_text(path: &Path, text: &str) -> Result<(), CliError> {
    std::fs::write(path, text).map_err(|source| CliError::Write { path: path.to_path_buf(), source })
}

/// Config from `path`, or defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<Config, CliError> {
    Ok(match path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    })
}

/// Parse a patch file into a batch targeting `document`. Entries that fail
/// to decode stay in the batch as per-operation failures.
pub fn read_batch(patch_path: &Path, format: PatchFormat, document: &Path) -> Result<OperationBatch, CliError> {
    let text = read_text(patch_path)?;
    let bad_file = |message: String| CliError::PatchFile { path: patch_path.to_path_buf(), message };
    let file_path = document.display().to_string();
    let description = format!("patch from {}", patch_path.display());

    match format {
        PatchFormat::Rfc6902 => {
            let value: Value = serde_json::from_str(&text).map_err(|e| bad_file(e.to_string()))?;
            let items = value.as_array().ok_or_else(|| bad_file("expected an array of operations".into()))?;
            Ok(OperationBatch::new(file_path, description, items.iter().map(from_json).collect()))
        }
        PatchFormat::Wire => {
            let raw: Vec<RawOperation> = serde_json::from_str(&text).map_err(|e| bad_file(e.to_string()))?;
            Ok(OperationBatch::from_raw(file_path, description, &raw))
        }
    }
}

fn operations(batch: &OperationBatch) -> Result<Vec<PatchOperation>, CliError> {
    batch
        .entries
        .iter()
        .enumerate()
        .map(|(index, entry)| entry.clone().map_err(|e| CliError::Malformed { index, message: e.to_string() }))
        .collect()
}

fn open_workspace(document: &Path) -> Result<(Workspace, String), CliError> {
    let text = read_text(document)?;
    let key = document.display().to_string();
    let mut workspace = Workspace::new();
    workspace.open_file(key.clone(), text);
    Ok((workspace, key))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub overall_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_error: Option<String>,
    pub valid: Vec<usize>,
    pub errors: Vec<String>,
}

pub fn validate_command(document: &Path, batch: &OperationBatch) -> Result<ValidationReport, CliError> {
    let text = read_text(document)?;
    let result = validate_batch(&text, batch);
    Ok(ValidationReport {
        overall_valid: result.overall_valid,
        document_error: result.document_error.as_ref().map(ToString::to_string),
        valid: result.valid_indices().iter().map(|i| i + 1).collect(),
        errors: result.errors(),
    })
}

/// The patched text, or the error that blocks the whole set.
pub fn preview_command(document: &Path, batch: &OperationBatch, config: &Config) -> Result<String, CliError> {
    let text = read_text(document)?;
    let ops = operations(batch)?;
    Ok(preview(&text, &ops, config.preview.indent).into_result()?)
}

/// Which pending operations a review accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    /// 1-based positions.
    Only(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewReport {
    pub statuses: Vec<OperationStatus>,
    pub text: String,
    pub changed: bool,
}

/// Accept the selected operations, reject the rest, and return the final
/// text. Nothing is written to disk here.
pub fn review_command(
    document: &Path,
    batch: OperationBatch,
    selection: &Selection,
    config: &Config,
) -> Result<ReviewReport, CliError> {
    let (mut workspace, key) = open_workspace(document)?;
    let original = workspace.file_content(&key).unwrap_or_default().to_string();
    let mut session = ReviewSession::open(original.clone(), batch)?.with_indent(config.preview.indent);

    match selection {
        Selection::All => {
            session.apply_all(&mut workspace)?;
        }
        Selection::Only(positions) => {
            for &position in positions {
                let index = position.checked_sub(1).filter(|i| *i < session.len());
                let index = index.ok_or(CliError::IndexOutOfRange(position))?;
                session.apply_one(&mut workspace, index)?;
            }
        }
    }
    session.reject_all();

    let text = workspace.file_content(&key).unwrap_or_default().to_string();
    let statuses = session.records().iter().map(|r| r.status).collect();
    info!(file = %key, applied = session.applied_count(), rejected = session.rejected_count(), "review finished");
    Ok(ReviewReport { changed: text != original, statuses, text })
}

pub fn query_command(document: &Path, queries: Vec<QuerySpec>, config: &Config) -> Result<JsonPathResult, CliError> {
    let (workspace, file_path) = open_workspace(document)?;
    Ok(query_json_path(&workspace, &QueryArgs { file_path, queries }, config))
}

pub fn diagnose_command(document: &Path, config: &Config) -> Result<DiagnosticOutcome, CliError> {
    let (workspace, key) = open_workspace(document)?;
    Ok(diagnose_form_schema(&workspace, &key, config))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub outcome: RepairOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Apply a saved repair response to `document`. `text` is set only when
/// the edits applied and the caller should write it back.
pub fn repair_command(document: &Path, response: &str, config: &Config) -> Result<RepairReport, CliError> {
    let (mut workspace, key) = open_workspace(document)?;
    let outcome = repair_document(&mut workspace, &key, response, &config.editor.json_languages)?;
    let text = outcome.written.then(|| workspace.file_content(&key).unwrap_or_default().to_string());
    Ok(RepairReport { outcome, text })
}

/// Build the repair prompt for `document`, with the stored knowledge base.
pub fn repair_prompt(document: &Path, config: &Config) -> Result<String, CliError> {
    let content = read_text(document)?;
    let error = match JsonDocument::parse(content.as_str()) {
        Ok(_) => String::new(),
        Err(err) => err.to_string(),
    };
    let knowledge_base = match &config.preferences.path {
        Some(path) => Preferences::load(path)?.knowledge_base().map(str::to_string),
        None => None,
    };
    let request = RepairRequest { content, error, knowledge_base };
    request.validate().map_err(|e| CliError::PatchFile { path: document.to_path_buf(), message: e.to_string() })?;
    Ok(request.prompt())
}

/// Resolve `pointer` in `document`.
pub fn pointer_command(document: &Path, pointer: &str) -> Result<Value, CliError> {
    let doc = JsonDocument::parse(read_text(document)?)?;
    let path = parse_checked(pointer)?;
    get(doc.value(), &path).cloned().ok_or_else(|| CliError::Unresolved { pointer: pointer.to_string() })
}
