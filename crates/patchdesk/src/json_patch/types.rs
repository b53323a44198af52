//! Core types for the JSON Patch module.

use serde_json::Value;
use thiserror::Error;

pub use patchdesk_json_pointer::Path;
use patchdesk_json_pointer::format_json_pointer;

// ── Error ─────────────────────────────────────────────────────────────────

/// Failure of one operation. Location-bearing variants carry the pointer
/// that could not be resolved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("INVALID_INDEX: {0}")]
    InvalidIndex(String),
    #[error("INVALID_TARGET: {0}")]
    InvalidTarget(String),
    #[error("INVALID_OP: {0}")]
    InvalidOp(String),
}

impl PatchError {
    pub(crate) fn not_found(path: &[String]) -> Self {
        PatchError::NotFound(format_json_pointer(path))
    }

    pub(crate) fn invalid_index(path: &[String]) -> Self {
        PatchError::InvalidIndex(format_json_pointer(path))
    }

    pub(crate) fn invalid_target(path: &[String]) -> Self {
        PatchError::InvalidTarget(format_json_pointer(path))
    }
}

// ── Operation ─────────────────────────────────────────────────────────────

/// One RFC 6902 edit. `test` is deliberately absent.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOperation {
    Add { path: Path, value: Value },
    Remove { path: Path },
    Replace { path: Path, value: Value },
    Move { path: Path, from: Path },
    Copy { path: Path, from: Path },
}

impl PatchOperation {
    pub fn op_name(&self) -> &'static str {
        match self {
            PatchOperation::Add { .. } => "add",
            PatchOperation::Remove { .. } => "remove",
            PatchOperation::Replace { .. } => "replace",
            PatchOperation::Move { .. } => "move",
            PatchOperation::Copy { .. } => "copy",
        }
    }

    /// Target location of the operation.
    pub fn path(&self) -> &Path {
        match self {
            PatchOperation::Add { path, .. }
            | PatchOperation::Remove { path }
            | PatchOperation::Replace { path, .. }
            | PatchOperation::Move { path, .. }
            | PatchOperation::Copy { path, .. } => path,
        }
    }

    /// Source location for `move` and `copy`.
    pub fn from(&self) -> Option<&Path> {
        match self {
            PatchOperation::Move { from, .. } | PatchOperation::Copy { from, .. } => Some(from),
            _ => None,
        }
    }
}

// ── Batch ─────────────────────────────────────────────────────────────────

/// Operations proposed together against one file. Entries that failed to
/// decode stay in place so indices line up with what the author sent.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationBatch {
    pub file_path: String,
    pub description: String,
    pub entries: Vec<Result<PatchOperation, PatchError>>,
}

impl OperationBatch {
    pub fn new(file_path: impl Into<String>, description: impl Into<String>, entries: Vec<Result<PatchOperation, PatchError>>) -> Self {
        Self { file_path: file_path.into(), description: description.into(), entries }
    }

    /// Batch of already-decoded operations.
    pub fn from_operations(file_path: impl Into<String>, description: impl Into<String>, ops: Vec<PatchOperation>) -> Self {
        Self::new(file_path, description, ops.into_iter().map(Ok).collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The decoded operation at `index`, if it decoded.
    pub fn operation(&self, index: usize) -> Option<&PatchOperation> {
        self.entries.get(index).and_then(|e| e.as_ref().ok())
    }
}
