//! Per-operation review of a validated batch.
//!
//! A [`ReviewSession`] owns the snapshot the batch was validated against
//! and one [`OperationRecord`] per operation. The live document is never
//! held here: every apply re-reads it from the editor, previews against
//! that text, and writes the result back through
//! [`EditorState::set_file_content`].
//!
//! Each write is recorded as a commit. Undo is compensating: only the most
//! recent commit can be rolled back, and only while the live text is still
//! exactly what that commit wrote.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::document::{DocumentError, JsonDocument, DEFAULT_INDENT};
use crate::editor::{EditorError, EditorState};
use crate::json_patch::{OperationBatch, PatchOperation};
use crate::preview::{preview, PatchPreview, PreviewError};
use crate::validate::{validate_document, BatchValidation, Validity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Applied,
    Rejected,
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationStatus::Pending => "pending",
            OperationStatus::Applied => "applied",
            OperationStatus::Rejected => "rejected",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    pub status: OperationStatus,
    pub validity: Validity,
}

impl OperationRecord {
    fn is_applicable(&self) -> bool {
        self.status == OperationStatus::Pending && self.validity.is_valid()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("{0}")]
    DocumentNotJson(#[from] DocumentError),
    #[error("operation index {index} is out of range for {len} operations")]
    OutOfRange { index: usize, len: usize },
    #[error("Operation {} failed validation and cannot be applied", .0 + 1)]
    NotApplicable(usize),
    #[error("Operation {} is already {status}", .index + 1)]
    NotPending { index: usize, status: OperationStatus },
    #[error(transparent)]
    Preview(#[from] PreviewError),
    #[error("Operation {} cannot be undone: {reason}", .index + 1)]
    UndoConflict { index: usize, reason: String },
    #[error(transparent)]
    Editor(#[from] EditorError),
}

/// One write made by this session.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Commit {
    before: String,
    after: String,
    indices: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    snapshot: JsonDocument,
    batch: OperationBatch,
    validation: BatchValidation,
    records: Vec<OperationRecord>,
    commits: Vec<Commit>,
    indent: usize,
}

impl ReviewSession {
    /// Validate `batch` against `snapshot_text` and start with every
    /// operation pending.
    pub fn open(snapshot_text: impl Into<String>, batch: OperationBatch) -> Result<Self, ReviewError> {
        let snapshot = JsonDocument::parse(snapshot_text)?;
        let validation = validate_document(&snapshot, &batch);
        let records = validation
            .per_operation
            .iter()
            .map(|validity| OperationRecord { status: OperationStatus::Pending, validity: validity.clone() })
            .collect();
        info!(
            file = %batch.file_path,
            operations = batch.len(),
            invalid = validation.failed_indices().len(),
            "opened review session"
        );
        Ok(Self { snapshot, batch, validation, records, commits: Vec::new(), indent: DEFAULT_INDENT })
    }

    /// Indentation used when writing patched documents.
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn file_path(&self) -> &str {
        &self.batch.file_path
    }

    pub fn description(&self) -> &str {
        &self.batch.description
    }

    pub fn snapshot(&self) -> &JsonDocument {
        &self.snapshot
    }

    pub fn validation(&self) -> &BatchValidation {
        &self.validation
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[OperationRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&OperationRecord> {
        self.records.get(index)
    }

    pub fn status(&self, index: usize) -> Option<OperationStatus> {
        self.record(index).map(|r| r.status)
    }

    pub fn operation(&self, index: usize) -> Option<&PatchOperation> {
        self.batch.operation(index)
    }

    fn count(&self, status: OperationStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    pub fn pending_count(&self) -> usize {
        self.count(OperationStatus::Pending)
    }

    pub fn applied_count(&self) -> usize {
        self.count(OperationStatus::Applied)
    }

    pub fn rejected_count(&self) -> usize {
        self.count(OperationStatus::Rejected)
    }

    /// Valid, pending operations: what [`apply_all`](Self::apply_all) would
    /// apply.
    pub fn applicable_indices(&self) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_applicable())
            .map(|(i, _)| i)
            .collect()
    }

    /// No operation is left pending.
    pub fn is_settled(&self) -> bool {
        self.pending_count() == 0
    }

    /// Preview one operation against the validation snapshot.
    pub fn preview_operation(&self, index: usize) -> Result<PatchPreview, ReviewError> {
        self.check_index(index)?;
        let op = self.batch.operation(index).ok_or(ReviewError::NotApplicable(index))?;
        Ok(preview(self.snapshot.text(), std::slice::from_ref(op), self.indent))
    }

    fn check_index(&self, index: usize) -> Result<&OperationRecord, ReviewError> {
        self.records.get(index).ok_or(ReviewError::OutOfRange { index, len: self.records.len() })
    }

    fn live_content<E: EditorState + ?Sized>(&self, editor: &E) -> Result<String, ReviewError> {
        editor
            .file_content(self.file_path())
            .map(str::to_string)
            .ok_or_else(|| EditorError::FileNotOpen(self.file_path().to_string()).into())
    }

    /// Preview `indices` against the live text and write the result as one
    /// commit. Nothing changes on failure.
    fn commit<E: EditorState + ?Sized>(&mut self, editor: &mut E, indices: Vec<usize>) -> Result<(), ReviewError> {
        let ops: Vec<PatchOperation> = indices
            .iter()
            .filter_map(|&i| self.batch.operation(i).cloned())
            .collect();
        let before = self.live_content(editor)?;
        let after = preview(&before, &ops, self.indent).into_result()?;
        editor.set_file_content(self.file_path(), after.clone())?;
        for &i in &indices {
            self.records[i].status = OperationStatus::Applied;
        }
        info!(file = %self.batch.file_path, ?indices, "applied operations");
        self.commits.push(Commit { before, after, indices });
        Ok(())
    }

    /// Apply a single valid, pending operation to the live document.
    pub fn apply_one<E: EditorState + ?Sized>(&mut self, editor: &mut E, index: usize) -> Result<(), ReviewError> {
        let record = self.check_index(index)?;
        if !record.validity.is_valid() {
            return Err(ReviewError::NotApplicable(index));
        }
        if record.status != OperationStatus::Pending {
            return Err(ReviewError::NotPending { index, status: record.status });
        }
        self.commit(editor, vec![index]).inspect_err(|err| {
            warn!(index, error = %err, "apply failed");
        })
    }

    /// Apply every valid, pending operation, in batch order, as one commit.
    /// Returns the indices applied; empty when nothing was applicable.
    pub fn apply_all<E: EditorState + ?Sized>(&mut self, editor: &mut E) -> Result<Vec<usize>, ReviewError> {
        let indices = self.applicable_indices();
        if indices.is_empty() {
            return Ok(indices);
        }
        self.commit(editor, indices.clone()).inspect_err(|err| {
            warn!(error = %err, "apply all failed");
        })?;
        Ok(indices)
    }

    /// Reject an operation. Rejecting a rejected operation is a no-op, and
    /// rejecting an applied one undoes it first.
    pub fn reject_one<E: EditorState + ?Sized>(&mut self, editor: &mut E, index: usize) -> Result<(), ReviewError> {
        match self.check_index(index)?.status {
            OperationStatus::Pending => {
                self.records[index].status = OperationStatus::Rejected;
                Ok(())
            }
            OperationStatus::Rejected => Ok(()),
            OperationStatus::Applied => self.undo_and_reject(editor, index),
        }
    }

    /// Reject every pending operation. Returns the indices rejected.
    pub fn reject_all(&mut self) -> Vec<usize> {
        let mut rejected = Vec::new();
        for (i, record) in self.records.iter_mut().enumerate() {
            if record.status == OperationStatus::Pending {
                record.status = OperationStatus::Rejected;
                rejected.push(i);
            }
        }
        rejected
    }

    /// Roll back the commit that applied `index` and mark it rejected.
    ///
    /// Only the latest commit can be rolled back, and only while the live
    /// text equals what it wrote. Other operations from the same commit
    /// return to pending. Pending operations are simply rejected.
    pub fn undo_and_reject<E: EditorState + ?Sized>(&mut self, editor: &mut E, index: usize) -> Result<(), ReviewError> {
        match self.check_index(index)?.status {
            OperationStatus::Pending => return self.reject_one(editor, index),
            OperationStatus::Rejected => return Ok(()),
            OperationStatus::Applied => {}
        }

        let Some(position) = self.commits.iter().rposition(|c| c.indices.contains(&index)) else {
            return Err(ReviewError::UndoConflict { index, reason: "no commit recorded".into() });
        };
        if position + 1 != self.commits.len() {
            return Err(ReviewError::UndoConflict { index, reason: "later changes were applied after it".into() });
        }
        let live = self.live_content(editor)?;
        if live != self.commits[position].after {
            return Err(ReviewError::UndoConflict { index, reason: "the document was edited since it was applied".into() });
        }

        let Some(commit) = self.commits.pop() else {
            return Err(ReviewError::UndoConflict { index, reason: "no commit recorded".into() });
        };
        if let Err(err) = editor.set_file_content(self.file_path(), commit.before.clone()) {
            self.commits.push(commit);
            return Err(err.into());
        }
        for &i in &commit.indices {
            self.records[i].status = if i == index { OperationStatus::Rejected } else { OperationStatus::Pending };
        }
        info!(file = %self.batch.file_path, index, restored = ?commit.indices, "undid commit");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Workspace;
    use crate::json_patch::RawOperation;
    use serde_json::{json, Value};

    const PATH: &str = "form.json";

    fn setup(text: &str, ops: &[RawOperation]) -> (Workspace, ReviewSession) {
        let mut ws = Workspace::new();
        ws.open_file(PATH, text);
        let session = ReviewSession::open(text, OperationBatch::from_raw(PATH, "test", ops)).unwrap();
        (ws, session)
    }

    fn live(ws: &Workspace) -> Value {
        serde_json::from_str(ws.file_content(PATH).unwrap()).unwrap()
    }

    #[test]
    fn open_rejects_non_json_snapshot() {
        let err = ReviewSession::open("not json", OperationBatch::from_raw(PATH, "", &[])).unwrap_err();
        assert!(matches!(err, ReviewError::DocumentNotJson(_)));
    }

    #[test]
    fn open_marks_all_pending() {
        let (_, s) = setup("{}", &[RawOperation::new("add", "/a").with_value("1"), RawOperation::new("remove", "/x")]);
        assert_eq!(s.pending_count(), 2);
        assert_eq!(s.applicable_indices(), vec![0]);
        assert_eq!(s.record(1).unwrap().validity, Validity::Invalid("NOT_FOUND: /x".into()));
    }

    #[test]
    fn apply_one_writes_only_that_operation() {
        let (mut ws, mut s) = setup(
            "{\"a\":1}",
            &[RawOperation::new("add", "/b").with_value("2"), RawOperation::new("add", "/c").with_value("3")],
        );
        s.apply_one(&mut ws, 1).unwrap();
        assert_eq!(live(&ws), json!({"a": 1, "c": 3}));
        assert_eq!(s.status(1), Some(OperationStatus::Applied));
        assert_eq!(s.status(0), Some(OperationStatus::Pending));
        assert!(ws.file(PATH).unwrap().is_dirty);
    }

    #[test]
    fn apply_one_guards() {
        let (mut ws, mut s) = setup("{}", &[RawOperation::new("add", "/a").with_value("1"), RawOperation::new("remove", "/x")]);
        assert_eq!(s.apply_one(&mut ws, 5), Err(ReviewError::OutOfRange { index: 5, len: 2 }));
        assert_eq!(s.apply_one(&mut ws, 1), Err(ReviewError::NotApplicable(1)));
        s.apply_one(&mut ws, 0).unwrap();
        assert_eq!(
            s.apply_one(&mut ws, 0),
            Err(ReviewError::NotPending { index: 0, status: OperationStatus::Applied })
        );
    }

    #[test]
    fn apply_one_against_changed_live_document_fails_cleanly() {
        let (mut ws, mut s) = setup("{\"a\":{}}", &[RawOperation::new("add", "/a/b").with_value("1")]);
        ws.set_file_content(PATH, "{\"z\":0}".into()).unwrap();
        let err = s.apply_one(&mut ws, 0).unwrap_err();
        assert!(matches!(err, ReviewError::Preview(_)));
        assert_eq!(s.status(0), Some(OperationStatus::Pending));
        assert_eq!(ws.file_content(PATH), Some("{\"z\":0}"));
    }

    #[test]
    fn apply_all_touches_only_valid_subset() {
        let (mut ws, mut s) = setup(
            "{\"a\":1}",
            &[RawOperation::new("add", "/x").with_value("1"), RawOperation::new("remove", "/missing")],
        );
        assert_eq!(s.apply_all(&mut ws).unwrap(), vec![0]);
        assert_eq!(live(&ws), json!({"a": 1, "x": 1}));
        assert_eq!(s.status(1), Some(OperationStatus::Pending));
        assert!(s.apply_all(&mut ws).unwrap().is_empty());
    }

    #[test]
    fn apply_all_is_all_or_nothing() {
        // Each passes alone; together the second removes what the first needs.
        let (mut ws, mut s) = setup(
            "{\"a\":{\"b\":1}}",
            &[RawOperation::new("remove", "/a"), RawOperation::new("replace", "/a/b").with_value("2")],
        );
        let err = s.apply_all(&mut ws).unwrap_err();
        assert!(matches!(err, ReviewError::Preview(_)));
        assert_eq!(s.pending_count(), 2);
        assert_eq!(ws.file_content(PATH), Some("{\"a\":{\"b\":1}}"));
    }

    #[test]
    fn reject_is_idempotent() {
        let (mut ws, mut s) = setup("{}", &[RawOperation::new("add", "/a").with_value("1")]);
        s.reject_one(&mut ws, 0).unwrap();
        let before = s.records().to_vec();
        s.reject_one(&mut ws, 0).unwrap();
        assert_eq!(s.records(), before.as_slice());
        assert_eq!(s.apply_one(&mut ws, 0), Err(ReviewError::NotPending { index: 0, status: OperationStatus::Rejected }));
        assert_eq!(ws.file_content(PATH), Some("{}"));
    }

    #[test]
    fn reject_all_leaves_applied_alone() {
        let (mut ws, mut s) = setup(
            "{}",
            &[RawOperation::new("add", "/a").with_value("1"), RawOperation::new("add", "/b").with_value("2")],
        );
        s.apply_one(&mut ws, 0).unwrap();
        assert_eq!(s.reject_all(), vec![1]);
        assert_eq!(s.applied_count(), 1);
        assert_eq!(s.rejected_count(), 1);
        assert!(s.is_settled());
    }

    #[test]
    fn undo_restores_previous_text() {
        let (mut ws, mut s) = setup("{\"a\": 1}", &[RawOperation::new("add", "/b").with_value("2")]);
        s.apply_one(&mut ws, 0).unwrap();
        s.undo_and_reject(&mut ws, 0).unwrap();
        assert_eq!(ws.file_content(PATH), Some("{\"a\": 1}"));
        assert_eq!(s.status(0), Some(OperationStatus::Rejected));
    }

    #[test]
    fn undo_of_combined_commit_returns_siblings_to_pending() {
        let (mut ws, mut s) = setup(
            "{}",
            &[RawOperation::new("add", "/a").with_value("1"), RawOperation::new("add", "/b").with_value("2")],
        );
        s.apply_all(&mut ws).unwrap();
        s.reject_one(&mut ws, 1).unwrap();
        assert_eq!(ws.file_content(PATH), Some("{}"));
        assert_eq!(s.status(0), Some(OperationStatus::Pending));
        assert_eq!(s.status(1), Some(OperationStatus::Rejected));
        s.apply_one(&mut ws, 0).unwrap();
        assert_eq!(live(&ws), json!({"a": 1}));
    }

    #[test]
    fn undo_conflicts() {
        let (mut ws, mut s) = setup(
            "{}",
            &[RawOperation::new("add", "/a").with_value("1"), RawOperation::new("add", "/b").with_value("2")],
        );
        s.apply_one(&mut ws, 0).unwrap();
        s.apply_one(&mut ws, 1).unwrap();
        assert!(matches!(s.undo_and_reject(&mut ws, 0), Err(ReviewError::UndoConflict { index: 0, .. })));

        ws.set_file_content(PATH, "{\"edited\":true}".into()).unwrap();
        assert!(matches!(s.undo_and_reject(&mut ws, 1), Err(ReviewError::UndoConflict { index: 1, .. })));
        assert_eq!(s.applied_count(), 2);
        assert_eq!(ws.file_content(PATH), Some("{\"edited\":true}"));
    }

    #[test]
    fn undo_in_reverse_order_unwinds_everything() {
        let (mut ws, mut s) = setup(
            "{ }",
            &[RawOperation::new("add", "/a").with_value("1"), RawOperation::new("add", "/b").with_value("2")],
        );
        s.apply_one(&mut ws, 0).unwrap();
        s.apply_one(&mut ws, 1).unwrap();
        s.undo_and_reject(&mut ws, 1).unwrap();
        s.undo_and_reject(&mut ws, 0).unwrap();
        assert_eq!(ws.file_content(PATH), Some("{ }"));
        assert_eq!(s.rejected_count(), 2);
    }

    #[test]
    fn missing_file_is_an_editor_error() {
        let (mut ws, mut s) = setup("{}", &[RawOperation::new("add", "/a").with_value("1")]);
        ws.remove_file(PATH);
        assert_eq!(
            s.apply_one(&mut ws, 0),
            Err(ReviewError::Editor(EditorError::FileNotOpen(PATH.into())))
        );
    }

    #[test]
    fn preview_operation_uses_snapshot() {
        let (_, s) = setup("{\"a\":1}", &[RawOperation::new("replace", "/a").with_value("\"x\"")]);
        let p = s.preview_operation(0).unwrap();
        assert_eq!(p.modified_text, "{\n  \"a\": \"x\"\n}");
    }

    #[test]
    fn session_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReviewSession>();
    }
}
