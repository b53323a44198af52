//! Independent per-operation validation of a patch batch.
//!
//! Every operation is applied alone to its own copy of the pristine
//! document, so one operation's verdict never depends on another's or on
//! batch order.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::document::{DocumentError, JsonDocument};
use crate::json_patch::{apply_op, OperationBatch, PatchError, PatchOperation};

/// A failed operation, reported with its 1-based position.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Operation {}: {}", .index + 1, .message)]
pub struct OperationError {
    /// 0-based index into the batch.
    pub index: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid(String),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Validity::Valid => None,
            Validity::Invalid(message) => Some(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchValidation {
    pub overall_valid: bool,
    /// Set when the document itself did not parse. `per_operation` is then
    /// empty.
    pub document_error: Option<DocumentError>,
    pub per_operation: Vec<Validity>,
}

impl BatchValidation {
    fn document_failure(err: DocumentError) -> Self {
        Self { overall_valid: false, document_error: Some(err), per_operation: Vec::new() }
    }

    fn from_verdicts(per_operation: Vec<Validity>) -> Self {
        let overall_valid = per_operation.iter().all(Validity::is_valid);
        Self { overall_valid, document_error: None, per_operation }
    }

    pub fn verdict(&self, index: usize) -> Option<&Validity> {
        self.per_operation.get(index)
    }

    pub fn operation_errors(&self) -> Vec<OperationError> {
        self.per_operation
            .iter()
            .enumerate()
            .filter_map(|(index, v)| v.message().map(|m| OperationError { index, message: m.to_string() }))
            .collect()
    }

    /// `"Operation N: <message>"` for every failure, 1-based.
    pub fn errors(&self) -> Vec<String> {
        self.operation_errors().iter().map(ToString::to_string).collect()
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.indices_where(|v| !v.is_valid())
    }

    pub fn valid_indices(&self) -> Vec<usize> {
        self.indices_where(Validity::is_valid)
    }

    fn indices_where(&self, pred: impl Fn(&Validity) -> bool) -> Vec<usize> {
        self.per_operation
            .iter()
            .enumerate()
            .filter(|(_, v)| pred(v))
            .map(|(i, _)| i)
            .collect()
    }
}

fn check_one(pristine: &Value, op: &PatchOperation) -> Result<(), PatchError> {
    let mut scratch = pristine.clone();
    apply_op(&mut scratch, op)
}

/// Validate decoded entries against an already parsed document.
pub fn validate_entries<'a, I>(pristine: &Value, entries: I) -> BatchValidation
where
    I: IntoIterator<Item = Result<&'a PatchOperation, &'a PatchError>>,
{
    let per_operation: Vec<Validity> = entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            match entry.map_err(Clone::clone).and_then(|op| check_one(pristine, op)) {
                Ok(()) => Validity::Valid,
                Err(err) => {
                    debug!(index, error = %err, "operation failed validation");
                    Validity::Invalid(err.to_string())
                }
            }
        })
        .collect();

    let result = BatchValidation::from_verdicts(per_operation);
    info!(
        operations = result.per_operation.len(),
        failed = result.failed_indices().len(),
        "validated patch batch"
    );
    result
}

/// Validate operations against document text.
///
/// ```
/// use patchdesk::json_patch::PatchOperation;
/// use patchdesk::validate::validate;
///
/// let ops = [PatchOperation::Remove { path: vec!["z".into()] }];
/// let result = validate("{\"a\":1}", &ops);
/// assert!(!result.overall_valid);
/// assert_eq!(result.errors(), vec!["Operation 1: NOT_FOUND: /z"]);
/// ```
pub fn validate(document_text: &str, operations: &[PatchOperation]) -> BatchValidation {
    match JsonDocument::parse(document_text) {
        Ok(doc) => validate_entries(doc.value(), operations.iter().map(Ok)),
        Err(err) => {
            info!(error = %err, "document is not JSON, skipping operations");
            BatchValidation::document_failure(err)
        }
    }
}

/// Validate a wire batch. Entries that failed to decode are reported as
/// failures at their own index.
pub fn validate_batch(document_text: &str, batch: &OperationBatch) -> BatchValidation {
    match JsonDocument::parse(document_text) {
        Ok(doc) => validate_document(&doc, batch),
        Err(err) => {
            info!(error = %err, file = %batch.file_path, "document is not JSON, skipping operations");
            BatchValidation::document_failure(err)
        }
    }
}

pub fn validate_document(doc: &JsonDocument, batch: &OperationBatch) -> BatchValidation {
    validate_entries(doc.value(), batch.entries.iter().map(Result::as_ref))
}
