//! Non-mutating patch previews.

use thiserror::Error;
use tracing::debug;

use crate::document::{to_pretty_string, JsonDocument, NOT_VALID_JSON};
use crate::json_patch::{apply_ops, PatchError, PatchOperation};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreviewError {
    #[error("{}", NOT_VALID_JSON)]
    DocumentNotJson,
    #[error("{0}")]
    Patch(#[from] PatchError),
    #[error("failed to serialize patched document: {0}")]
    Serialize(String),
}

/// Result of previewing a set of operations against some text.
///
/// On failure `modified_text` is the original text, so callers can always
/// render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPreview {
    pub is_valid: bool,
    pub modified_text: String,
    pub error: Option<PreviewError>,
}

impl PatchPreview {
    fn ok(modified_text: String) -> Self {
        Self { is_valid: true, modified_text, error: None }
    }

    fn failed(original_text: &str, error: PreviewError) -> Self {
        Self { is_valid: false, modified_text: original_text.to_string(), error: Some(error) }
    }

    /// The modified text, or the reason the operations cannot be committed.
    pub fn into_result(self) -> Result<String, PreviewError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.modified_text),
        }
    }
}

/// Compute the document that applying `operations` in order would produce.
///
/// An empty operation list returns the original text byte for byte.
/// Otherwise the result is re-serialized with `indent` spaces per level.
///
/// ```
/// use patchdesk::json_patch::PatchOperation;
/// use patchdesk::preview::preview;
/// use serde_json::json;
///
/// let ops = [PatchOperation::Add { path: vec!["b".into()], value: json!(2) }];
/// let out = preview("{\"a\":1}", &ops, 2);
/// assert!(out.is_valid);
/// assert_eq!(out.modified_text, "{\n  \"a\": 1,\n  \"b\": 2\n}");
/// ```
pub fn preview(original_text: &str, operations: &[PatchOperation], indent: usize) -> PatchPreview {
    let doc = match JsonDocument::parse(original_text) {
        Ok(doc) => doc,
        Err(_) => return PatchPreview::failed(original_text, PreviewError::DocumentNotJson),
    };
    if operations.is_empty() {
        return PatchPreview::ok(original_text.to_string());
    }

    let patched = match apply_ops(doc.into_value(), operations) {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, operations = operations.len(), "preview failed to apply");
            return PatchPreview::failed(original_text, err.into());
        }
    };
    match to_pretty_string(&patched, indent) {
        Ok(text) => PatchPreview::ok(text),
        Err(err) => PatchPreview::failed(original_text, PreviewError::Serialize(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchdesk_json_pointer::parse_json_pointer;
    use serde_json::{json, Value};

    fn add(p: &str, value: Value) -> PatchOperation {
        PatchOperation::Add { path: parse_json_pointer(p), value }
    }

    #[test]
    fn empty_operations_return_original_text() {
        let text = "{\"a\":1,   \"b\" : [ ] }";
        let out = preview(text, &[], 2);
        assert!(out.is_valid);
        assert_eq!(out.modified_text, text);
    }

    #[test]
    fn non_json_source_fails_with_original_text() {
        let out = preview("not json", &[add("/a", json!(1))], 2);
        assert!(!out.is_valid);
        assert_eq!(out.modified_text, "not json");
        assert_eq!(out.error.as_ref().map(ToString::to_string).as_deref(), Some("Original content is not valid JSON"));
    }

    #[test]
    fn non_json_source_with_no_operations_is_still_invalid() {
        assert!(!preview("{", &[], 2).is_valid);
    }

    #[test]
    fn failing_set_reports_applier_message() {
        let ops = [add("/x", json!(1)), PatchOperation::Remove { path: parse_json_pointer("/missing") }];
        let out = preview("{}", &ops, 2);
        assert!(!out.is_valid);
        assert_eq!(out.modified_text, "{}");
        assert_eq!(out.into_result(), Err(PreviewError::Patch(PatchError::NotFound("/missing".into()))));
    }

    #[test]
    fn custom_indent_and_key_order() {
        let out = preview("{\"z\":1,\"a\":2}", &[add("/m", json!(true))], 4);
        assert_eq!(out.into_result().unwrap(), "{\n    \"z\": 1,\n    \"a\": 2,\n    \"m\": true\n}");
    }

    #[test]
    fn operations_apply_in_order() {
        let ops = [add("/list", json!([])), add("/list/-", json!("a"))];
        let out = preview("{}", &ops, 2).into_result().unwrap();
        assert_eq!(serde_json::from_str::<Value>(&out).unwrap(), json!({"list": ["a"]}));
    }
}
