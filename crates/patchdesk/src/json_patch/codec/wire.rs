//! Tool wire format for operations.
//!
//! Operations proposed by the assistant carry `value` as a string. It is
//! decoded in one explicit step, [`decode_value`], which reads the string
//! as JSON and falls back to the string itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::json::decode_pointer;
use crate::json_patch::types::{OperationBatch, PatchError, PatchOperation};

/// One operation as sent by the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOperation {
    pub op: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

/// Read a wire value: JSON when it parses, otherwise the literal string.
///
/// ```
/// use patchdesk::json_patch::decode_value;
/// use serde_json::json;
///
/// assert_eq!(decode_value("2"), json!(2));
/// assert_eq!(decode_value("{\"a\": [true]}"), json!({"a": [true]}));
/// assert_eq!(decode_value("hello"), json!("hello"));
/// ```
pub fn decode_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

impl RawOperation {
    pub fn new(op: impl Into<String>, path: impl Into<String>) -> Self {
        Self { op: op.into(), path: path.into(), value: None, from: None }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Decode into a typed operation.
    pub fn decode(&self) -> Result<PatchOperation, PatchError> {
        let value = || {
            self.value
                .as_deref()
                .map(decode_value)
                .ok_or_else(|| PatchError::InvalidOp(format!("{} requires a value", self.op)))
        };
        let from = || {
            let raw = self
                .from
                .as_deref()
                .ok_or_else(|| PatchError::InvalidOp(format!("{} requires a from pointer", self.op)))?;
            decode_pointer("from", raw)
        };

        match self.op.as_str() {
            "add" => Ok(PatchOperation::Add { path: decode_pointer("path", &self.path)?, value: value()? }),
            "remove" => Ok(PatchOperation::Remove { path: decode_pointer("path", &self.path)? }),
            "replace" => Ok(PatchOperation::Replace { path: decode_pointer("path", &self.path)?, value: value()? }),
            "move" => Ok(PatchOperation::Move { path: decode_pointer("path", &self.path)?, from: from()? }),
            "copy" => Ok(PatchOperation::Copy { path: decode_pointer("path", &self.path)?, from: from()? }),
            other => Err(PatchError::InvalidOp(format!("unsupported operation \"{other}\""))),
        }
    }
}

impl From<&PatchOperation> for RawOperation {
    fn from(op: &PatchOperation) -> Self {
        let raw = RawOperation::new(op.op_name(), patchdesk_json_pointer::format_json_pointer(op.path()));
        match op {
            PatchOperation::Add { value, .. } | PatchOperation::Replace { value, .. } => {
                raw.with_value(value.to_string())
            }
            PatchOperation::Move { from, .. } | PatchOperation::Copy { from, .. } => {
                raw.with_from(patchdesk_json_pointer::format_json_pointer(from))
            }
            PatchOperation::Remove { .. } => raw,
        }
    }
}

impl OperationBatch {
    /// Decode wire operations, keeping failures at their index.
    pub fn from_raw(file_path: impl Into<String>, description: impl Into<String>, ops: &[RawOperation]) -> Self {
        Self::new(file_path, description, ops.iter().map(RawOperation::decode).collect())
    }
}
