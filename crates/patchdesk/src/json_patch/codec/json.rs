//! JSON codec for JSON Patch operations.
//!
//! Converts operations to and from standard RFC 6902 objects, where `value`
//! is any JSON value rather than a string.

use patchdesk_json_pointer::{format_json_pointer, parse_checked};
use serde_json::{json, Value};

use crate::json_patch::types::{PatchError, PatchOperation};

fn encode_path(path: &[String]) -> Value {
    Value::String(format_json_pointer(path))
}

pub(crate) fn decode_pointer(field: &str, pointer: &str) -> Result<Vec<String>, PatchError> {
    parse_checked(pointer).map_err(|_| PatchError::InvalidOp(format!("invalid {field} pointer \"{pointer}\"")))
}

fn decode_path(obj: &serde_json::Map<String, Value>, field: &str) -> Result<Vec<String>, PatchError> {
    let raw = obj
        .get(field)
        .ok_or_else(|| PatchError::InvalidOp(format!("missing '{field}' field")))?;
    let s = raw
        .as_str()
        .ok_or_else(|| PatchError::InvalidOp(format!("{field} must be a string")))?;
    decode_pointer(field, s)
}

// ── Serialization ─────────────────────────────────────────────────────────

/// Serialize an operation to its RFC 6902 object form.
pub fn to_json(op: &PatchOperation) -> Value {
    match op {
        PatchOperation::Add { path, value } => json!({"op": "add", "path": encode_path(path), "value": value}),
        PatchOperation::Remove { path } => json!({"op": "remove", "path": encode_path(path)}),
        PatchOperation::Replace { path, value } => {
            json!({"op": "replace", "path": encode_path(path), "value": value})
        }
        PatchOperation::Move { path, from } => {
            json!({"op": "move", "path": encode_path(path), "from": encode_path(from)})
        }
        PatchOperation::Copy { path, from } => {
            json!({"op": "copy", "path": encode_path(path), "from": encode_path(from)})
        }
    }
}

/// Serialize a list of operations to a JSON array.
pub fn to_json_patch(ops: &[PatchOperation]) -> Value {
    Value::Array(ops.iter().map(to_json).collect())
}

// ── Deserialization ───────────────────────────────────────────────────────

/// Decode one RFC 6902 operation object.
pub fn from_json(v: &Value) -> Result<PatchOperation, PatchError> {
    let obj = v
        .as_object()
        .ok_or_else(|| PatchError::InvalidOp("operation must be an object".into()))?;
    let op_str = obj
        .get("op")
        .and_then(|v| v.as_str())
        .ok_or_else(|| PatchError::InvalidOp("missing 'op' field".into()))?;

    let value = |name: &str| {
        obj.get("value")
            .cloned()
            .ok_or_else(|| PatchError::InvalidOp(format!("{name} requires 'value'")))
    };

    match op_str {
        "add" => Ok(PatchOperation::Add { path: decode_path(obj, "path")?, value: value("add")? }),
        "remove" => Ok(PatchOperation::Remove { path: decode_path(obj, "path")? }),
        "replace" => Ok(PatchOperation::Replace { path: decode_path(obj, "path")?, value: value("replace")? }),
        "move" => Ok(PatchOperation::Move { path: decode_path(obj, "path")?, from: decode_path(obj, "from")? }),
        "copy" => Ok(PatchOperation::Copy { path: decode_path(obj, "path")?, from: decode_path(obj, "from")? }),
        other => Err(PatchError::InvalidOp(format!("unsupported operation \"{other}\""))),
    }
}

/// Decode a JSON array of operations. Fails on the first bad entry.
pub fn from_json_patch(v: &Value) -> Result<Vec<PatchOperation>, PatchError> {
    let arr = v
        .as_array()
        .ok_or_else(|| PatchError::InvalidOp("patch must be an array".into()))?;
    arr.iter().map(from_json).collect()
}
