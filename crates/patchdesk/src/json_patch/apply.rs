//! JSON Patch apply logic.
//!
//! Object members keep their position: `add` and `replace` over an existing
//! key overwrite in place and `remove` shifts the remaining members.

use patchdesk_json_pointer::{get, get_mut, is_child, parse_index};
use serde_json::Value;

use super::types::{PatchError, PatchOperation};

// ── Individual operation applicators ─────────────────────────────────────

fn apply_add(doc: &mut Value, path: &[String], value: Value) -> Result<(), PatchError> {
    let Some((key, parent_path)) = path.split_last() else {
        *doc = value;
        return Ok(());
    };
    let parent = get_mut(doc, parent_path).ok_or_else(|| PatchError::not_found(parent_path))?;
    match parent {
        Value::Object(map) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        Value::Array(arr) => {
            if key == "-" {
                arr.push(value);
                return Ok(());
            }
            match parse_index(key) {
                Some(idx) if idx <= arr.len() => {
                    arr.insert(idx, value);
                    Ok(())
                }
                _ => Err(PatchError::invalid_index(path)),
            }
        }
        _ => Err(PatchError::invalid_target(path)),
    }
}

fn apply_remove(doc: &mut Value, path: &[String]) -> Result<Value, PatchError> {
    let Some((key, parent_path)) = path.split_last() else {
        return Err(PatchError::invalid_target(path));
    };
    let parent = get_mut(doc, parent_path).ok_or_else(|| PatchError::not_found(path))?;
    match parent {
        Value::Object(map) => map.shift_remove(key).ok_or_else(|| PatchError::not_found(path)),
        Value::Array(arr) => {
            let idx = parse_index(key).ok_or_else(|| PatchError::invalid_index(path))?;
            if idx >= arr.len() {
                return Err(PatchError::not_found(path));
            }
            Ok(arr.remove(idx))
        }
        _ => Err(PatchError::not_found(path)),
    }
}

fn apply_replace(doc: &mut Value, path: &[String], value: Value) -> Result<(), PatchError> {
    let target = get_mut(doc, path).ok_or_else(|| PatchError::not_found(path))?;
    *target = value;
    Ok(())
}

fn apply_copy(doc: &mut Value, path: &[String], from: &[String]) -> Result<(), PatchError> {
    let src = get(doc, from).ok_or_else(|| PatchError::not_found(from))?.clone();
    apply_add(doc, path, src)
}

fn apply_move(doc: &mut Value, path: &[String], from: &[String]) -> Result<(), PatchError> {
    if path == from {
        return get(doc, from).map(|_| ()).ok_or_else(|| PatchError::not_found(from));
    }
    if is_child(from, path) {
        return Err(PatchError::invalid_target(path));
    }
    let value = apply_remove(doc, from)?;
    apply_add(doc, path, value)
}

// ── Public API ────────────────────────────────────────────────────────────

/// Apply a single operation in place.
///
/// On error the document may already be partly changed (a `move` whose
/// `add` half fails has removed its source). Use [`apply_ops`] on an owned
/// value when the caller needs all-or-nothing.
pub fn apply_op(doc: &mut Value, op: &PatchOperation) -> Result<(), PatchError> {
    match op {
        PatchOperation::Add { path, value } => apply_add(doc, path, value.clone()),
        PatchOperation::Remove { path } => apply_remove(doc, path).map(|_| ()),
        PatchOperation::Replace { path, value } => apply_replace(doc, path, value.clone()),
        PatchOperation::Move { path, from } => apply_move(doc, path, from),
        PatchOperation::Copy { path, from } => apply_copy(doc, path, from),
    }
}

/// Apply operations in order, consuming the document. The first failure
/// aborts and the partially patched value is dropped.
///
/// ```
/// use patchdesk::json_patch::{apply_ops, PatchOperation};
/// use serde_json::json;
///
/// let ops = [PatchOperation::Add { path: vec!["b".into()], value: json!(2) }];
/// assert_eq!(apply_ops(json!({"a": 1}), &ops).unwrap(), json!({"a": 1, "b": 2}));
/// ```
pub fn apply_ops(mut doc: Value, ops: &[PatchOperation]) -> Result<Value, PatchError> {
    for op in ops {
        apply_op(&mut doc, op)?;
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchdesk_json_pointer::parse_json_pointer;
    use serde_json::json;

    fn add(p: &str, value: Value) -> PatchOperation {
        PatchOperation::Add { path: parse_json_pointer(p), value }
    }

    fn remove(p: &str) -> PatchOperation {
        PatchOperation::Remove { path: parse_json_pointer(p) }
    }

    fn replace(p: &str, value: Value) -> PatchOperation {
        PatchOperation::Replace { path: parse_json_pointer(p), value }
    }

    fn mv(from: &str, p: &str) -> PatchOperation {
        PatchOperation::Move { path: parse_json_pointer(p), from: parse_json_pointer(from) }
    }

    fn cp(from: &str, p: &str) -> PatchOperation {
        PatchOperation::Copy { path: parse_json_pointer(p), from: parse_json_pointer(from) }
    }

    fn apply(doc: Value, op: PatchOperation) -> Result<Value, PatchError> {
        apply_ops(doc, &[op])
    }

    fn keys(v: &Value) -> Vec<&str> {
        v.as_object().unwrap().keys().map(String::as_str).collect()
    }

    #[test]
    fn add_member() {
        assert_eq!(apply(json!({"a": 1}), add("/b", json!(2))).unwrap(), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn add_over_existing_key_keeps_position() {
        let out = apply(json!({"a": 1, "b": 2, "c": 3}), add("/a", json!(9))).unwrap();
        assert_eq!(keys(&out), vec!["a", "b", "c"]);
        assert_eq!(out["a"], json!(9));
    }

    #[test]
    fn add_root_replaces_document() {
        assert_eq!(apply(json!({"a": 1}), add("", json!([1]))).unwrap(), json!([1]));
    }

    #[test]
    fn add_array_insert_append_and_bounds() {
        assert_eq!(apply(json!([1, 3]), add("/1", json!(2))).unwrap(), json!([1, 2, 3]));
        assert_eq!(apply(json!([1]), add("/-", json!(2))).unwrap(), json!([1, 2]));
        assert_eq!(apply(json!([1]), add("/1", json!(2))).unwrap(), json!([1, 2]));
        assert_eq!(apply(json!([1]), add("/2", json!(2))), Err(PatchError::InvalidIndex("/2".into())));
        assert_eq!(apply(json!([1]), add("/01", json!(2))), Err(PatchError::InvalidIndex("/01".into())));
        assert_eq!(apply(json!([1]), add("/x", json!(2))), Err(PatchError::InvalidIndex("/x".into())));
    }

    #[test]
    fn add_missing_parent_names_parent() {
        assert_eq!(apply(json!({}), add("/a/b", json!(1))), Err(PatchError::NotFound("/a".into())));
    }

    #[test]
    fn add_into_scalar_is_invalid_target() {
        assert_eq!(apply(json!({"a": 1}), add("/a/b", json!(1))), Err(PatchError::InvalidTarget("/a/b".into())));
    }

    #[test]
    fn remove_member_preserves_order() {
        let out = apply(json!({"a": 1, "b": 2, "c": 3}), remove("/a")).unwrap();
        assert_eq!(keys(&out), vec!["b", "c"]);
    }

    #[test]
    fn remove_missing_names_path() {
        assert_eq!(apply(json!({"a": 1}), remove("/z")), Err(PatchError::NotFound("/z".into())));
        assert_eq!(apply(json!({"a": 1}), remove("/z")).unwrap_err().to_string(), "NOT_FOUND: /z");
        assert_eq!(apply(json!({"a": {}}), remove("/a/b/c")), Err(PatchError::NotFound("/a/b/c".into())));
        assert_eq!(apply(json!([1]), remove("/1")), Err(PatchError::NotFound("/1".into())));
    }

    #[test]
    fn remove_root_is_invalid_target() {
        assert_eq!(apply(json!({}), remove("")), Err(PatchError::InvalidTarget("".into())));
    }

    #[test]
    fn remove_array_element() {
        assert_eq!(apply(json!([1, 2, 3]), remove("/1")).unwrap(), json!([1, 3]));
    }

    #[test]
    fn replace_existing_and_missing() {
        assert_eq!(apply(json!({"a": 1}), replace("/a", json!("x"))).unwrap(), json!({"a": "x"}));
        assert_eq!(apply(json!({"a": 1}), replace("", json!(null))).unwrap(), json!(null));
        assert_eq!(apply(json!({"a": 1}), replace("/b", json!(1))), Err(PatchError::NotFound("/b".into())));
        assert_eq!(apply(json!([1]), replace("/-", json!(1))), Err(PatchError::NotFound("/-".into())));
    }

    #[test]
    fn copy_deep_value() {
        let out = apply(json!({"a": {"x": [1]}}), cp("/a", "/b")).unwrap();
        assert_eq!(out, json!({"a": {"x": [1]}, "b": {"x": [1]}}));
        assert_eq!(apply(json!({}), cp("/a", "/b")), Err(PatchError::NotFound("/a".into())));
    }

    #[test]
    fn move_between_containers() {
        let out = apply(json!({"a": {"x": 1}, "b": []}), mv("/a/x", "/b/0")).unwrap();
        assert_eq!(out, json!({"a": {}, "b": [1]}));
    }

    #[test]
    fn move_within_array() {
        assert_eq!(apply(json!([1, 2, 3]), mv("/0", "/2")).unwrap(), json!([2, 3, 1]));
    }

    #[test]
    fn move_to_same_path_is_noop() {
        let doc = json!({"a": 1, "b": 2});
        assert_eq!(apply(doc.clone(), mv("/a", "/a")).unwrap(), doc);
        assert_eq!(apply(doc, mv("/z", "/z")), Err(PatchError::NotFound("/z".into())));
    }

    #[test]
    fn move_into_own_descendant_is_rejected() {
        assert_eq!(
            apply(json!({"a": {"b": {}}}), mv("/a", "/a/b/c")),
            Err(PatchError::InvalidTarget("/a/b/c".into()))
        );
    }

    #[test]
    fn move_to_sibling_with_shared_prefix_is_allowed() {
        let out = apply(json!({"a": 1}), mv("/a", "/ab")).unwrap();
        assert_eq!(out, json!({"ab": 1}));
    }

    #[test]
    fn apply_ops_stops_at_first_failure() {
        let ops = [add("/x", json!(1)), remove("/missing"), add("/y", json!(2))];
        assert_eq!(apply_ops(json!({}), &ops), Err(PatchError::NotFound("/missing".into())));
    }

    #[test]
    fn apply_ops_sequences_dependent_operations() {
        let ops = [add("/list", json!([])), add("/list/-", json!("a")), cp("/list/0", "/first")];
        assert_eq!(apply_ops(json!({}), &ops).unwrap(), json!({"list": ["a"], "first": "a"}));
    }
}
