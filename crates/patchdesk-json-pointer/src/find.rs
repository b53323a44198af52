use serde_json::Value;

use crate::parse_index;

/// Get a value by path. `None` when any step is missing or not traversable.
///
/// ```
/// use patchdesk_json_pointer::get;
/// use serde_json::json;
///
/// let doc = json!({"foo": {"bar": 42}});
/// assert_eq!(get(&doc, &["foo".to_string(), "bar".to_string()]), Some(&json!(42)));
/// assert_eq!(get(&doc, &["missing".to_string()]), None);
/// ```
pub fn get<'a>(val: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = val;
    for step in path {
        current = match current {
            Value::Array(arr) => arr.get(parse_index(step)?)?,
            Value::Object(map) => map.get(step)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Mutable counterpart of [`get`].
pub fn get_mut<'a>(val: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    let mut current = val;
    for step in path {
        current = match current {
            Value::Array(arr) => arr.get_mut(parse_index(step)?)?,
            Value::Object(map) => map.get_mut(step)?,
            _ => return None,
        };
    }
    Some(current)
}
