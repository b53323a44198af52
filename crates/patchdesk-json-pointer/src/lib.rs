//! JSON Pointer (RFC 6901) utilities.
//!
//! Pointers are parsed into a [`Path`], a vector of unescaped reference
//! tokens. The root of a document is the empty path and the empty pointer
//! string `""`.
//!
//! # Example
//!
//! ```
//! use patchdesk_json_pointer::{parse_json_pointer, format_json_pointer, get};
//!
//! let path = parse_json_pointer("/foo/bar");
//! assert_eq!(path, vec!["foo".to_string(), "bar".to_string()]);
//! assert_eq!(format_json_pointer(&path), "/foo/bar");
//!
//! let doc = serde_json::json!({"foo": {"bar": 42}});
//! assert_eq!(get(&doc, &path), Some(&serde_json::json!(42)));
//! ```

use thiserror::Error;

pub mod types;
pub use types::{Path, PathStep};

pub mod validate;
pub use validate::{validate_json_pointer, validate_path};

mod find;
pub use find::{get, get_mut};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JsonPointerError {
    #[error("POINTER_INVALID")]
    PointerInvalid,
    #[error("POINTER_TOO_LONG")]
    PointerTooLong,
    #[error("PATH_TOO_LONG")]
    PathTooLong,
}

/// Unescapes a reference token: `~1` becomes `/`, then `~0` becomes `~`.
///
/// ```
/// use patchdesk_json_pointer::unescape_component;
///
/// assert_eq!(unescape_component("a~0b"), "a~b");
/// assert_eq!(unescape_component("c~1d"), "c/d");
/// ```
pub fn unescape_component(component: &str) -> String {
    if !component.contains('~') {
        return component.to_string();
    }
    component.replace("~1", "/").replace("~0", "~")
}

/// Escapes a reference token: `~` becomes `~0`, then `/` becomes `~1`.
///
/// ```
/// use patchdesk_json_pointer::escape_component;
///
/// assert_eq!(escape_component("a~b"), "a~0b");
/// assert_eq!(escape_component("c/d"), "c~1d");
/// ```
pub fn escape_component(component: &str) -> String {
    if !component.contains('/') && !component.contains('~') {
        return component.to_string();
    }
    component.replace('~', "~0").replace('/', "~1")
}

/// Parse a pointer string into path components without validating it.
///
/// The leading `/` is stripped and every component is unescaped. Callers
/// handling untrusted input should go through [`parse_checked`].
///
/// ```
/// use patchdesk_json_pointer::parse_json_pointer;
///
/// assert_eq!(parse_json_pointer(""), Vec::<String>::new());
/// assert_eq!(parse_json_pointer("/"), vec![""]);
/// assert_eq!(parse_json_pointer("/a~0b/c~1d"), vec!["a~b", "c/d"]);
/// ```
pub fn parse_json_pointer(pointer: &str) -> Path {
    match pointer.strip_prefix('/') {
        None => Vec::new(),
        Some(rest) => rest.split('/').map(unescape_component).collect(),
    }
}

/// Validate and parse a pointer string.
///
/// ```
/// use patchdesk_json_pointer::{parse_checked, JsonPointerError};
///
/// assert_eq!(parse_checked("/a/0").unwrap(), vec!["a", "0"]);
/// assert_eq!(parse_checked("a/0"), Err(JsonPointerError::PointerInvalid));
/// ```
pub fn parse_checked(pointer: &str) -> Result<Path, JsonPointerError> {
    validate_json_pointer(pointer)?;
    let path = parse_json_pointer(pointer);
    validate_path(&path)?;
    Ok(path)
}

/// Format path components into a pointer string. The root formats as `""`.
pub fn format_json_pointer(path: &[String]) -> String {
    let mut out = String::with_capacity(path.len() * 8);
    for component in path {
        out.push('/');
        out.push_str(&escape_component(component));
    }
    out
}

/// True when `child` lies strictly below `parent`.
pub fn is_child(parent: &[String], child: &[String]) -> bool {
    parent.len() < child.len() && child[..parent.len()] == *parent
}

/// True for a canonical array index: digits only, no leading zero.
pub fn is_valid_index(index: &str) -> bool {
    let bytes = index.as_bytes();
    if bytes.is_empty() || (bytes.len() > 1 && bytes[0] == b'0') {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_digit())
}

/// Parse a canonical array index token.
pub fn parse_index(index: &str) -> Option<usize> {
    if is_valid_index(index) {
        index.parse().ok()
    } else {
        None
    }
}
